//! Value objects derived from domain inputs.

pub mod code_keys;

pub use code_keys::{CodeKeys, COUNTER_SUFFIX};
