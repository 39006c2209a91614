//! Domain entities representing core business objects.

pub mod verification_code;

pub use verification_code::{AttemptCounter, AttemptStatus, CodeEntry, CONSUMED_SENTINEL, MAX_ATTEMPTS};
