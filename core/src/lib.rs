//! # Verification Code Core
//!
//! Domain records, store abstractions and the verification code cache policy.
//! Store backends live in the infrastructure crate; this crate only depends on
//! the [`ExpiringStore`] trait.

pub mod clock;
pub mod domain;
pub mod errors;
pub mod services;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::*;
pub use errors::*;
pub use services::*;
