//! Verification code cache module
//!
//! This module provides the verification code workflow's storage side:
//! - Cooldown between consecutive codes for one recipient
//! - Bounded verification attempts per code
//! - Single-use consumption of a verified code
//! - Striped locking of read-decide-write sequences

mod lock;
mod service;
mod traits;

#[cfg(test)]
mod tests;

pub use lock::StripedLock;
pub use service::CodeCacheService;
pub use traits::{CodeCache, ExpiringStore, StoreEntry};
