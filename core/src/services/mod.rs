//! Business services.

pub mod verification;

pub use verification::{CodeCache, CodeCacheService, ExpiringStore, StoreEntry, StripedLock};
