//! Striped mutual exclusion for read-decide-write sequences

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::{Mutex, MutexGuard};

/// A fixed set of mutexes selected by key hash
///
/// With a single stripe every key shares one lock. More stripes let
/// unrelated keys proceed in parallel while a given key always maps to the
/// same stripe.
#[derive(Debug)]
pub struct StripedLock {
    stripes: Vec<Mutex<()>>,
}

impl StripedLock {
    /// Create `stripes` locks; zero is treated as one
    pub fn new(stripes: usize) -> Self {
        let stripes = (0..stripes.max(1)).map(|_| Mutex::new(())).collect();
        Self { stripes }
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    pub fn stripe_index(&self, key: &str) -> usize {
        if self.stripes.len() == 1 {
            return 0;
        }
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    /// Wait for the stripe owning `key`
    pub async fn lock(&self, key: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_index(key)].lock().await
    }
}
