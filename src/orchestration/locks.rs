//! Per-account mutual exclusion.
//!
//! Settlement and balance-recording flows are short synchronous
//! read-modify-write sequences that must not interleave on the same account.
//! Locks are keyed by account id; operations on different accounts never
//! block each other.

use crate::domain::AccountId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct AccountLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for an account, waiting if another operation on the
    /// same account is in flight.
    pub async fn acquire(&self, account_id: &AccountId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("account lock registry poisoned");
            map.entry(account_id.as_str().to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
