// marketplace/src/services/session_locks.rs

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per user, so "check for an active session, then open one"
/// runs at most once at a time for a given user within this process.
#[derive(Default)]
pub struct UserLocks {
  locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn acquire(&self, user_id: i64) -> OwnedMutexGuard<()> {
    let lock = {
      let mut locks = self.locks.lock();
      // Drop entries nobody is holding or waiting on.
      locks.retain(|_, l| Arc::strong_count(l) > 1);
      locks.entry(user_id).or_default().clone()
    };
    lock.lock_owned().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn same_user_waits_other_user_does_not() {
    let locks = Arc::new(UserLocks::new());
    let held = locks.acquire(1).await;

    let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire(2)).await;
    assert!(other.is_ok());

    let same = tokio::time::timeout(Duration::from_millis(50), locks.acquire(1)).await;
    assert!(same.is_err());

    drop(held);
    let again = tokio::time::timeout(Duration::from_millis(50), locks.acquire(1)).await;
    assert!(again.is_ok());
  }
}
