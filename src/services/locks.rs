//! Per-book mutual exclusion
//!
//! Borrow, return and administrative edits of a book hold its lock for the
//! whole read-modify-commit sequence, so two requests cannot both see the
//! same available copy.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct BookLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl BookLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one book. Released when the guard drops.
    pub async fn lock(&self, book_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            // Drop entries nobody holds or waits on
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(book_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}
