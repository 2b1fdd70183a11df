//! Per-key write serialization
//!
//! Two writers for the same storage name would share one temp path, so
//! `put` holds the name's lock from before the temp file is created until
//! after the rename. A name stays in the table only while some writer holds
//! or waits on it, including writers whose future was dropped mid-wait.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;

#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    table: Mutex<HashMap<String, Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    lock: Arc<tokio::sync::Mutex<()>>,
    users: usize,
}

/// Exclusive write access to one storage name, released on drop
#[derive(Debug)]
pub(crate) struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
    _registration: Registration,
}

/// Counts one user of a slot from `acquire` until dropped
#[derive(Debug)]
struct Registration {
    locks: Arc<KeyLocks>,
    name: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.locks.leave(&self.name);
    }
}

impl KeyLocks {
    /// Wait for exclusive write access to `name`
    pub(crate) async fn acquire(self: &Arc<Self>, name: &str) -> KeyGuard {
        let lock = {
            let mut table = self.table();
            let slot = table.entry(name.to_string()).or_default();
            slot.users += 1;
            Arc::clone(&slot.lock)
        };
        let registration = Registration {
            locks: Arc::clone(self),
            name: name.to_string(),
        };

        KeyGuard {
            _guard: lock.lock_owned().await,
            _registration: registration,
        }
    }

    fn leave(&self, name: &str) {
        let mut table = self.table();
        if let Some(slot) = table.get_mut(name) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                table.remove(name);
            }
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_drop_forgets_idle_key() {
        let locks = Arc::new(KeyLocks::default());
        let guard = locks.acquire("10.1@a").await;
        assert_eq!(locks.len(), 1);

        drop(guard);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyLocks::default());
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = Arc::clone(&locks);
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("same").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = Arc::new(KeyLocks::default());
        let _first = locks.acquire("a").await;
        let _second = tokio::time::timeout(Duration::from_secs(1), locks.acquire("b"))
            .await
            .expect("independent key should not wait");
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_waiter_leaves_no_entry() {
        let locks = Arc::new(KeyLocks::default());
        let holder = locks.acquire("busy").await;

        let waited = tokio::time::timeout(Duration::from_millis(20), locks.acquire("busy")).await;
        assert!(waited.is_err());
        assert_eq!(locks.len(), 1);

        drop(holder);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_waiter_still_served_after_holder_drops() {
        let locks = Arc::new(KeyLocks::default());
        let holder = locks.acquire("k").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("k").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(holder);

        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }
}
