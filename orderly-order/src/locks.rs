use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

/// One order's mutex plus the number of callers holding or awaiting it
struct Slot {
    mutex: Arc<tokio::sync::Mutex<()>>,
    users: usize,
}

/// Keyed async mutex serializing read-then-write sequences on one order.
///
/// Entries are dropped as soon as nobody holds or waits for them, including
/// when a waiting `acquire` is cancelled.
#[derive(Default)]
pub struct OrderLocks {
    slots: Mutex<HashMap<Uuid, Slot>>,
}

/// Registration in the slot map. Created before waiting so that dropping
/// it, whether the lock was obtained or not, releases the entry.
pub struct OrderGuard<'a> {
    locks: &'a OrderLocks,
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: Uuid) -> OrderGuard<'_> {
        let mutex = {
            let mut slots = self.slots();
            let slot = slots.entry(id).or_insert_with(|| Slot {
                mutex: Arc::default(),
                users: 0,
            });
            slot.users += 1;
            slot.mutex.clone()
        };

        let mut registration = OrderGuard {
            locks: self,
            id,
            guard: None,
        };
        registration.guard = Some(mutex.lock_owned().await);
        registration
    }

    /// Number of orders currently locked or awaited
    pub fn active(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<Uuid, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for OrderGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.locks.slots();
        if let Some(slot) = slots.get_mut(&self.id) {
            slot.users -= 1;
            if slot.users == 0 {
                slots.remove(&self.id);
            }
        }
    }
}
