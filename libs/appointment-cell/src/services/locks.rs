use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// A slot is a (doctor, exact start time) pair.
type SlotKey = (String, DateTime<Utc>);

// Sweep dead entries once the map grows past this.
const SWEEP_THRESHOLD: usize = 1024;

/// Per-slot async locks serializing the conflict-check-then-insert sequence.
/// Two requests for the same slot queue on one mutex; requests for different
/// slots never contend. The registry itself is only locked long enough to
/// clone the Arc, never across an await point.
pub struct SlotLockRegistry {
    locks: Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>,
}

impl SlotLockRegistry {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn lock_for(&self, doctor_id: &str, scheduled_time: DateTime<Utc>) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("slot lock registry poisoned");

        if locks.len() > SWEEP_THRESHOLD {
            let before = locks.len();
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            debug!("Swept slot lock registry: {} -> {} entries", before, locks.len());
        }

        locks
            .entry((doctor_id.to_string(), scheduled_time))
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

impl Default for SlotLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slot_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn same_slot_shares_one_lock() {
        let registry = SlotLockRegistry::new();
        let a = registry.lock_for("CA001", slot_time());
        let b = registry.lock_for("CA001", slot_time());
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_slots_get_independent_locks() {
        let registry = SlotLockRegistry::new();
        let a = registry.lock_for("CA001", slot_time());
        let b = registry.lock_for("CA002", slot_time());
        let c = registry.lock_for("CA001", slot_time() + chrono::Duration::minutes(30));
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn same_slot_serializes_critical_sections() {
        let registry = Arc::new(SlotLockRegistry::new());
        let counter = Arc::new(Mutex::new(0u32));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                let lock = registry.lock_for("CA001", slot_time());
                let _guard = lock.lock().await;
                // Read-modify-write across a yield; only the mutex keeps
                // this race-free.
                let current = *counter.lock().unwrap();
                tokio::task::yield_now().await;
                *counter.lock().unwrap() = current + 1;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*counter.lock().unwrap(), 8);
    }
}
