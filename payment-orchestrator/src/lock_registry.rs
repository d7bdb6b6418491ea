use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// Per-payment mutex registry: one lazily-created lock per payment id,
/// guarded by a single registry mutex while the map itself is touched.
///
/// Bounded with simple access-order eviction so a long-running orchestrator
/// doesn't grow the map forever once payments go terminal and are never
/// locked again.
pub struct LockRegistry {
    inner: Mutex<Inner>,
    capacity: usize,
}

struct Inner {
    locks: HashMap<String, Arc<AsyncMutex<()>>>,
    order: VecDeque<String>,
}

impl LockRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                locks: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity,
        }
    }

    pub fn get(&self, payment_id: &str) -> Arc<AsyncMutex<()>> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(lock) = inner.locks.get(payment_id) {
            let lock = lock.clone();
            inner.order.retain(|id| id != payment_id);
            inner.order.push_back(payment_id.to_string());
            return lock;
        }

        let lock = Arc::new(AsyncMutex::new(()));
        inner.locks.insert(payment_id.to_string(), lock.clone());
        inner.order.push_back(payment_id.to_string());

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.locks.remove(&oldest);
            }
        }

        lock
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_returns_the_same_lock() {
        let registry = LockRegistry::new(10);
        let a = registry.get("payment-1");
        let b = registry.get("payment-1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_ids_get_distinct_locks() {
        let registry = LockRegistry::new(10);
        let a = registry.get("payment-1");
        let b = registry.get("payment-2");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn evicts_oldest_once_capacity_is_exceeded() {
        let registry = LockRegistry::new(2);
        let first = registry.get("payment-1");
        registry.get("payment-2");
        registry.get("payment-3");

        let refetched = registry.get("payment-1");
        assert!(!Arc::ptr_eq(&first, &refetched));
    }
}
