//! Per-module writer locks.
//!
//! Notifications mutate the loaded model from the notification task while
//! other threads may edit the same module. Every informer call runs under
//! the locks of every module it touches; changes that do not name a module
//! share one lock. Several locks are always taken in ascending module order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use navi_core::ModuleId;

/// Registry handing out one lock per module. Clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct ModuleLocks {
    inner: Arc<Mutex<HashMap<Option<ModuleId>, Arc<Mutex<()>>>>>,
}

impl ModuleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock of `module`, or the shared lock
    /// for `None`.
    pub fn with_lock<T>(&self, module: Option<ModuleId>, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(module);
        let _guard = recover(lock.lock());
        f()
    }

    /// Runs `f` while holding the lock of every module in `modules`, or the
    /// shared lock when `modules` is empty.
    pub fn with_locks<T>(&self, modules: &[ModuleId], f: impl FnOnce() -> T) -> T {
        let mut keys: Vec<Option<ModuleId>> = modules.iter().copied().map(Some).collect();
        if keys.is_empty() {
            keys.push(None);
        }
        keys.sort();
        keys.dedup();
        let locks: Vec<Arc<Mutex<()>>> = keys.into_iter().map(|k| self.lock_for(k)).collect();
        let _guards: Vec<MutexGuard<'_, ()>> = locks.iter().map(|l| recover(l.lock())).collect();
        f()
    }

    /// Number of locks handed out so far.
    pub fn len(&self) -> usize {
        recover(self.inner.lock()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_for(&self, module: Option<ModuleId>) -> Arc<Mutex<()>> {
        let mut locks = recover(self.inner.lock());
        Arc::clone(locks.entry(module).or_default())
    }
}

/// A panic inside one informer call must not wedge the module forever.
fn recover<'a, T>(
    result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn one_lock_per_module() {
        let locks = ModuleLocks::new();
        locks.with_lock(Some(ModuleId(1)), || {});
        locks.with_lock(Some(ModuleId(1)), || {});
        locks.with_lock(Some(ModuleId(2)), || {});
        locks.with_lock(None, || {});
        assert_eq!(locks.len(), 3);
    }

    #[test]
    fn returns_closure_value() {
        let locks = ModuleLocks::new();
        assert_eq!(locks.with_lock(Some(ModuleId(1)), || 42), 42);
    }

    #[test]
    fn different_modules_do_not_block_each_other() {
        let locks = ModuleLocks::new();
        let inner = locks.clone();
        let value = locks.with_lock(Some(ModuleId(1)), || {
            thread::spawn(move || inner.with_lock(Some(ModuleId(2)), || 7))
                .join()
                .unwrap()
        });
        assert_eq!(value, 7);
    }

    #[test]
    fn same_module_is_serialized() {
        let locks = ModuleLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let active = Arc::clone(&active);
                thread::spawn(move || {
                    locks.with_lock(Some(ModuleId(1)), || {
                        let before = active.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(before, 0);
                        thread::yield_now();
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn distinct_modules_get_distinct_locks() {
        let locks = ModuleLocks::new();
        locks.with_locks(&[ModuleId(4), ModuleId(2), ModuleId(4)], || {});
        assert_eq!(locks.len(), 2);
        locks.with_locks(&[], || {});
        assert_eq!(locks.len(), 3);
    }

    #[test]
    fn opposite_orders_do_not_deadlock() {
        let locks = ModuleLocks::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let locks = locks.clone();
                thread::spawn(move || {
                    let modules = if i % 2 == 0 {
                        [ModuleId(1), ModuleId(2)]
                    } else {
                        [ModuleId(2), ModuleId(1)]
                    };
                    for _ in 0..50 {
                        locks.with_locks(&modules, thread::yield_now);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn waits_for_every_module() {
        let locks = ModuleLocks::new();
        let inner = locks.clone();
        let (tx, rx) = mpsc::channel();
        let handle = locks.with_lock(Some(ModuleId(2)), || {
            let handle = thread::spawn(move || {
                inner.with_locks(&[ModuleId(1), ModuleId(2)], || tx.send(()).unwrap())
            });
            assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
            handle
        });
        rx.recv().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn survives_poisoning() {
        let locks = ModuleLocks::new();
        let inner = locks.clone();
        let _ = thread::spawn(move || inner.with_lock(Some(ModuleId(1)), || panic!("boom"))).join();
        assert_eq!(locks.with_lock(Some(ModuleId(1)), || 1), 1);
    }
}
