//! Mutex acquisition with poison recovery.

use std::sync::{Mutex, MutexGuard};

/// Acquires a mutex, recovering the inner value if it was poisoned.
///
/// A panic inside one critical section must not take every later store call
/// down with it; the guarded state stays structurally valid because no
/// critical section leaves it half-written across an unwind point.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("store mutex was poisoned, recovering");
            metrics::counter!("store_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}
