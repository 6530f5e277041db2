use std::sync::{Mutex, MutexGuard};

/// Locks `mutex`, taking the guard back out of a poisoned lock.
///
/// Work items run under `catch_unwind`, so a panic inside user code can
/// poison a lock the runtime still needs; the protected state is always left
/// consistent between statements.
#[inline]
pub fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
