//! Lock-acquisition helpers shared by the engine crates.
//!
//! The engine's panic policy isolates a failing agent hook and finishes the
//! tick, which means a lock can be poisoned by a hook that died while
//! holding it.  The guarded data is phase bookkeeping and numeric state that
//! stays structurally valid across a mid-hook unwind, so every acquisition
//! in the engine recovers the guard instead of propagating the poison.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lock a mutex, recovering the guard if a previous holder panicked.
#[inline]
pub fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-lock an `RwLock`, recovering the guard if a writer panicked.
#[inline]
pub fn reread<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-lock an `RwLock`, recovering the guard if a holder panicked.
#[inline]
pub fn rewrite<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
