//! Tree-scoped locking
//!
//! Every tree owns one reentrant lock. Structural mutation, lazy resolution
//! and persist take it for their whole duration, so check-then-act sequences
//! against the filesystem (exists? create / remove) never interleave between
//! threads. Reentrancy lets persist recurse into children, and lets event
//! sinks call back into the tree, on the same thread.
//!
//! The lock is process-local and advisory. Two trees bound to the same
//! directory do not coordinate.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// Reentrant exclusive lock guarding one tree
#[derive(Debug, Default)]
pub struct TreeLock {
    inner: ReentrantMutex<()>,
}

/// Held while a thread owns the tree lock; releases on drop
pub struct TreeLockGuard<'a> {
    _guard: ReentrantMutexGuard<'a, ()>,
}

impl TreeLock {
    pub fn new() -> Self {
        Self {
            inner: ReentrantMutex::new(()),
        }
    }

    /// Block until the current thread owns the lock
    pub fn lock(&self) -> TreeLockGuard<'_> {
        TreeLockGuard {
            _guard: self.inner.lock(),
        }
    }

    /// Acquire without blocking; `None` if another thread holds it
    pub fn try_lock(&self) -> Option<TreeLockGuard<'_>> {
        self.inner
            .try_lock()
            .map(|guard| TreeLockGuard { _guard: guard })
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}
