//! Per-user single-flight admission control.
//!
//! A user is either free or busy. While busy, further messages from the same
//! user are turned away rather than queued; different users never contend.

use florist_core::UserId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    busy: Mutex<HashSet<UserId>>,
}

impl ConcurrencyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `user` busy. Returns `false`, changing nothing, if already busy.
    pub fn try_acquire(&self, user: UserId) -> bool {
        self.lock().insert(user)
    }

    /// Mark `user` free. Must be paired with a successful [`Self::try_acquire`].
    pub fn release(&self, user: UserId) {
        self.lock().remove(&user);
    }

    #[must_use]
    pub fn is_busy(&self, user: UserId) -> bool {
        self.lock().contains(&user)
    }

    /// Users currently being processed.
    #[must_use]
    pub fn busy_users(&self) -> HashSet<UserId> {
        self.lock().clone()
    }

    /// Scoped acquisition: the returned permit releases the user when dropped.
    #[must_use]
    pub fn permit(self: &Arc<Self>, user: UserId) -> Option<ProcessingPermit> {
        self.try_acquire(user).then(|| ProcessingPermit {
            guard: Arc::clone(self),
            user,
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<UserId>> {
        self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that a user is being processed. Releases the user on drop.
#[derive(Debug)]
#[must_use = "the user is released as soon as the permit is dropped"]
pub struct ProcessingPermit {
    guard: Arc<ConcurrencyGuard>,
    user: UserId,
}

impl ProcessingPermit {
    #[must_use]
    pub const fn user(&self) -> UserId {
        self.user
    }
}

impl Drop for ProcessingPermit {
    fn drop(&mut self) {
        self.guard.release(self.user);
    }
}
