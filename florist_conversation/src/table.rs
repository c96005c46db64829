//! Per-user table with a bound on the number of tracked users.

use crate::guard::ConcurrencyGuard;
use florist_core::UserId;
use std::collections::HashMap;
use std::sync::Arc;

/// Map from user to value that evicts the least recently touched user once
/// `capacity` users are tracked.
///
/// With an in-flight guard attached, users the guard reports busy are passed
/// over when picking a victim. If every tracked user is busy the oldest one
/// is evicted anyway, so the bound always holds.
#[derive(Debug)]
pub struct UserTable<V> {
    entries: HashMap<UserId, Slot<V>>,
    capacity: usize,
    clock: u64,
    in_flight: Option<Arc<ConcurrencyGuard>>,
}

#[derive(Debug)]
struct Slot<V> {
    last_touched: u64,
    value: V,
}

impl<V> UserTable<V> {
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
            in_flight: None,
        }
    }

    /// Never evict users that `guard` holds busy, while any idle user can go instead.
    pub fn set_in_flight(&mut self, guard: Arc<ConcurrencyGuard>) {
        self.in_flight = Some(guard);
    }

    /// Entry for `user`, created with `init` if absent. Marks the user as most recently used.
    pub fn entry_or_insert_with(&mut self, user: UserId, init: impl FnOnce() -> V) -> &mut V {
        self.clock += 1;
        let now = self.clock;

        if !self.entries.contains_key(&user) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        let slot = self.entries.entry(user).or_insert_with(|| Slot {
            last_touched: now,
            value: init(),
        });
        slot.last_touched = now;
        &mut slot.value
    }

    /// Read without refreshing recency.
    #[must_use]
    pub fn get(&self, user: UserId) -> Option<&V> {
        self.entries.get(&user).map(|slot| &slot.value)
    }

    pub fn remove(&mut self, user: UserId) -> Option<V> {
        self.entries.remove(&user).map(|slot| slot.value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // Linear scan; only runs when a new user arrives at capacity.
    fn evict_oldest(&mut self) {
        let busy = self
            .in_flight
            .as_ref()
            .map(|guard| guard.busy_users())
            .unwrap_or_default();
        let oldest = self
            .entries
            .iter()
            .filter(|(user, _)| !busy.contains(*user))
            .min_by_key(|(_, slot)| slot.last_touched)
            .or_else(|| self.entries.iter().min_by_key(|(_, slot)| slot.last_touched))
            .map(|(user, _)| *user);

        if let Some(user) = oldest {
            tracing::debug!("Evicting state of least recently active user {user}");
            self.entries.remove(&user);
        }
    }
}
