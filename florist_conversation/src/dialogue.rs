//! Per-user dialogue slots for the guided recommendation flow.

use crate::guard::ConcurrencyGuard;
use crate::table::UserTable;
use florist_core::UserId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Position of a user inside the guided flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DialogueState {
    #[default]
    Idle,
    WaitingForOccasion,
    WaitingForBudget,
    WaitingForPreferences,
    ConfirmingOrder,
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::WaitingForOccasion => "waiting_for_occasion",
            Self::WaitingForBudget => "waiting_for_budget",
            Self::WaitingForPreferences => "waiting_for_preferences",
            Self::ConfirmingOrder => "confirming_order",
        };
        f.write_str(name)
    }
}

/// Values collected while walking through the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Occasion,
    Budget,
    Preferences,
    Recommendation,
}

impl Field {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Occasion => "occasion",
            Self::Budget => "budget",
            Self::Preferences => "preferences",
            Self::Recommendation => "recommendation",
        }
    }
}

/// Current state plus the fields gathered so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueSession {
    state: DialogueState,
    fields: BTreeMap<Field, String>,
}

impl DialogueSession {
    #[must_use]
    pub const fn state(&self) -> DialogueState {
        self.state
    }

    #[must_use]
    pub fn field(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<Field, String> {
        &self.fields
    }

    /// Store a field and move to `next`.
    pub fn advance(&mut self, field: Field, value: impl Into<String>, next: DialogueState) {
        self.fields.insert(field, value.into());
        self.state = next;
    }

    pub fn set_state(&mut self, next: DialogueState) {
        self.state = next;
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    /// Back to `Idle` with nothing collected.
    pub fn reset(&mut self) {
        self.state = DialogueState::Idle;
        self.fields.clear();
    }
}

/// Dialogue sessions for every tracked user.
///
/// Only the orchestrator mutates sessions, and only while holding the user's
/// processing permit.
#[derive(Debug)]
pub struct DialogueStore {
    sessions: Mutex<UserTable<DialogueSession>>,
}

impl DialogueStore {
    #[must_use]
    pub fn new(max_users: usize) -> Self {
        Self {
            sessions: Mutex::new(UserTable::new(max_users)),
        }
    }

    /// Keep the sessions of users `guard` holds busy when evicting.
    #[must_use]
    pub fn with_in_flight(mut self, guard: Arc<ConcurrencyGuard>) -> Self {
        self.sessions
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .set_in_flight(guard);
        self
    }

    /// Copy of the user's session; a fresh `Idle` session for unknown users.
    #[must_use]
    pub fn get(&self, user: UserId) -> DialogueSession {
        self.lock().get(user).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn state(&self, user: UserId) -> DialogueState {
        self.lock()
            .get(user)
            .map_or(DialogueState::Idle, DialogueSession::state)
    }

    /// Mutate the user's session in place, creating it if needed.
    pub fn update<R>(&self, user: UserId, f: impl FnOnce(&mut DialogueSession) -> R) -> R {
        let mut sessions = self.lock();
        f(sessions.entry_or_insert_with(user, DialogueSession::default))
    }

    /// Return the user to `Idle` and drop collected fields.
    pub fn reset(&self, user: UserId) {
        if let Some(session) = self.lock().remove(user) {
            tracing::debug!("Reset dialogue for user {user} from {}", session.state());
        }
    }

    #[must_use]
    pub fn tracked_users(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, UserTable<DialogueSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DialogueStore {
    fn default() -> Self {
        Self::new(crate::history::DEFAULT_MAX_TRACKED_USERS)
    }
}
