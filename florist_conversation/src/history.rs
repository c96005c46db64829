//! Rolling per-user conversation history.
//!
//! Each user owns a FIFO buffer of the most recent turns. The buffer feeds
//! prior turns back into every generation call, so its bound is also the
//! bound on prompt context.

use crate::guard::ConcurrencyGuard;
use crate::table::UserTable;
use florist_core::{ChatMessage, Role, UserId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Turns kept per user unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Users tracked before the least recently active one is forgotten.
pub const DEFAULT_MAX_TRACKED_USERS: usize = 10_000;

/// Direction of a recorded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    /// Sent by the user.
    Input,
    /// Sent by the assistant.
    Output,
}

/// One recorded message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: TurnRole,
    text: String,
}

impl Turn {
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    #[must_use]
    pub const fn role(&self) -> TurnRole {
        self.role
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Chat-completion form of this turn.
    #[must_use]
    pub fn to_chat_message(&self) -> ChatMessage {
        let role = match self.role {
            TurnRole::Input => Role::User,
            TurnRole::Output => Role::Assistant,
        };
        ChatMessage::new(role, self.text.clone())
    }
}

/// Configuration for conversation history management.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of turns kept per user
    pub max_turns: usize,
    /// Maximum number of users with a live buffer
    pub max_users: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_HISTORY_LIMIT,
            max_users: DEFAULT_MAX_TRACKED_USERS,
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub const fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    #[must_use]
    pub const fn with_max_users(mut self, max: usize) -> Self {
        self.max_users = max;
        self
    }
}

/// Bounded per-user ring buffer of turns.
#[derive(Debug)]
pub struct HistoryStore {
    max_turns: usize,
    buffers: Mutex<UserTable<VecDeque<Turn>>>,
}

impl HistoryStore {
    #[must_use]
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            max_turns: config.max_turns,
            buffers: Mutex::new(UserTable::new(config.max_users)),
        }
    }

    /// Keep the buffers of users `guard` holds busy when evicting.
    #[must_use]
    pub fn with_in_flight(mut self, guard: Arc<ConcurrencyGuard>) -> Self {
        self.buffers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .set_in_flight(guard);
        self
    }

    #[must_use]
    pub const fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Append a turn, evicting the oldest one when the buffer is full.
    pub fn append(&self, user: UserId, role: TurnRole, text: impl Into<String>) {
        let turn = Turn::new(role, text);
        let max_turns = self.max_turns;
        let mut buffers = self.lock();
        let buffer =
            buffers.entry_or_insert_with(user, || VecDeque::with_capacity(max_turns.min(64)));

        if max_turns == 0 {
            return;
        }
        while buffer.len() >= max_turns {
            buffer.pop_front();
        }
        buffer.push_back(turn);
    }

    /// Copy of the user's turns, oldest first. Empty for unknown users.
    #[must_use]
    pub fn snapshot(&self, user: UserId) -> Vec<Turn> {
        self.lock()
            .get(user)
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Forget everything recorded for `user`.
    pub fn clear(&self, user: UserId) {
        self.lock().remove(user);
    }

    /// Number of users with a live buffer.
    #[must_use]
    pub fn tracked_users(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, UserTable<VecDeque<Turn>>> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}
