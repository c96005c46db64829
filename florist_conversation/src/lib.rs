#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Conversation orchestration for the flower-shop assistant.
//!
//! # Components
//! - [`HistoryStore`]: bounded rolling context per user
//! - [`DialogueStore`]: per-user state of the guided recommendation flow
//! - [`ConcurrencyGuard`]: at most one message in flight per user
//! - [`DialogueOrchestrator`]: the state machine itself
//! - [`ConversationService`]: the per-message pipeline tying them together
//!
//! Every user's state is independent; the guard serialises access per user,
//! so the stores only need short internal locks.

mod affirmative;
mod deadline;
mod dialogue;
mod error;
mod guard;
mod history;
mod orchestrator;
pub mod prompt;
pub mod replies;
mod service;
mod table;

pub use affirmative::{AffirmativeTokens, DEFAULT_AFFIRMATIVE_TOKENS};
pub use dialogue::{DialogueSession, DialogueState, DialogueStore, Field};
pub use error::ConversationError;
pub use guard::{ConcurrencyGuard, ProcessingPermit};
pub use history::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_TRACKED_USERS, HistoryConfig, HistoryStore, Turn, TurnRole,
};
pub use orchestrator::{DialogueOrchestrator, Replies};
pub use service::{Content, ConversationConfig, ConversationService, Inbound, Outcome};
