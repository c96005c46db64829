//! The dialogue state machine.
//!
//! Intent classification only matters in `Idle`. Once a user is inside the
//! guided flow every message is taken as the answer to the last question:
//!
//! ```text
//! Idle --order/recommend--> WaitingForOccasion --> WaitingForBudget
//!      --order/recommend + occasion-------------->  |
//!                                                   v
//! Idle <--confirm/decline-- ConfirmingOrder <-- WaitingForPreferences
//! ```

use crate::affirmative::AffirmativeTokens;
use crate::deadline;
use crate::dialogue::{DialogueState, DialogueStore, Field};
use crate::error::ConversationError;
use crate::history::HistoryStore;
use crate::prompt;
use crate::replies;
use async_trait::async_trait;
use florist_core::{Intent, IntentResult, LLMProvider, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sink for the texts a single step produces, in emission order.
#[async_trait]
pub trait Replies: Send + Sync {
    /// Deliver a reply that becomes part of the conversation history.
    async fn answer(&self, text: &str) -> Result<(), ConversationError>;

    /// Deliver a transient notice that is kept out of the history.
    async fn notify(&self, text: &str) -> Result<(), ConversationError>;
}

/// Drives the per-user flow: occasion, budget, preferences, recommendation, confirmation.
pub struct DialogueOrchestrator {
    provider: Arc<dyn LLMProvider>,
    history: Arc<HistoryStore>,
    sessions: Arc<DialogueStore>,
    affirmative: AffirmativeTokens,
    model: String,
    system_prompt: String,
    request_timeout: Option<Duration>,
}

impl DialogueOrchestrator {
    #[must_use]
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        history: Arc<HistoryStore>,
        sessions: Arc<DialogueStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            history,
            sessions,
            affirmative: AffirmativeTokens::default(),
            model: model.into(),
            system_prompt: prompt::SYSTEM_PROMPT.to_string(),
            request_timeout: None,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    #[must_use]
    pub fn with_affirmative_tokens(mut self, affirmative: AffirmativeTokens) -> Self {
        self.affirmative = affirmative;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn state(&self, user: UserId) -> DialogueState {
        self.sessions.state(user)
    }

    /// Whether the next message from `user` should be classified first.
    #[must_use]
    pub fn awaits_intent(&self, user: UserId) -> bool {
        self.state(user) == DialogueState::Idle
    }

    /// Advance the user's dialogue by one inbound message.
    ///
    /// `intent` is only consulted in `Idle`; a missing result is treated as
    /// [`Intent::Unknown`]. Returns the state the user is left in.
    pub async fn step(
        &self,
        user: UserId,
        text: &str,
        intent: Option<&IntentResult>,
        out: &dyn Replies,
    ) -> Result<DialogueState, ConversationError> {
        let state = self.sessions.state(user);
        debug!("Dialogue step for user {user} in state {state}");

        match state {
            DialogueState::Idle => {
                let unknown = IntentResult::unknown();
                self.on_idle(user, text, intent.unwrap_or(&unknown), out)
                    .await?;
            }
            DialogueState::WaitingForOccasion => {
                self.sessions.update(user, |s| {
                    s.advance(Field::Occasion, text, DialogueState::WaitingForBudget);
                });
                out.answer(replies::ASK_BUDGET).await?;
            }
            DialogueState::WaitingForBudget => {
                self.sessions.update(user, |s| {
                    s.advance(Field::Budget, text, DialogueState::WaitingForPreferences);
                });
                out.answer(replies::ASK_PREFERENCES).await?;
            }
            DialogueState::WaitingForPreferences => {
                self.recommend(user, text, out).await?;
            }
            DialogueState::ConfirmingOrder => {
                self.confirm(user, text, out).await?;
            }
        }

        Ok(self.sessions.state(user))
    }

    async fn on_idle(
        &self,
        user: UserId,
        text: &str,
        intent: &IntentResult,
        out: &dyn Replies,
    ) -> Result<(), ConversationError> {
        info!("User {user} intent: {}", intent.intent.label());

        if intent.intent.starts_flow() {
            if let Some(occasion) = intent.entity("occasion") {
                self.sessions.update(user, |s| {
                    s.advance(Field::Occasion, occasion, DialogueState::WaitingForBudget);
                });
                return out.answer(replies::ASK_BUDGET).await;
            }

            self.sessions
                .update(user, |s| s.set_state(DialogueState::WaitingForOccasion));
            return out.answer(replies::ASK_OCCASION).await;
        }

        if intent.intent == Intent::Greeting {
            return out.answer(replies::GREETING).await;
        }

        let response = self.generate(user, text).await;
        out.answer(response.as_deref().unwrap_or(replies::GENERATION_FAILED)).await
    }

    async fn recommend(
        &self,
        user: UserId,
        preferences: &str,
        out: &dyn Replies,
    ) -> Result<(), ConversationError> {
        // The state moves on regardless of how generation turns out.
        let session = self.sessions.update(user, |s| {
            s.advance(Field::Preferences, preferences, DialogueState::ConfirmingOrder);
            s.clone()
        });

        out.notify(replies::PREPARING_RECOMMENDATION).await?;

        let request = prompt::recommendation_request(
            session.field(Field::Occasion).unwrap_or("не указан"),
            session.field(Field::Budget).unwrap_or("не указан"),
            preferences,
        );

        match self.generate(user, &request).await {
            Some(recommendation) => {
                self.sessions.update(user, |s| {
                    s.set_field(Field::Recommendation, recommendation.clone());
                });
                out.answer(&recommendation).await
            }
            None => out.answer(replies::GENERATION_FAILED).await,
        }
    }

    async fn confirm(
        &self,
        user: UserId,
        text: &str,
        out: &dyn Replies,
    ) -> Result<(), ConversationError> {
        let session = self.sessions.get(user);
        self.sessions.reset(user);

        if self.affirmative.matches(text) {
            info!(
                "User {user} accepted recommendation (occasion: {:?}, budget: {:?})",
                session.field(Field::Occasion),
                session.field(Field::Budget)
            );
            out.answer(replies::ORDER_ACCEPTED).await
        } else {
            info!("User {user} declined recommendation");
            out.answer(replies::ORDER_DECLINED).await
        }
    }

    /// One generation attempt over the user's history. `None` on any failure.
    async fn generate(&self, user: UserId, current: &str) -> Option<String> {
        let messages = prompt::assemble(&self.system_prompt, &self.history.snapshot(user), current);
        debug!(
            "Requesting generation for user {user} with {} messages",
            messages.len()
        );

        let outcome = deadline::within(
            self.request_timeout,
            "generation",
            self.provider.chat(&messages, &self.model),
        )
        .await;

        match outcome {
            Ok(Ok(response)) if !response.content.trim().is_empty() => Some(response.content),
            Ok(Ok(_)) => {
                warn!("Empty generation for user {user}");
                None
            }
            Ok(Err(e)) => {
                warn!("Generation failed for user {user}: {e:#}");
                None
            }
            Err(e) => {
                warn!("Generation failed for user {user}: {e}");
                None
            }
        }
    }
}
