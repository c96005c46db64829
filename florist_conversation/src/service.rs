//! Per-message pipeline.
//!
//! guard → history(input) → classify (Idle only) → orchestrator step →
//! send + history(output) → guard release.

use crate::deadline;
use crate::dialogue::{DialogueState, DialogueStore};
use crate::error::ConversationError;
use crate::guard::ConcurrencyGuard;
use crate::history::{HistoryConfig, HistoryStore, TurnRole};
use crate::orchestrator::{DialogueOrchestrator, Replies};
use crate::prompt;
use crate::replies;
use async_trait::async_trait;
use florist_core::{
    IntentClassifier, IntentResult, LLMProvider, Outbox, Speaker, Transcript, UserId, UserProfile,
    UserRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Payload of an inbound message as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    /// Anything that is not plain text; carries the kind for logging.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub user: UserId,
    pub display_name: Option<String>,
    pub content: Content,
}

impl Inbound {
    pub fn text(user: UserId, text: impl Into<String>) -> Self {
        Self {
            user,
            display_name: None,
            content: Content::Text(text.into()),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }
}

/// How a single inbound message was disposed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Processed; the user is now in this state.
    Processed(DialogueState),
    /// Another message from the same user was in flight; this one was dropped.
    Busy,
    /// Non-text content, rejected without touching any state.
    Unsupported,
    /// Processing failed part-way; the user got the generic apology.
    Failed,
}

/// Tunables for the conversation layer.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Model passed to the chat-completion provider
    pub model: String,
    /// Persona sent as the first message of every generation
    pub system_prompt: String,
    /// Turns remembered per user
    pub history_limit: usize,
    /// Users tracked before the least recently active is forgotten
    pub max_tracked_users: usize,
    /// Limit on each classifier, generator and transport call
    pub request_timeout: Option<Duration>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            system_prompt: prompt::SYSTEM_PROMPT.to_string(),
            history_limit: crate::history::DEFAULT_HISTORY_LIMIT,
            max_tracked_users: crate::history::DEFAULT_MAX_TRACKED_USERS,
            request_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl ConversationConfig {
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_max_tracked_users(mut self, max: usize) -> Self {
        self.max_tracked_users = max;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Routes inbound messages through the guard, classifier and state machine.
///
/// Cheap to share behind an `Arc`; all per-user state lives in the stores.
pub struct ConversationService {
    guard: Arc<ConcurrencyGuard>,
    history: Arc<HistoryStore>,
    sessions: Arc<DialogueStore>,
    orchestrator: DialogueOrchestrator,
    classifier: Arc<dyn IntentClassifier>,
    registry: Option<Arc<dyn UserRegistry>>,
    transcript: Option<Arc<dyn Transcript>>,
    request_timeout: Option<Duration>,
}

impl ConversationService {
    #[must_use]
    pub fn new(
        config: ConversationConfig,
        provider: Arc<dyn LLMProvider>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        let guard = Arc::new(ConcurrencyGuard::new());
        let history = Arc::new(
            HistoryStore::new(
                &HistoryConfig::default()
                    .with_max_turns(config.history_limit)
                    .with_max_users(config.max_tracked_users),
            )
            .with_in_flight(Arc::clone(&guard)),
        );
        let sessions = Arc::new(
            DialogueStore::new(config.max_tracked_users).with_in_flight(Arc::clone(&guard)),
        );
        let orchestrator = DialogueOrchestrator::new(
            provider,
            Arc::clone(&history),
            Arc::clone(&sessions),
            config.model,
        )
        .with_system_prompt(config.system_prompt)
        .with_request_timeout(config.request_timeout);

        info!(
            "Conversation service ready: history_limit={}, max_tracked_users={}, timeout={:?}",
            config.history_limit, config.max_tracked_users, config.request_timeout
        );

        Self {
            guard,
            history,
            sessions,
            orchestrator,
            classifier,
            registry: None,
            transcript: None,
            request_timeout: config.request_timeout,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn UserRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_transcript(mut self, transcript: Arc<dyn Transcript>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    #[must_use]
    pub const fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    #[must_use]
    pub const fn sessions(&self) -> &Arc<DialogueStore> {
        &self.sessions
    }

    #[must_use]
    pub const fn guard(&self) -> &Arc<ConcurrencyGuard> {
        &self.guard
    }

    #[must_use]
    pub fn state(&self, user: UserId) -> DialogueState {
        self.sessions.state(user)
    }

    /// Process one inbound message end to end.
    ///
    /// Never fails: every problem is contained to this message and reported
    /// to the user. The user's permit is released on every path.
    pub async fn handle(&self, inbound: Inbound, outbox: &dyn Outbox) -> Outcome {
        let user = inbound.user;

        let text = match inbound.content {
            Content::Text(text) => text,
            Content::Unsupported(kind) => {
                info!("Rejecting {kind} content from user {user}");
                self.send_notice(user, replies::TEXT_ONLY, outbox).await;
                return Outcome::Unsupported;
            }
        };

        let Some(_permit) = self.guard.permit(user) else {
            info!("User {user} is busy, dropping message");
            self.send_notice(user, replies::BUSY, outbox).await;
            return Outcome::Busy;
        };

        match self
            .process(user, inbound.display_name, &text, outbox)
            .await
        {
            Ok(state) => {
                debug!("User {user} left in state {state}");
                Outcome::Processed(state)
            }
            Err(e) => {
                error!("Failed to process message from user {user}: {e}");
                self.send_notice(user, replies::UNEXPECTED_ERROR, outbox)
                    .await;
                Outcome::Failed
            }
        }
    }

    /// Greet the user without touching dialogue state or history.
    pub async fn welcome(&self, user: UserId, command: &str, outbox: &dyn Outbox) -> Outcome {
        info!("User {user} started the bot");
        self.record(user, Speaker::User, command).await;
        self.send_notice(user, replies::GREETING, outbox).await;
        Outcome::Processed(self.state(user))
    }

    /// Abandon the current flow, keeping history.
    pub async fn cancel(&self, user: UserId, outbox: &dyn Outbox) -> Outcome {
        let Some(_permit) = self.guard.permit(user) else {
            self.send_notice(user, replies::BUSY, outbox).await;
            return Outcome::Busy;
        };

        self.sessions.reset(user);
        info!("User {user} cancelled the current flow");
        self.send_notice(user, replies::FLOW_CANCELLED, outbox).await;
        Outcome::Processed(DialogueState::Idle)
    }

    /// Abandon the current flow and forget the user's history.
    pub async fn reset(&self, user: UserId, outbox: &dyn Outbox) -> Outcome {
        let Some(_permit) = self.guard.permit(user) else {
            self.send_notice(user, replies::BUSY, outbox).await;
            return Outcome::Busy;
        };

        self.sessions.reset(user);
        self.history.clear(user);
        info!("User {user} reset the conversation");
        self.send_notice(user, replies::HISTORY_RESET, outbox).await;
        Outcome::Processed(DialogueState::Idle)
    }

    async fn process(
        &self,
        user: UserId,
        display_name: Option<String>,
        text: &str,
        outbox: &dyn Outbox,
    ) -> Result<DialogueState, ConversationError> {
        info!("User {user} says: {text}");
        self.record(user, Speaker::User, text).await;
        self.history.append(user, TurnRole::Input, text);

        let intent = if self.orchestrator.awaits_intent(user) {
            self.touch_registry(UserProfile {
                id: user,
                display_name,
            });
            Some(self.classify(user, text).await)
        } else {
            None
        };

        let out = TurnReplies {
            user,
            outbox,
            service: self,
        };
        self.orchestrator
            .step(user, text, intent.as_ref(), &out)
            .await
    }

    async fn classify(&self, user: UserId, text: &str) -> IntentResult {
        let sender = user.to_string();
        match deadline::within(
            self.request_timeout,
            "classification",
            self.classifier.classify(&sender, text),
        )
        .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!("Treating message from user {user} as unknown intent: {e}");
                IntentResult::unknown()
            }
        }
    }

    fn touch_registry(&self, profile: UserProfile) {
        let Some(registry) = self.registry.clone() else {
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = registry.touch(&profile).await {
                warn!("Failed to update registry for user {}: {e:#}", profile.id);
            }
        });
    }

    async fn deliver(
        &self,
        user: UserId,
        text: &str,
        outbox: &dyn Outbox,
    ) -> Result<(), ConversationError> {
        deadline::within(self.request_timeout, "delivery", outbox.send(user, text))
            .await?
            .map_err(ConversationError::Delivery)?;
        self.record(user, Speaker::Assistant, text).await;
        Ok(())
    }

    async fn send_notice(&self, user: UserId, text: &str, outbox: &dyn Outbox) {
        if let Err(e) = self.deliver(user, text, outbox).await {
            warn!("Could not notify user {user}: {e}");
        }
    }

    async fn record(&self, user: UserId, speaker: Speaker, text: &str) {
        if let Some(transcript) = &self.transcript {
            if let Err(e) = transcript.record(user, speaker, text).await {
                warn!("Failed to write transcript for user {user}: {e:#}");
            }
        }
    }
}

/// Delivers a step's output and keeps answers in the user's history.
struct TurnReplies<'a> {
    user: UserId,
    outbox: &'a dyn Outbox,
    service: &'a ConversationService,
}

#[async_trait]
impl Replies for TurnReplies<'_> {
    async fn answer(&self, text: &str) -> Result<(), ConversationError> {
        self.service.deliver(self.user, text, self.outbox).await?;
        self.service
            .history
            .append(self.user, TurnRole::Output, text);
        Ok(())
    }

    async fn notify(&self, text: &str) -> Result<(), ConversationError> {
        self.service.deliver(self.user, text, self.outbox).await
    }
}
