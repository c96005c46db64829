//! Static strategy pattern for CLI commands.
//!
//! Each subcommand is its own strategy type with its own input, dispatched
//! statically from `main`.

use florist_config::Config;
use florist_conversation::{ConversationConfig, ConversationService, prompt};
use florist_providers::{OpenAiProvider, RasaClassifier};
use florist_storage::{FileTranscript, SqliteUserRegistry};
use std::sync::Arc;
use tracing::info;

mod chat;
mod info;
mod init;
mod telegram;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use telegram::{TelegramInput, TelegramStrategy};
pub use version::VersionStrategy;

/// Contract shared by every subcommand.
pub trait CommandStrategy: Send + Sync + 'static {
    /// Parameters parsed from the command line.
    type Input;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Conversation tunables from the `conversation` and `providers` sections.
fn conversation_config(config: &Config) -> ConversationConfig {
    let settings = &config.conversation;
    ConversationConfig::default()
        .with_model(config.providers.openai.model.clone())
        .with_system_prompt(
            settings
                .system_prompt
                .clone()
                .unwrap_or_else(|| prompt::SYSTEM_PROMPT.to_string()),
        )
        .with_history_limit(settings.history_limit)
        .with_max_tracked_users(settings.max_tracked_users)
        .with_request_timeout(settings.request_timeout())
}

/// Wire the provider, classifier, registry and transcript into one service.
async fn build_service(config: &Config) -> anyhow::Result<ConversationService> {
    let openai = &config.providers.openai;
    let provider = OpenAiProvider::new(openai.api_key.clone())
        .with_base_url(openai.base_url.clone())
        .with_default_model(openai.model.clone());
    info!("Using model {} at {}", openai.model, openai.base_url);

    let classifier = RasaClassifier::new(config.classifier.url.clone());
    info!("Using intent classifier at {}", classifier.url());

    let registry = SqliteUserRegistry::connect(&config.storage.database_url).await?;
    let transcript = FileTranscript::new(&config.storage.logs_dir)?;
    info!("Writing transcripts to {}", transcript.dir().display());

    Ok(ConversationService::new(
        conversation_config(config),
        Arc::new(provider),
        Arc::new(classifier),
    )
    .with_registry(Arc::new(registry))
    .with_transcript(Arc::new(transcript)))
}
