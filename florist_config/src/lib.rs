mod schema;

pub use schema::{
    ClassifierConfig, Config, ConversationSettings, OpenAiConfig, ProvidersConfig, StorageConfig,
    TelegramConfig,
};
