use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const CONFIG_DIR_NAME: &str = "florist";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub conversation: ConversationSettings,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "OpenAiConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "OpenAiConfig::default_model")]
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::default_base_url(),
            model: Self::default_model(),
        }
    }
}

impl OpenAiConfig {
    fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }

    fn default_model() -> String {
        "gpt-4o-mini".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "ClassifierConfig::default_url")]
    pub url: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
        }
    }
}

impl ClassifierConfig {
    fn default_url() -> String {
        "http://localhost:5005/model/parse".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationSettings {
    #[serde(default = "ConversationSettings::default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "ConversationSettings::default_max_tracked_users")]
    pub max_tracked_users: usize,
    /// Zero disables the limit.
    #[serde(default = "ConversationSettings::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            history_limit: Self::default_history_limit(),
            max_tracked_users: Self::default_max_tracked_users(),
            request_timeout_secs: Self::default_request_timeout_secs(),
            system_prompt: None,
        }
    }
}

impl ConversationSettings {
    const fn default_history_limit() -> usize {
        10
    }

    const fn default_max_tracked_users() -> usize {
        10_000
    }

    const fn default_request_timeout_secs() -> u64 {
        60
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Empty values are filled in relative to the config directory on load.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub database_url: String,
    #[serde(default)]
    pub logs_dir: PathBuf,
}

impl StorageConfig {
    fn fill_defaults(&mut self, config_dir: &Path) {
        if self.database_url.trim().is_empty() {
            self.database_url = format!(
                "sqlite://{}?mode=rwc",
                config_dir.join("users.db").display()
            );
        }
        if self.logs_dir.as_os_str().is_empty() {
            self.logs_dir = config_dir.join("logs");
        }
    }
}

impl Config {
    /// `~/florist`
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR_NAME))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Read `~/florist/config.json` and apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'florist init' to create config.",
                config_path.display()
            );
        }

        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file. Storage paths default to siblings of the file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {e}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.storage.fill_defaults(base);
        Ok(config)
    }

    /// Override file values with non-empty variables from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            debug!("Telegram token taken from environment");
            self.telegram.token = token;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            debug!("OpenAI API key taken from environment");
            self.providers.openai.api_key = key;
        }
        if let Some(model) = get("OPENAI_MODEL_NAME") {
            self.providers.openai.model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.providers.openai.base_url = url;
        }
        if let Some(url) = get("RASA_API_URL") {
            self.classifier.url = url;
        }
    }

    /// Fail early when the bot cannot possibly start.
    pub fn validate_for_bot(&self) -> anyhow::Result<()> {
        if self.telegram.token.trim().is_empty() {
            anyhow::bail!(
                "Telegram bot token is not configured. Set telegram.token in the config file or TELEGRAM_BOT_TOKEN."
            );
        }
        self.validate_for_chat()
    }

    pub fn validate_for_chat(&self) -> anyhow::Result<()> {
        if self.providers.openai.api_key.trim().is_empty() {
            anyhow::bail!(
                "OpenAI API key is not configured. Set providers.openai.api_key in the config file or OPENAI_API_KEY."
            );
        }
        Ok(())
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, Self::template(&config_dir))?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Add your Telegram bot token and OpenAI API key");
        println!("   2. Start the Rasa server at the classifier url");
        println!("   3. Run 'florist telegram' to start the bot, or 'florist chat' to try it locally");
        println!();
        println!("🔧 Configuration options:");
        println!("   - conversation.history_limit: turns kept per customer");
        println!("   - conversation.request_timeout_secs: limit for each external call, 0 disables");
        println!("   - storage.logs_dir: per-customer conversation transcripts");
        println!();
        Ok(())
    }

    fn template(config_dir: &Path) -> String {
        let mut config = Self::default();
        config.telegram.token = "your-telegram-bot-token-here".to_string();
        config.providers.openai.api_key = "your-openai-api-key-here".to_string();
        config.storage.fill_defaults(config_dir);
        serde_json::to_string_pretty(&config).unwrap_or_default()
    }
}
