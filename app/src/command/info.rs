use florist_config::Config;
use florist_storage::SqliteUserRegistry;
use tracing::info;

/// Strategy for displaying configuration information.
///
/// Prints every section with secrets masked and checks that the user
/// database can be opened.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== florist Configuration ===\n");

        println!("Telegram:");
        println!("  Token: {}", mask_secret(&config.telegram.token));
        println!();

        let openai = &config.providers.openai;
        println!("OpenAI:");
        println!("  API Key: {}", mask_secret(&openai.api_key));
        println!("  Base URL: {}", openai.base_url);
        println!("  Model: {}", openai.model);
        println!();

        println!("Intent Classifier:");
        println!("  URL: {}", config.classifier.url);
        println!();

        let conversation = &config.conversation;
        println!("Conversation:");
        println!("  History Limit: {}", conversation.history_limit);
        println!("  Max Tracked Users: {}", conversation.max_tracked_users);
        match conversation.request_timeout() {
            Some(limit) => println!("  Request Timeout: {}s", limit.as_secs()),
            None => println!("  Request Timeout: (disabled)"),
        }
        if let Some(ref prompt) = conversation.system_prompt {
            println!("  System Prompt: {}", truncate(prompt, 60));
        }
        println!();

        println!("Storage:");
        println!("  Database: {}", config.storage.database_url);
        info!("Testing database connection");
        match SqliteUserRegistry::connect(&config.storage.database_url).await {
            Ok(registry) => {
                println!("  Status: Connected");
                match registry.user_count().await {
                    Ok(count) => println!("  Known Users: {count}"),
                    Err(e) => println!("  Known Users: unavailable ({e})"),
                }
            }
            Err(e) => {
                println!("  Status: Connection failed");
                println!("  Error: {e}");
            }
        }
        println!("  Transcripts: {}", config.storage.logs_dir.display());

        Ok(())
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        "(not set)".to_string()
    } else if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
