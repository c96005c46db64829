use crate::{Command, Error, Result};
use florist_conversation::ConversationService;
use std::{sync::Arc, time::Duration};
use teloxide::prelude::*;
use tokio::time::sleep;
use tracing::{info, warn};

/// Telegram front end of the conversation service.
#[derive(Clone)]
pub struct TelegramBot {
    /// Teloxide bot instance
    pub bot: Bot,
    service: Arc<ConversationService>,
}

impl TelegramBot {
    pub fn new(token: String, service: Arc<ConversationService>) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::Config("Telegram bot token is empty".into()));
        }

        Ok(Self {
            bot: Bot::new(token),
            service,
        })
    }

    #[must_use]
    pub const fn service(&self) -> &Arc<ConversationService> {
        &self.service
    }

    /// Probe the Telegram API until it answers.
    /// Waits 2s, 4s, 6s, ... between attempts, capped at 10s.
    async fn test_connection(&self) {
        const INITIAL_DELAY_SECS: u64 = 2;
        const MAX_DELAY_SECS: u64 = 10;

        let mut attempt = 1u64;
        loop {
            match self.bot.get_me().await {
                Ok(me) => {
                    info!(
                        "Connected to Telegram API: @{} (id: {})",
                        me.user
                            .username
                            .as_deref()
                            .unwrap_or("no username"),
                        me.user.id
                    );
                    return;
                }
                Err(e) => {
                    let delay_secs = (INITIAL_DELAY_SECS * attempt).min(MAX_DELAY_SECS);

                    warn!("Connection attempt {attempt} failed: {e}. Retrying in {delay_secs}s...");

                    if attempt == 1 {
                        warn!("This may be due to:");
                        warn!("  - Network connectivity issues");
                        warn!("  - Firewall blocking api.telegram.org");
                        warn!("  - Invalid bot token");
                        warn!("  - Proxy or VPN configuration required");
                    }

                    sleep(Duration::from_secs(delay_secs)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Run the bot until Ctrl-C.
    ///
    /// Updates are dispatched without per-chat ordering so that a second
    /// message from a busy user reaches the guard instead of queueing.
    pub async fn run(self) -> Result<()> {
        use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
        use teloxide::dptree;
        use teloxide::types::Update;

        self.test_connection().await;

        self.bot.delete_webhook().drop_pending_updates(true).await?;
        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("Could not register bot commands: {e}");
        }

        let bot = self.bot.clone();

        let schema = dptree::entry().branch(Update::filter_message().endpoint({
            let handle = self.clone();
            move |_bot: Bot, msg: teloxide::types::Message| {
                let handle = handle.clone();
                async move { crate::handler::handle_message(handle, msg).await }
            }
        }));

        info!("Starting dispatcher");
        Dispatcher::builder(bot, schema)
            .distribution_function(|_| None::<std::convert::Infallible>)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Bot stopped");
        Ok(())
    }
}
