use crate::{Command, Result, TelegramBot};
use async_trait::async_trait;
use florist_conversation::{Content, Inbound};
use florist_core::{Outbox, UserId};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, Message, User};
use tracing::{debug, info};

/// Sends replies back into the chat a message came from.
pub struct TelegramOutbox {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramOutbox {
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl Outbox for TelegramOutbox {
    async fn send(&self, _user: UserId, text: &str) -> anyhow::Result<()> {
        self.bot.send_message(self.chat_id, text).await?;
        Ok(())
    }
}

/// Name of the non-text payload, for logs.
fn content_kind(msg: &Message) -> &'static str {
    if msg.photo().is_some() {
        "photo"
    } else if msg.sticker().is_some() {
        "sticker"
    } else if msg.voice().is_some() {
        "voice"
    } else if msg.audio().is_some() {
        "audio"
    } else if msg.video().is_some() {
        "video"
    } else if msg.video_note().is_some() {
        "video note"
    } else if msg.animation().is_some() {
        "animation"
    } else if msg.document().is_some() {
        "document"
    } else if msg.location().is_some() {
        "location"
    } else if msg.contact().is_some() {
        "contact"
    } else {
        "other"
    }
}

fn display_name(user: &User) -> Option<String> {
    let full = user.full_name();
    if full.trim().is_empty() {
        user.username.clone()
    } else {
        Some(full)
    }
}

/// Handle bot commands
pub async fn handle_command(
    bot: TelegramBot,
    msg: &Message,
    user: UserId,
    cmd: Command,
) -> Result<()> {
    let outbox = TelegramOutbox::new(bot.bot.clone(), msg.chat.id);
    let text = msg.text().unwrap_or_default();

    match cmd {
        Command::Start => {
            info!("[{user}] Command: /start");
            bot.service().welcome(user, text, &outbox).await;
        }
        Command::Help => {
            info!("[{user}] Command: /help");
            bot.bot
                .send_message(msg.chat.id, Command::help_text())
                .await?;
        }
        Command::Cancel => {
            info!("[{user}] Command: /cancel");
            bot.service().cancel(user, &outbox).await;
        }
        Command::Reset => {
            info!("[{user}] Command: /reset");
            bot.service().reset(user, &outbox).await;
        }
    }

    Ok(())
}

/// Handle any message (commands, text or other content)
pub async fn handle_message(bot: TelegramBot, msg: Message) -> Result<()> {
    let Some(sender) = msg.from.as_ref() else {
        debug!("Ignoring message without a sender in chat {}", msg.chat.id);
        return Ok(());
    };
    let user = UserId(sender.id.0);
    let username = sender.username.as_deref().unwrap_or("unknown");
    let outbox = TelegramOutbox::new(bot.bot.clone(), msg.chat.id);

    let Some(text) = msg.text() else {
        let kind = content_kind(&msg);
        info!("[@{username}] Sent {kind}");
        bot.service()
            .handle(
                Inbound {
                    user,
                    display_name: None,
                    content: Content::Unsupported(kind.to_string()),
                },
                &outbox,
            )
            .await;
        return Ok(());
    };

    if let Some(cmd) = Command::parse_from_text(text) {
        return handle_command(bot, &msg, user, cmd).await;
    }

    info!("[@{username}] Message: {text}");

    if let Err(e) = bot
        .bot
        .send_chat_action(msg.chat.id, ChatAction::Typing)
        .await
    {
        debug!("Typing indicator failed for chat {}: {e}", msg.chat.id);
    }

    let outcome = bot
        .service()
        .handle(
            Inbound::text(user, text).with_display_name(display_name(sender)),
            &outbox,
        )
        .await;

    debug!("[@{username}] Outcome: {outcome:?}");
    Ok(())
}
