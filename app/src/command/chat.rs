//! Terminal front end for the conversation service.
//!
//! Runs the same pipeline as the bot, as a single local user.

use async_trait::async_trait;
use florist_config::Config;
use florist_conversation::{ConversationService, Inbound};
use florist_core::{Outbox, UserId};
use florist_telegram::Command;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use super::build_service;

const LOCAL_USER: UserId = UserId(0);

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
}

/// Prints replies to stdout.
struct ConsoleOutbox;

#[async_trait]
impl Outbox for ConsoleOutbox {
    async fn send(&self, _user: UserId, text: &str) -> anyhow::Result<()> {
        println!("🌸 {text}");
        Ok(())
    }
}

async fn dispatch(service: &ConversationService, text: &str) {
    let outbox = ConsoleOutbox;
    match Command::parse_from_text(text) {
        Some(Command::Start) => {
            service.welcome(LOCAL_USER, text, &outbox).await;
        }
        Some(Command::Help) => println!("{}", Command::help_text()),
        Some(Command::Cancel) => {
            service.cancel(LOCAL_USER, &outbox).await;
        }
        Some(Command::Reset) => {
            service.reset(LOCAL_USER, &outbox).await;
        }
        None => {
            service
                .handle(Inbound::text(LOCAL_USER, text), &outbox)
                .await;
        }
    }
}

/// Strategy for executing the Chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        config.validate_for_chat()?;
        let service = build_service(&config).await?;

        if let Some(msg) = input.message {
            dispatch(&service, &msg).await;
            return Ok(());
        }

        println!("Type a message, /help for commands, or 'exit' to quit.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if matches!(text, "exit" | "quit") {
                break;
            }

            dispatch(&service, text).await;
            info!("Local user is now in state {}", service.state(LOCAL_USER));
        }

        Ok(())
    }
}
