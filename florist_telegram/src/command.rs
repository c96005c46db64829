use teloxide::types::BotCommand;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Cancel,
    Reset,
}

impl Command {
    #[must_use]
    pub fn bot_commands() -> Vec<BotCommand> {
        vec![
            BotCommand::new("start", "Начать общение"),
            BotCommand::new("help", "Список команд"),
            BotCommand::new("cancel", "Отменить подбор букета"),
            BotCommand::new("reset", "Очистить историю диалога"),
        ]
    }

    /// Recognise `/cmd`, `/cmd@bot_name` and `/cmd payload`.
    #[must_use]
    pub fn parse_from_text(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?.to_lowercase();
        let name = first.split('@').next().unwrap_or(&first);

        match name {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/cancel" => Some(Self::Cancel),
            "/reset" => Some(Self::Reset),
            _ => None,
        }
    }

    #[must_use]
    pub const fn help_text() -> &'static str {
        r"
💐 Ассистент цветочного магазина

Команды:
/start  - приветствие
/cancel - отменить текущий подбор букета
/reset  - начать диалог с чистого листа
/help   - показать эту справку

Просто напишите, что вам нужно: например, «Хочу заказать букет на день рождения».
"
    }
}
