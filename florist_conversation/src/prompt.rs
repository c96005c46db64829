//! Prompt assembly for generation calls.

use crate::history::Turn;
use florist_core::{ChatMessage, Role};

/// Persona and ground rules sent as the first message of every request.
pub const SYSTEM_PROMPT: &str = "You are a friendly and helpful AI assistant for a flower shop.
Your goal is to assist customers with their orders, provide information about flowers, and handle common inquiries.
Be polite, concise, and always stay in character. Reply in the language the customer uses.
You should not answer questions that are not related to flowers, the shop, or customer orders.";

/// Build the message list for one generation call.
///
/// The result is `[system] + history + [user: current]`, oldest history first.
/// History is sent whole; the store's own bound is the only limit.
#[must_use]
pub fn assemble(system_prompt: &str, history: &[Turn], current: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new(Role::System, system_prompt));
    messages.extend(history.iter().map(Turn::to_chat_message));
    messages.push(ChatMessage::new(Role::User, current));
    messages
}

/// Structured request asking the model for a bouquet recommendation.
#[must_use]
pub fn recommendation_request(occasion: &str, budget: &str, preferences: &str) -> String {
    format!(
        "Подбери для клиента букет.\n\
         Повод: {occasion}\n\
         Бюджет: {budget}\n\
         Пожелания: {preferences}\n\n\
         Предложи один конкретный вариант букета: состав, цветовую гамму и примерную стоимость \
         в пределах бюджета. В конце спроси клиента, подходит ли ему этот вариант."
    )
}
