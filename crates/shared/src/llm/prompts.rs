use crate::models::TurnRole;
use crate::repos::ChatTurn;

use super::gateway::{ChatMessage, ChatRole};

pub const SYSTEM_PROMPT: &str = "You are an AI Study Assistant. \
You answer academic and learning-related questions clearly and simply. \
Use previous conversation context when available. \
If the question is not study-related, politely guide the user back to academic topics.";

/// Builds the message list sent to the model: the fixed system instruction,
/// every prior turn role-tagged, and the new question as the final user
/// message. Pure function of its inputs; no truncation.
pub fn assemble_prompt(history: &[ChatTurn], question: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));

    for turn in history {
        let role = match turn.role {
            TurnRole::Human => ChatRole::User,
            TurnRole::Ai => ChatRole::Assistant,
        };
        messages.push(ChatMessage {
            role,
            content: turn.message.clone(),
        });
    }

    messages.push(ChatMessage::user(question));
    messages
}
