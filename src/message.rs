//! Chat message types sent to LLM backends.
//!
//! A planning request is always a short, stateless exchange: one system
//! message with instructions and one user message with the goal and history.
//! These types serialize directly into the `messages` array of Ollama and
//! OpenAI-compatible chat APIs.

use serde::{Deserialize, Serialize};

/// A single message in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
        }
    }
}

/// Flattens chat messages into one prompt for completion-only endpoints.
pub fn to_prompt(messages: &[ChatMessage]) -> String {
    let mut parts: Vec<String> = messages
        .iter()
        .map(|m| format!("{}:\n{}\n", m.role.to_string().to_uppercase(), m.content))
        .collect();
    parts.push("ASSISTANT:\n".to_string());
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase_roles() {
        let value = serde_json::to_value(ChatMessage::system("be brief")).unwrap();
        assert_eq!(value, serde_json::json!({"role": "system", "content": "be brief"}));
    }

    #[test]
    fn prompt_flattening_ends_with_assistant_turn() {
        let prompt = to_prompt(&[ChatMessage::system("rules"), ChatMessage::user("goal")]);
        assert_eq!(prompt, "SYSTEM:\nrules\n\nUSER:\ngoal\n\nASSISTANT:\n");
    }
}
