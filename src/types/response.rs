use serde::{Deserialize, Serialize};

use crate::types::Role;

/// A non-streaming response from the `/chat/completions` endpoint.
///
/// Only the fields this client consumes are modeled; unknown fields are
/// ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated choices. The API returns at least one on success.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// A single completion choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// The generated message.
    pub message: ResponseMessage,
}

/// The message inside a completion choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// The role of the generated message.
    pub role: Role,

    /// The generated text.
    #[serde(default)]
    pub content: String,
}

impl ChatResponse {
    /// Returns the first choice's content, if the response carries one.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}
