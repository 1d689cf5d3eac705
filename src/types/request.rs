use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Request body for the `/chat/completions` endpoint.
///
/// The full ordered transcript is sent as `messages` on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model id to generate with.
    pub model: String,

    /// The conversation so far, oldest first.
    pub messages: Vec<Message>,

    /// Maximum number of tokens to generate.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f64,

    /// Whether the response should be streamed as server-sent events.
    pub stream: bool,
}

impl ChatRequest {
    /// Create a new request from a transcript and generation parameters.
    pub fn new(
        model: impl Into<String>,
        messages: Vec<Message>,
        max_tokens: u32,
        temperature: f64,
        stream: bool,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            temperature,
            stream,
        }
    }
}
