use serde::{Deserialize, Serialize};

/// A single streamed chunk from the `/chat/completions` endpoint.
///
/// Each `data:` line of the event stream carries one of these. A chunk
/// without choices, or whose delta has no content, contributes nothing to
/// the reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    /// The incremental choices. May be absent or empty.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// A single choice inside a streamed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// The incremental delta for this choice.
    #[serde(default)]
    pub delta: Delta,
}

/// The incremental content delta of a streamed chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// The text fragment, when the chunk carries one.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatChunk {
    /// Returns the first choice's non-empty content fragment, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }
}
