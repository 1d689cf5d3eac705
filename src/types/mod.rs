//! Wire types for the DeepSeek chat-completion API.
//!
//! These are the serde models for the request body, the non-streaming
//! response, and the streamed chunk shape. One concern per file.

mod chunk;
mod message;
mod request;
mod response;

pub use chunk::{ChatChunk, ChunkChoice, Delta};
pub use message::{Message, Role};
pub use request::ChatRequest;
pub use response::{ChatResponse, Choice, ResponseMessage};
