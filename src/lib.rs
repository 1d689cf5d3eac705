// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod history;
pub mod observability;
pub mod sse;
pub mod types;
pub mod utils;

// Re-exports
pub use client::DeepSeek;
pub use error::{Error, Result};
pub use history::{Transcript, default_history_path};
pub use sse::{StreamEvent, decode_sse};
pub use types::*;
