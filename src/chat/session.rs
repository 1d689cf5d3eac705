//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which composes the API
//! client, the transcript store, and the session configuration, and runs
//! one exchange at a time: commit the user turn, issue the completion,
//! append the assistant turn on success, persist.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::chat::config::SessionConfig;
use crate::chat::render::Renderer;
use crate::client::DeepSeek;
use crate::error::Result;
use crate::history::Transcript;
use crate::types::{ChatRequest, Message};

/// A chat session that manages conversation state and API interactions.
///
/// The session owns the transcript; the user turn of every exchange is
/// committed before the network call and stays committed if the call
/// fails. The assistant turn is appended only when the exchange succeeds
/// with non-empty content.
pub struct ChatSession {
    client: DeepSeek,
    config: SessionConfig,
    transcript: Transcript,
    history_path: PathBuf,
}

impl ChatSession {
    /// Creates a new chat session with the given client and configuration.
    pub fn new(client: DeepSeek, config: SessionConfig, history_path: PathBuf) -> Self {
        Self {
            client,
            config,
            transcript: Transcript::new(),
            history_path,
        }
    }

    /// Loads persisted history into the session.
    ///
    /// A missing file leaves the transcript empty. A corrupt file is
    /// surfaced as an error; the transcript stays empty and the session
    /// remains usable, so the caller can warn and continue.
    pub fn load_history(&mut self) -> Result<usize> {
        self.transcript = Transcript::load(&self.history_path)?;
        Ok(self.transcript.len())
    }

    /// Sends a user message and renders the reply.
    ///
    /// This method:
    /// 1. Appends the user message to the transcript (kept on failure)
    /// 2. Issues the completion request, streaming per the session config
    /// 3. Appends the assistant reply to the transcript when the exchange
    ///    produced content
    /// 4. Persists the transcript (a save failure warns, nothing rolls
    ///    back)
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the user interrupts a
    /// stream; the committed user turn is not removed in either case.
    pub async fn send(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        interrupted: Arc<AtomicBool>,
    ) -> Result<()> {
        self.transcript.append(Message::user(user_input));

        let request = ChatRequest::new(
            self.config.model(),
            self.transcript.messages().to_vec(),
            self.config.max_tokens(),
            self.config.temperature(),
            self.config.stream(),
        );

        let outcome = if self.config.stream() {
            self.client
                .send_streaming(request, |fragment| renderer.print_text(fragment), &interrupted)
                .await
        } else {
            match self.client.send(request).await {
                Ok(reply) => {
                    renderer.print_text(&reply);
                    Ok(reply)
                }
                Err(err) => Err(err),
            }
        };

        let result = match outcome {
            Ok(reply) => {
                renderer.finish_response();
                if !reply.is_empty() {
                    self.transcript.append(Message::assistant(reply));
                }
                Ok(())
            }
            Err(err) => Err(err),
        };

        if let Err(err) = self.transcript.save(&self.history_path) {
            renderer.print_warning(&format!("failed to save history: {err}"));
        }

        result
    }

    /// Clears the conversation and deletes the persisted history file.
    ///
    /// The in-memory transcript is cleared even when file deletion fails;
    /// the error is returned so the caller can report it.
    pub fn clear(&mut self) -> Result<()> {
        self.transcript.clear_with_file(&self.history_path)
    }

    /// Sets a configuration parameter from the `/set` command surface.
    pub fn set_param(&mut self, param: &str, value: &str) -> Result<()> {
        self.config.set(param, value)
    }

    /// Returns the transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the history file path.
    pub fn history_path(&self) -> &Path {
        &self.history_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn temp_history_path(tag: &str) -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "deepchat-session-{tag}-{}-{seq}.json",
            std::process::id()
        ))
    }

    fn test_session(tag: &str) -> ChatSession {
        let client = DeepSeek::new(Some("test-key".to_string())).unwrap();
        ChatSession::new(client, SessionConfig::new(), temp_history_path(tag))
    }

    #[test]
    fn new_session_empty() {
        let session = test_session("empty");
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn load_missing_history_is_empty() {
        let mut session = test_session("load-missing");
        assert_eq!(session.load_history().unwrap(), 0);
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn load_corrupt_history_errors_but_session_usable() {
        let mut session = test_session("load-corrupt");
        std::fs::write(session.history_path(), "not json").unwrap();

        let err = session.load_history().unwrap_err();
        assert!(err.is_corrupt_history());
        assert!(session.transcript().is_empty());

        let _ = std::fs::remove_file(session.history_path());
    }

    #[test]
    fn clear_session_removes_file_and_memory() {
        let mut session = test_session("clear");
        session.transcript.append(Message::user("hi"));
        session.transcript.save(session.history_path()).unwrap();

        session.clear().unwrap();
        assert!(session.transcript().is_empty());
        assert!(!session.history_path().exists());

        // Clearing again with no backing file is not an error.
        session.clear().unwrap();
    }

    #[test]
    fn set_param_delegates_to_config() {
        let mut session = test_session("set");
        session.set_param("temperature", "1.3").unwrap();
        assert_eq!(session.config().temperature(), 1.3);

        let err = session.set_param("temperature", "9.9").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.config().temperature(), 1.3);
    }
}
