//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the mutable
//! session configuration with validated setters.

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_BASE_URL;
use crate::error::{Error, Result};

/// Default model id.
const DEFAULT_MODEL: &str = "deepseek-chat";

/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default maximum tokens per response.
const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Command-line arguments for the deepchat tool.
#[derive(CommandLine, Debug, Default, PartialEq)]
pub struct ChatArgs {
    /// API key; falls back to the DEEPSEEK_API_KEY environment variable.
    #[arrrg(optional, "API key (default: DEEPSEEK_API_KEY env var)", "KEY")]
    pub api_key: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: deepseek-chat)", "MODEL")]
    pub model: Option<String>,

    /// API base URL.
    #[arrrg(optional, "API base URL (default: https://api.deepseek.com/v1)", "URL")]
    pub base_url: Option<String>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature 0.0-2.0 (default: 0.7)", "TEMP")]
    pub temperature: Option<f64>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 2000)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Disable streaming responses.
    #[arrrg(flag, "Disable streaming output")]
    pub no_stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Print the version and exit.
    #[arrrg(flag, "Print version and exit")]
    pub version: bool,
}

// arrrg's `CommandLine` trait requires `Eq`, which cannot be derived because
// of the `Option<f64>` `temperature` field. A marker impl satisfies the bound
// without altering any field type or behavior.
impl Eq for ChatArgs {}

/// Mutable generation parameters for a chat session.
///
/// Fields are only mutated through validated setters; a rejected value
/// leaves the prior state unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    model: String,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
    base_url: String,
}

impl SessionConfig {
    /// Creates a new SessionConfig with default values.
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            stream: true,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// The model id to generate with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The sampling temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// The maximum tokens per response.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Whether responses stream incrementally.
    pub fn stream(&self) -> bool {
        self.stream
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sets a parameter from the `/set` command surface.
    ///
    /// Accepted parameters: `temperature`, `max_tokens`, `stream`, `model`.
    pub fn set(&mut self, param: &str, value: &str) -> Result<()> {
        match param {
            "temperature" => {
                let parsed: f64 = value.parse().map_err(|_| {
                    Error::validation(
                        "temperature expects a number",
                        Some("temperature".to_string()),
                    )
                })?;
                self.set_temperature(parsed)
            }
            "max_tokens" => {
                let parsed: u32 = value.parse().map_err(|_| {
                    Error::validation(
                        "max_tokens expects a positive integer",
                        Some("max_tokens".to_string()),
                    )
                })?;
                self.set_max_tokens(parsed)
            }
            "stream" => {
                self.set_stream(value);
                Ok(())
            }
            "model" => self.set_model(value),
            _ => Err(Error::validation(
                format!("unknown parameter: {param}"),
                Some(param.to_string()),
            )),
        }
    }

    /// Sets the sampling temperature.
    ///
    /// Accepts finite values in [0.0, 2.0] inclusive.
    pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
        if temperature.is_finite() && (0.0..=2.0).contains(&temperature) {
            self.temperature = temperature;
            Ok(())
        } else {
            Err(Error::validation(
                "temperature must be between 0.0 and 2.0",
                Some("temperature".to_string()),
            ))
        }
    }

    /// Sets the maximum tokens per response. Must be positive.
    pub fn set_max_tokens(&mut self, max_tokens: u32) -> Result<()> {
        if max_tokens > 0 {
            self.max_tokens = max_tokens;
            Ok(())
        } else {
            Err(Error::validation(
                "max_tokens must be greater than 0",
                Some("max_tokens".to_string()),
            ))
        }
    }

    /// Sets the streaming flag.
    ///
    /// `true`, `1`, `yes`, and `on` (case-insensitive) enable streaming;
    /// any other token disables it.
    pub fn set_stream(&mut self, value: &str) {
        self.stream = matches!(
            value.to_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        );
    }

    /// Sets the model id. Any non-empty text is accepted.
    pub fn set_model(&mut self, model: &str) -> Result<()> {
        let model = model.trim();
        if model.is_empty() {
            return Err(Error::validation(
                "model must not be empty",
                Some("model".to_string()),
            ));
        }
        self.model = model.to_string();
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&ChatArgs> for SessionConfig {
    fn from(args: &ChatArgs) -> Self {
        SessionConfig {
            model: args.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: args.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: args.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stream: !args.no_stream,
            base_url: args
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}
