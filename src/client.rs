//! HTTP client for the DeepSeek chat-completion API.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_INTERRUPTS};
use crate::sse::{StreamEvent, decode_sse};
use crate::types::{ChatRequest, ChatResponse};

/// Default API base URL when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the DeepSeek API.
///
/// Each completion call issues exactly one HTTP POST; failures surface as a
/// single error value and the request is never silently resent, since a
/// resend could duplicate a partially received assistant turn.
#[derive(Debug, Clone)]
pub struct DeepSeek {
    api_key: String,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl DeepSeek {
    /// Create a new DeepSeek client.
    ///
    /// The API key can be provided directly or read from the
    /// DEEPSEEK_API_KEY environment variable.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var("DEEPSEEK_API_KEY").map_err(|_| {
                Error::authentication(
                    "API key not provided and DEEPSEEK_API_KEY environment variable not set",
                )
            })?,
        };

        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url)?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::transport(
                    format!("failed to build HTTP client: {e}"),
                    None,
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    /// Returns the base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the completions endpoint URL.
    fn endpoint_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = format!("Bearer {}", self.api_key);
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&bearer).map_err(|_| {
                Error::authentication("API key contains characters not valid in a header")
            })?,
        );
        Ok(headers)
    }

    /// Classify a reqwest send error into our error type.
    fn classify_send_error(&self, e: reqwest::Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if e.is_timeout() {
            Error::transport(
                format!(
                    "request timed out after {:.0} seconds: {e}",
                    self.timeout.as_secs_f64()
                ),
                None,
                Some(Box::new(e)),
            )
        } else if e.is_connect() {
            Error::transport(format!("connection error: {e}"), None, Some(Box::new(e)))
        } else {
            Error::transport(format!("request failed: {e}"), None, Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        let status_code = response.status().as_u16();

        // Try to parse error response body
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            message: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::transport(
                    format!("failed to read error response: {e}"),
                    Some(status_code),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| e.message)
            .unwrap_or(error_body);

        Error::transport(message, Some(status_code), None)
    }

    /// Send a completion request and get the full reply synchronously.
    ///
    /// Fails with a response format error if the expected content path is
    /// absent from a 2xx body.
    pub async fn send(&self, mut request: ChatRequest) -> Result<String> {
        request.stream = false;
        CLIENT_REQUESTS.click();

        let response = self
            .client
            .post(self.endpoint_url())
            .headers(self.default_headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            Error::response_format(
                format!("failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })?;
        match parsed.content() {
            Some(content) => Ok(content.to_string()),
            None => Err(Error::response_format(
                "response carried no choices[0].message.content",
                None,
            )),
        }
    }

    /// Send a completion request and get a stream of decoded events.
    ///
    /// Returns the raw event stream; most callers want
    /// [`send_streaming`](Self::send_streaming) instead.
    pub async fn stream(
        &self,
        mut request: ChatRequest,
    ) -> Result<impl futures::Stream<Item = Result<StreamEvent>>> {
        request.stream = true;
        CLIENT_REQUESTS.click();

        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let response = self
            .client
            .post(self.endpoint_url())
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        Ok(decode_sse(response.bytes_stream()))
    }

    /// Send a streaming completion request, forwarding every fragment to
    /// `sink` as it arrives and returning the accumulated reply.
    ///
    /// Decoding stops at the terminal sentinel; a transport that ends
    /// without it is treated as completion and the accumulated text is the
    /// final answer. When `interrupted` is set mid-stream, decoding stops,
    /// the partial tail is discarded, and an interrupted error is returned.
    pub async fn send_streaming(
        &self,
        request: ChatRequest,
        mut sink: impl FnMut(&str),
        interrupted: &AtomicBool,
    ) -> Result<String> {
        let stream = self.stream(request).await?;
        futures::pin_mut!(stream);

        let mut accumulated = String::new();
        while let Some(event) = stream.next().await {
            if interrupted.load(Ordering::Relaxed) {
                STREAM_INTERRUPTS.click();
                return Err(Error::interrupted("streaming response interrupted"));
            }
            match event? {
                StreamEvent::Delta(fragment) => {
                    sink(&fragment);
                    accumulated.push_str(&fragment);
                }
                StreamEvent::Done => break,
            }
        }
        Ok(accumulated)
    }
}
