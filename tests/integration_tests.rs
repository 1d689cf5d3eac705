//! Integration tests for the deepchat library.
//!
//! The exchange tests run against a throwaway local HTTP server; the live
//! API tests require DEEPSEEK_API_KEY in the environment and skip
//! themselves otherwise.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use deepchat::DeepSeek;
use deepchat::chat::{ChatSession, Renderer, SessionConfig};
use deepchat::types::{ChatRequest, Message, Role};

fn temp_history_path(tag: &str) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "deepchat-integration-{tag}-{}-{seq}.json",
        std::process::id()
    ))
}

/// Renderer that records everything instead of printing.
#[derive(Default)]
struct RecordingRenderer {
    text: String,
    infos: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    interrupted: bool,
}

impl Renderer for RecordingRenderer {
    fn print_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn print_info(&mut self, info: &str) {
        self.infos.push(info.to_string());
    }

    fn print_warning(&mut self, warning: &str) {
        self.warnings.push(warning.to_string());
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn finish_response(&mut self) {}

    fn print_interrupted(&mut self) {
        self.interrupted = true;
    }
}

/// Serve a single canned HTTP response on a fresh local port.
///
/// The whole request (headers plus Content-Length body) is consumed before
/// responding so the client never sees a half-closed socket mid-write.
async fn one_shot_server(
    status_line: &'static str,
    content_type: &'static str,
    body: &'static str,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_full_request(&mut socket).await;
        let response = format!(
            "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len(),
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

async fn read_full_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = socket.read(&mut tmp).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&tmp[..n]);
        let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
        let content_length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= pos + 4 + content_length {
            return;
        }
    }
}

#[tokio::test]
async fn streaming_exchange_appends_both_turns() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
                data: [DONE]\n\n";
    let base_url = one_shot_server("HTTP/1.1 200 OK", "text/event-stream", body).await;

    let client =
        DeepSeek::with_options(Some("test-key".to_string()), Some(base_url), None).unwrap();
    let mut session = ChatSession::new(client, SessionConfig::new(), temp_history_path("stream"));
    let mut renderer = RecordingRenderer::default();
    let interrupted = Arc::new(AtomicBool::new(false));

    session
        .send("Hello", &mut renderer, interrupted)
        .await
        .unwrap();

    assert_eq!(renderer.text, "Hello");
    let messages = session.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], Message::user("Hello"));
    assert_eq!(messages[1], Message::assistant("Hello"));

    // The exchange also persisted to disk.
    let loaded = deepchat::Transcript::load(session.history_path()).unwrap();
    assert_eq!(loaded.messages(), messages);

    let _ = std::fs::remove_file(session.history_path());
}

#[tokio::test]
async fn batch_exchange_renders_full_reply() {
    let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}}]}"#;
    let base_url = one_shot_server("HTTP/1.1 200 OK", "application/json", body).await;

    let client =
        DeepSeek::with_options(Some("test-key".to_string()), Some(base_url), None).unwrap();
    let mut config = SessionConfig::new();
    config.set("stream", "off").unwrap();
    let mut session = ChatSession::new(client, config, temp_history_path("batch"));
    let mut renderer = RecordingRenderer::default();

    session
        .send("Hello", &mut renderer, Arc::new(AtomicBool::new(false)))
        .await
        .unwrap();

    assert_eq!(renderer.text, "Hi there");
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(session.transcript().messages()[1].role, Role::Assistant);

    let _ = std::fs::remove_file(session.history_path());
}

#[tokio::test]
async fn connection_refused_keeps_only_user_turn() {
    // Bind and immediately drop a listener so the port is closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = DeepSeek::with_options(
        Some("test-key".to_string()),
        Some(format!("http://{addr}")),
        None,
    )
    .unwrap();
    let mut session =
        ChatSession::new(client, SessionConfig::new(), temp_history_path("refused"));
    let mut renderer = RecordingRenderer::default();

    let err = session
        .send("Hello", &mut renderer, Arc::new(AtomicBool::new(false)))
        .await
        .unwrap_err();

    assert!(err.is_transport());
    let messages = session.transcript().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0], Message::user("Hello"));

    let _ = std::fs::remove_file(session.history_path());
}

#[tokio::test]
async fn non_2xx_is_a_transport_error() {
    let body = r#"{"error":{"message":"invalid api key","type":"authentication_error"}}"#;
    let base_url = one_shot_server("HTTP/1.1 401 Unauthorized", "application/json", body).await;

    let client =
        DeepSeek::with_options(Some("bad-key".to_string()), Some(base_url), None).unwrap();
    let request = ChatRequest::new("deepseek-chat", vec![Message::user("hi")], 10, 0.7, false);

    let err = client.send(request).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.status_code(), Some(401));
    assert!(err.to_string().contains("invalid api key"));
}

#[tokio::test]
async fn unexpected_2xx_shape_is_a_response_format_error() {
    let body = r#"{"choices":[]}"#;
    let base_url = one_shot_server("HTTP/1.1 200 OK", "application/json", body).await;

    let client =
        DeepSeek::with_options(Some("test-key".to_string()), Some(base_url), None).unwrap();
    let request = ChatRequest::new("deepseek-chat", vec![Message::user("hi")], 10, 0.7, false);

    let err = client.send(request).await.unwrap_err();
    assert!(err.is_response_format());
}

#[tokio::test]
async fn empty_streamed_reply_is_not_appended() {
    let body = "data: {\"choices\":[{\"delta\":{}}]}\n\ndata: [DONE]\n\n";
    let base_url = one_shot_server("HTTP/1.1 200 OK", "text/event-stream", body).await;

    let client =
        DeepSeek::with_options(Some("test-key".to_string()), Some(base_url), None).unwrap();
    let mut session = ChatSession::new(client, SessionConfig::new(), temp_history_path("empty"));
    let mut renderer = RecordingRenderer::default();

    session
        .send("Hello", &mut renderer, Arc::new(AtomicBool::new(false)))
        .await
        .unwrap();

    assert_eq!(renderer.text, "");
    assert_eq!(session.transcript().len(), 1);

    let _ = std::fs::remove_file(session.history_path());
}

#[tokio::test]
async fn interrupt_discards_partial_reply() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n\
                data: {\"choices\":[{\"delta\":{\"content\":\" more\"}}]}\n\n\
                data: [DONE]\n\n";
    let base_url = one_shot_server("HTTP/1.1 200 OK", "text/event-stream", body).await;

    let client =
        DeepSeek::with_options(Some("test-key".to_string()), Some(base_url), None).unwrap();
    let mut session =
        ChatSession::new(client, SessionConfig::new(), temp_history_path("interrupt"));
    let mut renderer = RecordingRenderer::default();

    // Flag already set: the first poll observes it and aborts the stream.
    let interrupted = Arc::new(AtomicBool::new(true));
    let err = session
        .send("Hello", &mut renderer, interrupted)
        .await
        .unwrap_err();

    assert!(err.is_interrupted());
    assert_eq!(session.transcript().len(), 1);

    let _ = std::fs::remove_file(session.history_path());
}

mod live {
    //! Tests against the real API. These require DEEPSEEK_API_KEY to be
    //! set and skip themselves otherwise.

    use super::*;

    #[tokio::test]
    async fn test_simple_completion() {
        let api_key = std::env::var("DEEPSEEK_API_KEY").ok();
        if api_key.is_none() {
            eprintln!("Skipping test_simple_completion: DEEPSEEK_API_KEY not set");
            return;
        }

        let client = DeepSeek::new(api_key).expect("Failed to create client");
        let request = ChatRequest::new(
            "deepseek-chat",
            vec![Message::user("Say 'test passed'")],
            10,
            0.0,
            false,
        );

        let response = client.send(request).await;
        assert!(
            response.is_ok(),
            "Request should succeed with valid API key"
        );
    }

    #[tokio::test]
    async fn test_streaming_completion() {
        let api_key = std::env::var("DEEPSEEK_API_KEY").ok();
        if api_key.is_none() {
            eprintln!("Skipping test_streaming_completion: DEEPSEEK_API_KEY not set");
            return;
        }

        let client = DeepSeek::new(api_key).expect("Failed to create client");
        let request = ChatRequest::new(
            "deepseek-chat",
            vec![Message::user("Count to 3")],
            20,
            0.0,
            true,
        );

        let mut collected = String::new();
        let interrupted = AtomicBool::new(false);
        let reply = client
            .send_streaming(request, |fragment| collected.push_str(fragment), &interrupted)
            .await
            .expect("Stream request should succeed");
        assert_eq!(reply, collected);
    }
}
