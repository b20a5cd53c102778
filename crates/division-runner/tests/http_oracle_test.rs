//! HttpOracle against a throwaway local HTTP server.
//!
//! The server answers each connection with the next canned response and
//! records the raw requests it saw.

use std::sync::{Arc, Mutex};

use adjudication::{OracleErrorKind, OracleRequest, ReasoningOracle};
use division_runner::{EndpointConfig, HttpOracle, RetryPolicy};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Helper: serve `responses` in order, one per connection.
async fn serve(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            log.lock().unwrap().push(request);
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });

    (format!("http://{}/v1", addr), seen)
}

/// Helper: read headers plus a Content-Length body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Helper: a full HTTP/1.1 response.
fn http(status: &str, extra_headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
        status,
        body.len(),
        extra_headers,
        body
    )
}

fn completion(content: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff_ms: 1,
        backoff_multiplier: 2.0,
        max_backoff_ms: 10,
    }
}

fn oracle(base_url: String, api_key: Option<&str>, retry: RetryPolicy) -> HttpOracle {
    HttpOracle::new(
        EndpointConfig {
            base_url,
            api_key: api_key.map(str::to_string),
            model: "test-model".into(),
            ..Default::default()
        },
        retry,
    )
    .unwrap()
}

fn request() -> OracleRequest {
    OracleRequest {
        contract: "speech_score",
        prompt: "Score this speech".into(),
        schema: json!({ "type": "object" }),
        temperature: Some(0.3),
    }
}

// ── Success ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_structured_reply_is_returned() {
    let (url, seen) = serve(vec![http(
        "200 OK",
        "",
        &completion("```json\n{\"overall\": 7.5}\n```"),
    )])
    .await;

    let value = oracle(url, Some("sk-test"), fast_retry(0))
        .complete(&request())
        .await
        .unwrap();
    assert_eq!(value, json!({ "overall": 7.5 }));

    let raw = seen.lock().unwrap()[0].clone();
    assert!(raw.starts_with("POST /v1/chat/completions"));
    assert!(raw.to_lowercase().contains("authorization: bearer sk-test"));
    assert!(raw.contains("\"json_schema\""));
    assert!(raw.contains("\"test-model\""));
}

// ── Retry ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let (url, seen) = serve(vec![
        http("503 Service Unavailable", "", "{}"),
        http("429 Too Many Requests", "Retry-After: 0\r\n", "{}"),
        http("200 OK", "", &completion("{\"ok\": true}")),
    ])
    .await;

    let value = oracle(url, None, fast_retry(3))
        .complete(&request())
        .await
        .unwrap();
    assert_eq!(value, json!({ "ok": true }));
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_retries_exhausted_returns_last_error() {
    let (url, seen) = serve(vec![
        http("500 Internal Server Error", "", "{}"),
        http("502 Bad Gateway", "", "{}"),
    ])
    .await;

    let err = oracle(url, None, fast_retry(1))
        .complete(&request())
        .await
        .unwrap_err();
    assert_eq!(err.kind, OracleErrorKind::Transient);
    assert!(err.message.contains("502"));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_quota_exhaustion_is_not_retried() {
    let (url, seen) = serve(vec![http(
        "429 Too Many Requests",
        "",
        r#"{"error":{"code":"insufficient_quota","message":"You exceeded your quota"}}"#,
    )])
    .await;

    let err = oracle(url, None, fast_retry(5))
        .complete(&request())
        .await
        .unwrap_err();
    assert_eq!(err.kind, OracleErrorKind::QuotaExhausted);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_credentials_are_not_retried() {
    let (url, seen) = serve(vec![
        http("401 Unauthorized", "", r#"{"error":{"message":"invalid api key"}}"#),
        http("200 OK", "", &completion(r#"{"overall": 6.0}"#)),
    ])
    .await;

    let err = oracle(url, Some("wrong-key"), fast_retry(3))
        .complete(&request())
        .await
        .unwrap_err();
    assert_eq!(err.kind, OracleErrorKind::Unauthorized);
    assert!(!err.is_retriable());
    assert!(err.message.contains("401"));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = oracle(format!("http://{}/v1", addr), None, fast_retry(0))
        .complete(&request())
        .await
        .unwrap_err();
    assert_eq!(err.kind, OracleErrorKind::Unreachable);
}

// ── Models route ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_models() {
    let body = json!({ "data": [{ "id": "gpt-4o" }, { "id": "test-model" }] }).to_string();
    let (url, seen) = serve(vec![http("200 OK", "", &body)]).await;

    let models = oracle(url, None, fast_retry(0)).list_models().await.unwrap();
    assert_eq!(models, vec!["gpt-4o".to_string(), "test-model".to_string()]);
    assert!(seen.lock().unwrap()[0].starts_with("GET /v1/models"));
}
