use std::time::Duration;

use llm::{GeminiConfig, GeminiProvider};
use pipeline::{LlmError, ReflectionModel, RetryAware, RetryPolicy};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Answers one request with a canned reply and hands back the request head.
async fn canned_server(reply: String) -> (String, oneshot::Receiver<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let mut reader = BufReader::new(stream);
        let mut head = Vec::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await.expect("header line");
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap_or(0);
            }
            head.push(line);
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).await.expect("body");
        let _ = tx.send(head);

        let mut stream = reader.into_inner();
        stream.write_all(reply.as_bytes()).await.expect("reply");
        let _ = stream.shutdown().await;
    });

    (format!("http://{addr}"), rx)
}

fn reply(status: &str, extra_headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn provider(base_url: String) -> GeminiProvider {
    GeminiProvider::new(GeminiConfig {
        api_key: "test-key".to_string(),
        model: "gemini-2.0-flash".to_string(),
        base_url,
        timeout: Duration::from_secs(5),
    })
    .expect("provider builds")
}

#[tokio::test]
async fn given_candidate_text_when_completing_then_text_is_returned_and_key_is_sent() {
    let body = r#"{"candidates":[{"content":{"parts":[{"text":"The review "},{"text":"ignores leverage."}]},"finishReason":"STOP"}]}"#;
    let (base_url, head) = canned_server(reply("200 OK", "", body)).await;

    let text = provider(base_url).complete("prompt").await.unwrap();

    assert_eq!(text, "The review ignores leverage.");
    let head = head.await.unwrap();
    assert_eq!(
        head[0],
        "POST /v1beta/models/gemini-2.0-flash:generateContent HTTP/1.1"
    );
    assert!(head
        .iter()
        .any(|line| line.to_ascii_lowercase() == "x-goog-api-key: test-key"));
}

#[tokio::test]
async fn given_throttled_response_when_completing_then_retry_after_is_honoured() {
    let (base_url, _) = canned_server(reply(
        "429 Too Many Requests",
        "Retry-After: 3\r\n",
        r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#,
    ))
    .await;

    let err = provider(base_url).complete("prompt").await.unwrap_err();

    assert!(
        matches!(err, LlmError::RateLimited { status: 429, .. }),
        "{err:?}"
    );
    assert_eq!(
        err.retry_policy(),
        RetryPolicy::Retryable {
            after: Some(Duration::from_secs(3))
        }
    );
}

#[tokio::test]
async fn given_bad_request_when_completing_then_error_is_not_retryable() {
    let (base_url, _) = canned_server(reply(
        "400 Bad Request",
        "",
        r#"{"error":{"message":"API key not valid"}}"#,
    ))
    .await;

    let err = provider(base_url).complete("prompt").await.unwrap_err();

    assert!(matches!(err, LlmError::Upstream { status: 400, .. }));
    assert!(err.to_string().contains("API key not valid"));
    assert!(!err.retry_policy().is_retryable());
}

#[tokio::test]
async fn given_blocked_prompt_when_completing_then_protocol_error_names_reason() {
    let (base_url, _) = canned_server(reply(
        "200 OK",
        "",
        r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#,
    ))
    .await;

    let err = provider(base_url).complete("prompt").await.unwrap_err();

    assert!(
        matches!(err, LlmError::Protocol(ref reason) if reason == "SAFETY"),
        "{err:?}"
    );
}
