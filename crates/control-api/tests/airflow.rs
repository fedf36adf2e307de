use std::sync::Arc;
use std::time::Duration;

use control_api::{AirflowClient, AirflowConfig};
use pipeline::{
    AccessToken, ControlApiError, Credentials, RunConf, RunId, RunSubmission, WorkflowControl,
    WorkflowId,
};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct RecordedRequest {
    request_line: String,
    authorization: Option<String>,
    body: Value,
}

/// Serves one canned `(status, body)` per accepted connection, in order.
async fn canned_server(
    responses: Vec<(u16, &'static str)>,
) -> (String, Arc<Mutex<Vec<RecordedRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = recorded.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            reader
                .read_line(&mut request_line)
                .await
                .expect("request line");
            let mut content_length = 0usize;
            let mut authorization = None;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).await.expect("header line");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    match name.trim().to_ascii_lowercase().as_str() {
                        "content-length" => content_length = value.trim().parse().unwrap_or(0),
                        "authorization" => authorization = Some(value.trim().to_string()),
                        _ => {}
                    }
                }
            }
            let mut raw_body = vec![0u8; content_length];
            reader.read_exact(&mut raw_body).await.expect("body");

            sink.lock().await.push(RecordedRequest {
                request_line: request_line.trim_end().to_string(),
                authorization,
                body: serde_json::from_slice(&raw_body).unwrap_or(Value::Null),
            });

            let reply = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let mut stream = reader.into_inner();
            stream.write_all(reply.as_bytes()).await.expect("reply");
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{addr}"), recorded)
}

fn client(base_url: String) -> AirflowClient {
    AirflowClient::new(AirflowConfig {
        base_url,
        timeout: Duration::from_secs(5),
    })
    .expect("client builds")
}

fn credentials() -> Credentials {
    Credentials {
        username: "airflow".to_string(),
        password: "airflow".to_string(),
    }
}

#[tokio::test]
async fn given_created_status_when_token_requested_then_token_is_returned() {
    let (base_url, recorded) = canned_server(vec![(201, r#"{"access_token":"tok-1"}"#)]).await;

    let token = client(base_url).issue_token(&credentials()).await.unwrap();

    assert_eq!(token.expose(), "tok-1");
    let requests = recorded.lock().await;
    assert_eq!(requests[0].request_line, "POST /auth/token HTTP/1.1");
    assert_eq!(
        requests[0].body,
        json!({"username": "airflow", "password": "airflow"})
    );
}

#[tokio::test]
async fn given_forbidden_status_when_token_requested_then_status_and_body_are_reported() {
    let (base_url, _) = canned_server(vec![(403, r#"{"detail":"bad credentials"}"#)]).await;

    let err = client(base_url)
        .issue_token(&credentials())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("bad credentials"), "{err}");
}

#[tokio::test]
async fn given_token_when_run_submitted_then_bearer_header_and_body_are_sent() {
    let (base_url, recorded) =
        canned_server(vec![(200, r#"{"dag_run_id":"run_0123abcd","state":"queued"}"#)]).await;
    let submission = RunSubmission {
        dag_run_id: RunId::parse("run_0123abcd").unwrap(),
        logical_date: "2026-10-19T10:16:00.000000Z".to_string(),
        conf: RunConf::default(),
    };

    let metadata = client(base_url)
        .submit_run(
            &AccessToken::new("tok-1"),
            &WorkflowId::new("council_review_workflow").unwrap(),
            &submission,
        )
        .await
        .unwrap();

    assert_eq!(metadata["state"], "queued");
    let requests = recorded.lock().await;
    assert_eq!(
        requests[0].request_line,
        "POST /api/v2/dags/council_review_workflow/dagRuns HTTP/1.1"
    );
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer tok-1"));
    assert_eq!(requests[0].body["dag_run_id"], "run_0123abcd");
    assert_eq!(
        requests[0].body["logical_date"],
        "2026-10-19T10:16:00.000000Z"
    );
}

#[tokio::test]
async fn given_conflict_when_run_submitted_then_rejection_is_not_retryable() {
    use pipeline::RetryAware;

    let (base_url, _) = canned_server(vec![(409, r#"{"detail":"run exists"}"#)]).await;
    let submission = RunSubmission {
        dag_run_id: RunId::generate(),
        logical_date: "2026-10-19T10:16:00.000000Z".to_string(),
        conf: RunConf::default(),
    };

    let err = client(base_url)
        .submit_run(
            &AccessToken::new("tok-1"),
            &WorkflowId::new("council_review_workflow").unwrap(),
            &submission,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ControlApiError::Rejected { status: 409, .. }));
    assert!(!err.retry_policy().is_retryable());
}

#[tokio::test]
async fn given_unreachable_scheduler_when_token_requested_then_transport_error_is_returned() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{addr}"))
        .issue_token(&credentials())
        .await
        .unwrap_err();

    assert!(matches!(err, ControlApiError::Transport(_)), "{err:?}");
}
