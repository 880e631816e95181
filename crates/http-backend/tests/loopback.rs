//! Runs the HTTP backend against a one-shot server on the loopback
//! interface.

use elevatr_api::{BackendError, ChatBackend, ChatRequest, ErrorKind, Role};
use elevatr_http_backend::{HttpBackend, HttpBackendConfigBuilder};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct CapturedRequest {
    request_line: String,
    body: String,
}

/// Serves exactly one request with the given status and JSON body, and
/// reports what it received.
async fn serve_once(
    status: &'static str,
    body: Value,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
        }

        let payload = body.to_string();
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
             content-length: {}\r\nconnection: close\r\n\r\n{payload}",
            payload.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();

        tx.send(CapturedRequest {
            request_line: head.lines().next().unwrap_or("").to_owned(),
            body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
        })
        .ok();
    });

    (format!("http://{addr}/api"), rx)
}

fn backend(base_url: &str) -> HttpBackend {
    HttpBackend::new(
        HttpBackendConfigBuilder::new()
            .with_base_url(base_url)
            .build(),
    )
}

#[tokio::test]
async fn test_send_new_conversation() {
    let (base_url, captured) = serve_once(
        "200 OK",
        json!({
            "success": true,
            "data": {
                "message": "Hi!",
                "messageId": "m1",
                "conversationId": "c1",
                "isNewConversation": true
            },
            "usage": { "totalTokens": 7 }
        }),
    )
    .await;

    let resp = backend(&base_url)
        .send_chat(&ChatRequest::new("Hello", 0.7, 1000))
        .await
        .unwrap();
    assert_eq!(resp.reply.message, "Hi!");
    assert_eq!(resp.reply.conversation_id.as_deref(), Some("c1"));
    assert_eq!(resp.usage.unwrap()["totalTokens"], 7);

    let captured = captured.await.unwrap();
    assert_eq!(captured.request_line, "POST /api/chat HTTP/1.1");
    let body: Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(body["message"], "Hello");
    assert_eq!(body["maxTokens"], 1000);
    assert!(body.get("conversationId").is_none());
}

#[tokio::test]
async fn test_send_rate_limited() {
    let (base_url, _captured) = serve_once(
        "429 Too Many Requests",
        json!({ "success": false, "error": "Slow down" }),
    )
    .await;

    let err = backend(&base_url)
        .send_chat(
            &ChatRequest::new("Hello", 0.7, 1000).in_conversation(Some("c1")),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Status(429));
    assert_eq!(err.server_message(), Some("Slow down"));
}

#[tokio::test]
async fn test_fetch_conversation() {
    let (base_url, captured) = serve_once(
        "200 OK",
        json!({
            "success": true,
            "data": {
                "messages": [
                    {
                        "id": "u1",
                        "role": "user",
                        "content": "Hello",
                        "timestamp": "2025-03-01T10:00:00Z"
                    },
                    {
                        "id": "m1",
                        "role": "assistant",
                        "content": "Hi!",
                        "timestamp": "2025-03-01T10:00:02Z"
                    }
                ]
            }
        }),
    )
    .await;

    let history = backend(&base_url).fetch_conversation("c1").await.unwrap();
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[1].role, Role::Assistant);

    let captured = captured.await.unwrap();
    assert_eq!(captured.request_line, "GET /api/chat/c1 HTTP/1.1");
}

#[tokio::test]
async fn test_delete_rejected() {
    let (base_url, captured) =
        serve_once("200 OK", json!({ "success": false })).await;

    let err = backend(&base_url)
        .delete_conversation("c1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(err.to_string(), "Failed to delete conversation");

    let captured = captured.await.unwrap();
    assert_eq!(captured.request_line, "DELETE /api/chat/c1 HTTP/1.1");
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = backend(&format!("http://{addr}/api"))
        .delete_conversation("c1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}
