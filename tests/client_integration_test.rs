//! End-to-end tests for the generation client against a local HTTP
//! server, covering the composed pipeline: send → validate → retry.

use genpipe::client::{ClientConfig, GenerationClient};
use genpipe::error::Error;
use genpipe::pipeline::PipelineConfig;
use genpipe::retry_strategy::RetryConfig;
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Reads one HTTP/1.1 request (headers plus content-length body).
async fn read_http_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(header_end) = find_subslice(&buf, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = headers
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
}

/// Serves the given canned responses, one connection each, then exits.
async fn serve_responses(responses: Vec<(u16, String)>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_http_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
    });

    addr
}

fn test_client(addr: SocketAddr, retries: u32) -> GenerationClient {
    GenerationClient::new(ClientConfig {
        base_url: format!("http://{addr}"),
        timeout_ms: 5000,
        pipeline: PipelineConfig {
            min_request_interval_ms: 1,
            default_timeout_ms: 5000,
            retry: RetryConfig {
                retries,
                retry_delay_ms: 20,
                ..Default::default()
            },
        },
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn generate_content_returns_payload() {
    let addr = serve_responses(vec![(
        200,
        json!({ "text": "Launch week is here!" }).to_string(),
    )])
    .await;
    let client = test_client(addr, 0);

    let payload = client
        .generate_content(json!({ "brand": "acme", "topic": "launch" }))
        .await
        .unwrap();

    assert_eq!(payload["text"], "Launch week is here!");
}

#[tokio::test]
async fn transient_server_error_is_retried() {
    let addr = serve_responses(vec![
        (503, "unavailable".to_string()),
        (200, json!({ "url": "https://cdn.example.com/img.png" }).to_string()),
    ])
    .await;
    let client = test_client(addr, 3);

    let payload = client
        .generate_image(json!({ "prompt": "sunrise over the harbor" }))
        .await
        .unwrap();

    assert_eq!(payload["url"], "https://cdn.example.com/img.png");
}

#[tokio::test]
async fn client_error_fails_without_retry() {
    // A single canned response: a retry would hit a closed listener and
    // surface a network error instead of the HTTP error asserted below.
    let addr = serve_responses(vec![(404, "missing".to_string())]).await;
    let client = test_client(addr, 3);

    let err = client
        .update_post_status("p-42", json!({ "status": "published" }))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "HTTP 404: missing");
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn plain_text_body_is_preserved_in_error() {
    let addr = serve_responses(vec![(500, "boom".to_string())]).await;
    let client = test_client(addr, 0);

    let err = client.usage_stats().await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 500: boom");
}

#[tokio::test]
async fn cancel_generation_aborts_hanging_request() {
    // Server accepts the connection, reads the request and never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_http_request(&mut socket).await;
        sleep(Duration::from_secs(60)).await;
    });

    let client = std::sync::Arc::new(test_client(addr, 0));

    let client_clone = std::sync::Arc::clone(&client);
    let pending = tokio::spawn(async move {
        client_clone
            .generate_content(json!({ "brand": "acme" }))
            .await
    });

    // Let the request reach the wire.
    sleep(Duration::from_millis(100)).await;
    client.cancel_generation().await;

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled(_)), "got {err:?}");
    assert!(client.pipeline().registry().is_idle());
}
