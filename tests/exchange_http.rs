//! HTTP behavior of the prompt exchange against a mock endpoint.
//!
//! The client's contract is deliberately narrow: a parsed reply on success,
//! a canned substitute when the deadline passes, and `None` for everything
//! else. These tests pin each branch down, plus the exact request shape the
//! endpoint sees.

use capchat::exchange::{ChatClient, TIMEOUT_MESSAGE};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: mount a mock answering POST /chat with the given response.
async fn mock_chat(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

/// A priced reply comes back fully parsed.
#[tokio::test]
async fn priced_reply_is_parsed() {
    let server = MockServer::start().await;
    mock_chat(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "message": "Hi",
            "CAPS": 5,
            "totalCAPS": 9995
        })),
    )
    .await;

    let client = ChatClient::new(&server.uri());
    let reply = client.send_prompt("hello").await.expect("expected a reply");
    assert_eq!(reply.message, "Hi");
    assert_eq!(reply.caps, Some(5));
    assert_eq!(reply.total_caps, Some(9995));
}

/// The endpoint sees exactly one JSON field: the prompt text.
#[tokio::test]
async fn request_is_json_with_a_single_message_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"message": "What is Rust?"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "A language."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&server.uri());
    let reply = client
        .send_prompt("What is Rust?")
        .await
        .expect("expected a reply");
    assert_eq!(reply.message, "A language.");
    assert_eq!(reply.caps, None);
}

/// An unpriced reply parses with no caps attached.
#[tokio::test]
async fn unpriced_reply_has_no_caps() {
    let server = MockServer::start().await;
    mock_chat(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"message": "free advice"})),
    )
    .await;

    let client = ChatClient::new(&server.uri());
    let reply = client.send_prompt("hello").await.expect("expected a reply");
    assert_eq!(reply.message, "free advice");
    assert_eq!(reply.caps, None);
    assert_eq!(reply.total_caps, None);
}

/// A server error (500, no body) yields no reply at all.
#[tokio::test]
async fn server_error_yields_no_reply() {
    let server = MockServer::start().await;
    mock_chat(&server, ResponseTemplate::new(500)).await;

    let client = ChatClient::new(&server.uri());
    assert!(client.send_prompt("hello").await.is_none());
}

/// A success status with an empty body yields no reply.
#[tokio::test]
async fn empty_body_yields_no_reply() {
    let server = MockServer::start().await;
    mock_chat(&server, ResponseTemplate::new(200)).await;

    let client = ChatClient::new(&server.uri());
    assert!(client.send_prompt("hello").await.is_none());
}

/// A success status with a JSON `null` body yields no reply.
#[tokio::test]
async fn null_body_yields_no_reply() {
    let server = MockServer::start().await;
    mock_chat(&server, ResponseTemplate::new(200).set_body_json(json!(null))).await;

    let client = ChatClient::new(&server.uri());
    assert!(client.send_prompt("hello").await.is_none());
}

/// A body that is not JSON at all yields no reply.
#[tokio::test]
async fn garbage_body_yields_no_reply() {
    let server = MockServer::start().await;
    mock_chat(
        &server,
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;

    let client = ChatClient::new(&server.uri());
    assert!(client.send_prompt("hello").await.is_none());
}

/// Past the deadline the caller gets the canned timeout reply, unpriced.
#[tokio::test]
async fn deadline_substitutes_the_timeout_notice() {
    let server = MockServer::start().await;
    mock_chat(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"message": "too late", "CAPS": 5}))
            .set_delay(Duration::from_secs(2)),
    )
    .await;

    let client = ChatClient::with_timeout(&server.uri(), Duration::from_millis(200));
    let reply = client
        .send_prompt("hello")
        .await
        .expect("expected the synthetic timeout reply");
    assert_eq!(reply.message, TIMEOUT_MESSAGE);
    assert_eq!(reply.caps, None);
    assert_eq!(reply.total_caps, None);
}

/// A dead endpoint (connection refused) yields no reply, not a panic.
#[tokio::test]
async fn unreachable_endpoint_yields_no_reply() {
    // Grab a live port, then free it so connections get refused.
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = ChatClient::with_timeout(&uri, Duration::from_millis(500));
    assert!(client.send_prompt("hello").await.is_none());
}
