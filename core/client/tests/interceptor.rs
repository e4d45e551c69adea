mod common;

use reqwest::Method;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::*;
use filebox_client::{ClientConfig, Error, Filebox, MemorySession, Session, LOGIN_ROUTE};

#[tokio::test]
async fn test_attaches_raw_token_header() {
    let h = signed_in().await;

    Mock::given(method("GET"))
        .and(path("/files/"))
        .and(header("Authorization", "S1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![])))
        .expect(1)
        .mount(&h.server)
        .await;

    h.app.files.fetch_listing().await.unwrap();
}

#[tokio::test]
async fn test_no_header_without_session() {
    let h = signed_out().await;

    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&h.server)
        .await;

    assert_eq!(h.app.api.health().await.unwrap(), "OK");

    let requests = h.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_401_clears_session_and_redirects() {
    let h = signed_in().await;

    Mock::given(method("GET"))
        .and(path("/files/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&h.server)
        .await;

    let result = h.app.files.fetch_listing().await;

    assert!(matches!(result, Err(Error::Authentication(_))));
    assert!(!h.app.auth.is_authenticated().await);
    assert!(h.app.auth.user().await.is_none());
    assert_eq!(h.storage.snapshot(), Session::default());
    assert_eq!(h.navigator.routes(), vec![LOGIN_ROUTE.to_string()]);
}

#[tokio::test]
async fn test_401_from_any_operation_signs_out() {
    let h = signed_in().await;

    Mock::given(method("GET"))
        .and(path("/files/f1/preview"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    assert!(h.app.files.preview_url(&id("f1")).await.is_err());
    assert!(!h.app.auth.is_authenticated().await);
    assert_eq!(h.navigator.routes(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_401_response_still_returned() {
    let h = signed_in().await;

    Mock::given(method("GET"))
        .and(path("/files/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .expect(1)
        .mount(&h.server)
        .await;

    let request = h.app.api.request(Method::GET, "/files/").unwrap();
    let response = h.app.api.send(request).await.unwrap();

    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(response.text().await.unwrap(), "expired");
    assert!(!h.app.auth.is_authenticated().await);
}

#[tokio::test]
async fn test_other_errors_pass_through() {
    let h = signed_in().await;

    Mock::given(method("GET"))
        .and(path("/files/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&h.server)
        .await;

    match h.app.files.fetch_listing().await {
        Err(Error::Api { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(h.app.auth.is_authenticated().await);
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_network_failure_is_network_error() {
    // Nothing listens on port 1.
    let config = ClientConfig::default()
        .with_base_url("http://127.0.0.1:1")
        .with_timeout_secs(5);
    let navigator = Arc::new(RecordingNavigator::default());
    let app = Filebox::with_persistence(
        &config,
        Arc::new(MemorySession::with_session(signed_in_session())),
        navigator.clone(),
    )
    .await
    .unwrap();

    assert!(matches!(
        app.files.fetch_listing().await,
        Err(Error::Network(_))
    ));
    assert!(app.auth.is_authenticated().await);
    assert!(navigator.routes().is_empty());
}

#[tokio::test]
async fn test_truncated_error_body_is_network_error() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises 100 bytes of body, sends five, then hangs up.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let _ = socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\nshort")
            .await;
    });

    let config = ClientConfig::default()
        .with_base_url(format!("http://{}", addr))
        .with_timeout_secs(5);
    let app = Filebox::with_persistence(
        &config,
        Arc::new(MemorySession::with_session(signed_in_session())),
        Arc::new(RecordingNavigator::default()),
    )
    .await
    .unwrap();

    assert!(matches!(
        app.files.fetch_listing().await,
        Err(Error::Network(_))
    ));
}
