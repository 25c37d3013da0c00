//! HttpTransport and full batches against a local mock HTTP server.

use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use tapa::loadtest::error::{RequestError, TransportError};
use tapa::loadtest::expectation::{BodyContains, HeaderPresent, StatusIs};
use tapa::loadtest::request::RequestTemplate;
use tapa::loadtest::session::Session;
use tapa::loadtest::transport::{HttpTransport, Transport};

fn transport() -> HttpTransport {
    HttpTransport::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn sends_method_headers_and_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/orders")
        .match_header("x-api-key", "secret")
        .match_body(r#"{"sku":"A-1"}"#)
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"order_id":7}"#)
        .create_async()
        .await;

    let request = RequestTemplate::new(
        Method::POST,
        format!("{}/orders", server.url()).parse().unwrap(),
    )
    .with_header("x-api-key", "secret")
    .unwrap()
    .with_body(r#"{"sku":"A-1"}"#);

    let response = transport().send(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.text(), r#"{"order_id":7}"#);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_a_response_not_a_transport_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/down")
        .with_status(503)
        .create_async()
        .await;

    let request = RequestTemplate::get(&format!("{}/down", server.url())).unwrap();
    let response = transport().send(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn batch_hits_the_server_once_per_job() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("x-service", "api")
        .with_body("status: ok")
        .expect(12)
        .create_async()
        .await;

    let template = RequestTemplate::get(&format!("{}/health", server.url())).unwrap();
    let report = Session::new(template, Arc::new(transport()))
        .with_users(3)
        .with_requests_per_user(4)
        .with_expectation(StatusIs::new(200))
        .with_expectation(BodyContains::new("ok"))
        .with_expectation(HeaderPresent::new("x-service").with_value("api"))
        .run()
        .await;

    assert_eq!(report.success_count(), 12);
    assert_eq!(report.error_count(), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn failing_expectation_is_recorded_per_response() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/health")
        .with_status(500)
        .expect(4)
        .create_async()
        .await;

    let template = RequestTemplate::get(&format!("{}/health", server.url())).unwrap();
    let report = Session::new(template, Arc::new(transport()))
        .with_users(2)
        .with_requests_per_user(2)
        .with_expectation(StatusIs::new(200))
        .run()
        .await;

    assert_eq!(report.error_count(), 4);
    assert!(report.errors().iter().all(RequestError::is_validation));
}

#[tokio::test]
async fn timeout_is_classified() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and never answer
    let _server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
    let request = RequestTemplate::get(&format!("http://{addr}/slow")).unwrap();
    let err = transport.send(request).await.unwrap_err();
    assert_eq!(err, TransportError::Timeout);
    assert_eq!(err.error_category(), "timeout");
}
