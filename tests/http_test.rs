// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP surface tests: the service router and the EmailJS transport.

mod harness;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, Request, StatusCode},
    routing::post,
    Json, Router,
};
use contact_relay::{
    config::{Config, EmailConfig, RateLimitConfig},
    dispatcher::{EmailJsTransport, EmailTransport, TemplateParams, TransportFailure},
    handlers::{router, AppState},
    metrics::ContactMetrics,
    pipeline::ContactPipeline,
    store::{ManualClock, MemoryStore},
};
use harness::RecordingTransport;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

const NOW: i64 = 1_700_000_000_000;

fn app_with(config: Config, transport: Arc<RecordingTransport>) -> Router {
    let metrics = Arc::new(ContactMetrics::new().unwrap());
    let pipeline = ContactPipeline::from_config(
        &config,
        Arc::new(MemoryStore::new()),
        transport,
        Arc::new(ManualClock::new(NOW)),
    )
    .with_metrics(metrics.clone());

    router(Arc::new(AppState {
        pipeline,
        metrics,
        config,
    }))
}

fn configured() -> Config {
    Config {
        email: EmailConfig {
            public_key: "pk_live".to_string(),
            service_id: "service_abc".to_string(),
            template_id: "template_xyz".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn contact_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn valid_body() -> Value {
    json!({
        "name": "Jo",
        "email": "jo@x.com",
        "subject": "Hi there",
        "message": "This is a test message.",
    })
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app_with(configured(), Arc::new(RecordingTransport::default()));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "contact-relay");
    assert_eq!(body["relay_configured"], true);
}

#[tokio::test]
async fn test_contact_success() {
    let transport = Arc::new(RecordingTransport::default());
    let app = app_with(configured(), transport.clone());

    let response = app.oneshot(contact_request(valid_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Thank you! Your message has been sent successfully.");
    assert!(body.get("errors").is_none());
    assert_eq!(transport.sent_count(), 1);
}

#[tokio::test]
async fn test_contact_unconfigured_relay() {
    let transport = Arc::new(RecordingTransport::default());
    let app = app_with(Config::default(), transport.clone());

    let response = app.oneshot(contact_request(valid_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["message"], "Thank you! Your message has been received.");
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn test_contact_validation_errors() {
    let app = app_with(configured(), Arc::new(RecordingTransport::default()));

    let response = app
        .oneshot(contact_request(json!({
            "name": "J",
            "email": "not-an-email",
            "subject": "Hi there",
            "message": "This is a test message.",
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errors"]["name"], "Name must be at least 2 characters");
    assert_eq!(body["errors"]["email"], "Please enter a valid email address");
    assert!(body["errors"].get("subject").is_none());
}

#[tokio::test]
async fn test_contact_honeypot() {
    let transport = Arc::new(RecordingTransport::default());
    let app = app_with(configured(), transport.clone());

    let mut payload = valid_body();
    payload["website"] = json!("spammer");
    let response = app.oneshot(contact_request(payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_json(response).await;
    assert_eq!(body["message"], "Submission blocked. Please try again.");
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn test_contact_rate_limited() {
    let config = Config {
        rate_limit: RateLimitConfig {
            max_submissions: 1,
            window_secs: 60,
            ..Default::default()
        },
        ..configured()
    };
    let app = app_with(config, Arc::new(RecordingTransport::default()));

    let first = app.clone().oneshot(contact_request(valid_body())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(contact_request(valid_body())).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.headers()[header::RETRY_AFTER], "60");

    let body = read_json(second).await;
    assert_eq!(body["retry_after_secs"], 60);
    assert_eq!(
        body["message"],
        "Too many submissions. Please wait before sending another message."
    );

    let status = app
        .oneshot(Request::get("/contact/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = read_json(status).await;
    assert_eq!(status["submissions"], 1);
    assert_eq!(status["max_submissions"], 1);
}

#[tokio::test]
async fn test_contact_transport_failure() {
    let app = app_with(
        configured(),
        Arc::new(RecordingTransport::failing(TransportFailure::ServerError(503))),
    );

    let response = app.oneshot(contact_request(valid_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = read_json(response).await;
    assert_eq!(body["message"], "Server error. Please try again later.");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = app_with(configured(), Arc::new(RecordingTransport::default()));

    app.clone().oneshot(contact_request(valid_body())).await.unwrap();
    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#"contact_submissions_total{outcome="sent"} 1"#));
}

#[tokio::test]
async fn test_metrics_disabled() {
    let mut config = configured();
    config.metrics.enabled = false;
    let app = app_with(config, Arc::new(RecordingTransport::default()));

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Local stand-in for the EmailJS API.
#[derive(Clone)]
struct RelayDouble {
    status: StatusCode,
    received: Arc<Mutex<Vec<Value>>>,
}

async fn relay_send(State(relay): State<RelayDouble>, Json(body): Json<Value>) -> StatusCode {
    relay.received.lock().unwrap().push(body);
    relay.status
}

async fn spawn_relay(status: StatusCode) -> (Url, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/v1.0/email/send", post(relay_send))
        .with_state(RelayDouble {
            status,
            received: received.clone(),
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = Url::parse(&format!("http://{addr}/api/v1.0/email/send")).unwrap();
    (url, received)
}

fn params() -> TemplateParams {
    TemplateParams {
        to_name: "Site Owner".to_string(),
        from_name: "Jo".to_string(),
        from_email: "jo@x.com".to_string(),
        subject: "Hi there".to_string(),
        message: "This is a test message.".to_string(),
        reply_to: "jo@x.com".to_string(),
    }
}

#[tokio::test]
async fn test_emailjs_transport_posts_payload() {
    let (url, received) = spawn_relay(StatusCode::OK).await;
    let transport = EmailJsTransport::new(url, reqwest::Client::new());

    transport
        .send("service_abc", "template_xyz", &params(), "pk_live")
        .await
        .unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["service_id"], "service_abc");
    assert_eq!(received[0]["template_id"], "template_xyz");
    assert_eq!(received[0]["user_id"], "pk_live");
    assert_eq!(received[0]["template_params"]["from_name"], "Jo");
    assert_eq!(received[0]["template_params"]["reply_to"], "jo@x.com");
    assert_eq!(received[0]["template_params"]["to_name"], "Site Owner");
}

#[tokio::test]
async fn test_emailjs_transport_status_mapping() {
    let cases = [
        (StatusCode::BAD_REQUEST, TransportFailure::MalformedRequest),
        (StatusCode::UNAUTHORIZED, TransportFailure::AuthFailure),
        (StatusCode::FORBIDDEN, TransportFailure::AccessDenied),
        (StatusCode::INTERNAL_SERVER_ERROR, TransportFailure::ServerError(500)),
        (StatusCode::SERVICE_UNAVAILABLE, TransportFailure::ServerError(503)),
        (StatusCode::IM_A_TEAPOT, TransportFailure::Unexpected(418)),
    ];

    for (status, expected) in cases {
        let (url, _) = spawn_relay(status).await;
        let transport = EmailJsTransport::new(url, reqwest::Client::new());
        let result = transport
            .send("service_abc", "template_xyz", &params(), "pk_live")
            .await;
        assert_eq!(result, Err(expected), "status {status}");
    }
}

#[tokio::test]
async fn test_emailjs_transport_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{addr}/api/v1.0/email/send")).unwrap();
    let transport = EmailJsTransport::new(url, reqwest::Client::new());
    let result = transport
        .send("service_abc", "template_xyz", &params(), "pk_live")
        .await;
    assert_eq!(result, Err(TransportFailure::Network));
}
