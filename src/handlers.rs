// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact relay service.
//!
//! The browser form posts its fields as JSON and renders the returned
//! status message in its live region.

use axum::{
    extract::{ConnectInfo, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::ContactError;
use crate::fields::{ContactForm, ErrorMap, FormFields};
use crate::limiter::RateLimitStatus;
use crate::metrics::ContactMetrics;
use crate::pipeline::ContactPipeline;

/// Shared application state.
pub struct AppState {
    pub pipeline: ContactPipeline,
    pub metrics: Arc<ContactMetrics>,
    pub config: Config,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Whether relay credentials are configured
    pub relay_configured: bool,
}

/// Contact form submission.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(flatten)]
    pub fields: FormFields,
    /// When the form was opened, in milliseconds since the epoch
    #[serde(default)]
    pub opened_at: Option<i64>,
}

/// Result of a submission, shaped for the form's status region.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    /// `success` or `error`
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/contact", post(submit))
        .route("/contact/status", get(rate_limit_status));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-relay",
        version: env!("CARGO_PKG_VERSION"),
        relay_configured: state.pipeline.dispatcher().is_configured(),
    })
}

/// Run a contact form submission through the pipeline.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<ContactRequest>,
) -> Response {
    let mut form = ContactForm::with_fields(req.fields, req.opened_at);
    if let Some(ConnectInfo(addr)) = peer {
        form = form.with_client(addr.ip().to_string());
    }
    debug!(client = ?form.client(), "Processing contact submission");

    let submission = state.pipeline.submit(&mut form).await;
    let message = form
        .status()
        .map(|s| s.message.clone())
        .unwrap_or_default();

    match submission.result {
        Ok(_) => (
            StatusCode::OK,
            Json(ContactResponse {
                success: true,
                status: "success",
                message,
                errors: None,
                retry_after_secs: None,
            }),
        )
            .into_response(),
        Err(err) => {
            let (code, errors, retry_after_secs) = match &err {
                ContactError::Validation(errors) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, Some(errors.clone()), None)
                }
                ContactError::SpamRejected => (StatusCode::BAD_REQUEST, None, None),
                ContactError::RateLimited { retry_after } => {
                    // Round up so clients never retry early.
                    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                    (StatusCode::TOO_MANY_REQUESTS, None, Some(secs))
                }
                ContactError::InFlight => (StatusCode::CONFLICT, None, None),
                ContactError::Transport(_) => (StatusCode::BAD_GATEWAY, None, None),
            };

            let body = Json(ContactResponse {
                success: false,
                status: "error",
                message,
                errors,
                retry_after_secs,
            });
            match retry_after_secs {
                Some(secs) => {
                    (code, [(header::RETRY_AFTER, secs.to_string())], body).into_response()
                }
                None => (code, body).into_response(),
            }
        }
    }
}

/// Submissions counted against the caller in the current window.
pub async fn rate_limit_status(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Json<RateLimitStatus> {
    let client = peer.map(|ConnectInfo(addr)| addr.ip().to_string());
    Json(state.pipeline.rate_limit_status(client.as_deref()).await)
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
