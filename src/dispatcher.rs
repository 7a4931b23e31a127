// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Email relay dispatch.
//!
//! The relay itself is an external service reached through
//! [`EmailTransport`]. The dispatcher fills the template parameters, runs
//! in degraded mode when credentials are missing, and maps transport
//! failures to user-facing categories.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::EmailConfig;
use crate::fields::FormFields;

/// Variables the relay's email template must recognise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateParams {
    pub to_name: String,
    pub from_name: String,
    pub from_email: String,
    pub subject: String,
    pub message: String,
    pub reply_to: String,
}

impl TemplateParams {
    /// Populate from sanitized fields; replies go to the sender.
    pub fn from_fields(fields: &FormFields, to_name: &str) -> Self {
        Self {
            to_name: to_name.to_string(),
            from_name: fields.name.clone(),
            from_email: fields.email.clone(),
            subject: fields.subject.clone(),
            message: fields.message.clone(),
            reply_to: fields.email.clone(),
        }
    }
}

/// Categorised transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    #[error("Relay rejected the request as malformed")]
    MalformedRequest,

    #[error("Relay rejected the credentials")]
    AuthFailure,

    #[error("Relay denied access")]
    AccessDenied,

    #[error("Relay server error (status {0})")]
    ServerError(u16),

    #[error("Network error reaching the relay")]
    Network,

    #[error("Unexpected relay response (status {0})")]
    Unexpected(u16),
}

impl TransportFailure {
    /// Categorise a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::MalformedRequest,
            401 => Self::AuthFailure,
            403 => Self::AccessDenied,
            500..=599 => Self::ServerError(status),
            other => Self::Unexpected(other),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MalformedRequest => {
                "There was a problem with your message. Please check it and try again."
            }
            Self::AuthFailure => {
                "The contact service is not set up correctly. Please try again later."
            }
            Self::AccessDenied => "The contact service refused the request. Please try again later.",
            Self::ServerError(_) => "Server error. Please try again later.",
            Self::Network => "Network error. Please check your connection and try again.",
            Self::Unexpected(_) => "Something went wrong sending your message. Please try again later.",
        }
    }
}

/// Outbound email relay.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        params: &TemplateParams,
        credential_key: &str,
    ) -> Result<(), TransportFailure>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a TemplateParams,
}

/// EmailJS REST transport.
#[derive(Debug, Clone)]
pub struct EmailJsTransport {
    endpoint: Url,
    client: reqwest::Client,
}

impl EmailJsTransport {
    pub fn new(endpoint: Url, client: reqwest::Client) -> Self {
        Self { endpoint, client }
    }

    /// Build a transport from configuration with its own HTTP client.
    pub fn from_config(config: &EmailConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;
        Ok(Self::new(endpoint, client))
    }
}

#[async_trait]
impl EmailTransport for EmailJsTransport {
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        params: &TemplateParams,
        credential_key: &str,
    ) -> Result<(), TransportFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&SendRequest {
                service_id,
                template_id,
                user_id: credential_key,
                template_params: params,
            })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, timeout = e.is_timeout(), "Email relay unreachable");
                TransportFailure::Network
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "Email relay accepted message");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(%status, body = %body, "Email relay rejected message");
        Err(TransportFailure::from_status(status.as_u16()))
    }
}

/// How a successful dispatch was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Handed to the relay
    Sent,
    /// Credentials unconfigured; accepted without transmitting
    Simulated,
}

/// Fills template parameters and sends through the transport.
pub struct EmailDispatcher {
    config: EmailConfig,
    transport: Arc<dyn EmailTransport>,
}

impl EmailDispatcher {
    pub fn new(config: EmailConfig, transport: Arc<dyn EmailTransport>) -> Self {
        if !config.is_configured() {
            warn!("Email relay credentials not configured; deliveries will be simulated");
        }
        Self { config, transport }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Send sanitized fields to the site owner.
    pub async fn dispatch(&self, fields: &FormFields) -> Result<Delivery, TransportFailure> {
        let params = TemplateParams::from_fields(fields, &self.config.recipient_name);
        self.send(&params).await
    }

    /// Send a fixed test message to verify credentials and connectivity.
    pub async fn probe(&self) -> Result<Delivery, TransportFailure> {
        let params = TemplateParams {
            to_name: "Test".to_string(),
            from_name: "Test User".to_string(),
            from_email: "test@example.com".to_string(),
            subject: "Test Subject".to_string(),
            message: "Test message".to_string(),
            reply_to: "test@example.com".to_string(),
        };
        let result = self.send(&params).await;
        match &result {
            Ok(delivery) => info!(?delivery, "Email relay probe succeeded"),
            Err(failure) => warn!(error = %failure, "Email relay probe failed"),
        }
        result
    }

    async fn send(&self, params: &TemplateParams) -> Result<Delivery, TransportFailure> {
        if !self.config.is_configured() {
            info!(from = %params.from_email, "Simulated delivery (relay unconfigured)");
            return Ok(Delivery::Simulated);
        }

        self.transport
            .send(
                &self.config.service_id,
                &self.config.template_id,
                params,
                &self.config.public_key,
            )
            .await?;
        Ok(Delivery::Sent)
    }
}
