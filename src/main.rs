// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay Service
//!
//! Accepts contact form submissions as JSON on `POST /contact`, runs them
//! through validation, spam checks, sanitization and rate limiting, and
//! forwards accepted messages to the configured email relay.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and a `.env` file
//! when present); see [`Config::from_env`] for the full list. The most
//! common ones:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `EMAILJS_PUBLIC_KEY`, `EMAILJS_SERVICE_ID`, `EMAILJS_TEMPLATE_ID`:
//!   relay credentials; without them deliveries are simulated
//! - `RATE_LIMIT_MAX_SUBMISSIONS`: submissions per window (default: 5)
//! - `RATE_LIMIT_STORE_DIR`: persist the submission log on disk
//! - `RATE_LIMIT_CLEANUP_SECS`: interval between expired-log sweeps (default: 300)
//! - `CONTACT_PROBE_ON_START`: send a test message at startup

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_relay::{
    config::Config,
    dispatcher::EmailJsTransport,
    handlers::{router, AppState},
    metrics::ContactMetrics,
    pipeline::ContactPipeline,
    store::{FileStore, MemoryStore, RateLimitStore, SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        max_submissions = config.rate_limit.max_submissions,
        window_secs = config.rate_limit.window_secs,
        relay_configured = config.email.is_configured(),
        content_filter = config.spam.content_filter,
        "Starting contact relay"
    );

    let store: Arc<dyn RateLimitStore> = match &config.rate_limit.store_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Persisting submission log to disk");
            Arc::new(FileStore::new(dir.clone()))
        }
        None => Arc::new(MemoryStore::new()),
    };
    let transport = Arc::new(EmailJsTransport::from_config(&config.email)?);
    let metrics = Arc::new(ContactMetrics::new()?);

    let pipeline = ContactPipeline::from_config(&config, store, transport, Arc::new(SystemClock))
        .with_metrics(metrics.clone());

    if probe_on_start() {
        if let Err(failure) = pipeline.dispatcher().probe().await {
            warn!(error = %failure, "Email relay probe failed; continuing");
        }
    }

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState {
        pipeline,
        metrics,
        config,
    });

    // Spawn cleanup task
    let cleanup_state = state.clone();
    let cleanup_interval = cleanup_state.config.rate_limit.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            let removed = cleanup_state.pipeline.cleanup_rate_limits().await;
            if removed > 0 {
                info!(removed, "Removed expired submission logs");
            }
        }
    });

    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn probe_on_start() -> bool {
    std::env::var("CONTACT_PROBE_ON_START")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
