// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay
//!
//! Submission pipeline for a personal site's contact form:
//!
//! - Per-field validation (required, length, pattern, custom checks)
//! - Honeypot and fill-time bot detection, with an optional content filter
//! - Markup stripping and length capping
//! - Rolling-window rate limiting over a pluggable store (5 per 30 min)
//! - Dispatch through an email relay, with a simulated mode when the relay
//!   is not configured

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod pipeline;
pub mod sanitizer;
pub mod spam;
pub mod store;
pub mod validator;

pub use config::Config;
pub use dispatcher::{Delivery, EmailDispatcher, EmailJsTransport, EmailTransport, TransportFailure};
pub use error::ContactError;
pub use fields::{ContactForm, Field, FormFields, FormStatus};
pub use limiter::{RateLimitResult, RateLimiter};
pub use pipeline::{ContactPipeline, Stage, Submission};
pub use spam::{ContentFilter, SpamGuard};
pub use store::{FileStore, MemoryStore, RateLimitStore};
pub use validator::FieldValidator;
