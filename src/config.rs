// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact relay.
//!
//! Every value has a default matching the behaviour of the public contact
//! form, so an empty environment yields a working service in degraded
//! (simulated delivery) mode.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the contact relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Spam protection configuration
    #[serde(default)]
    pub spam: SpamConfig,

    /// Field length caps used by validation and sanitization
    #[serde(default)]
    pub limits: FieldLimits,

    /// Email relay configuration
    #[serde(default)]
    pub email: EmailConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Rolling-window submission cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum accepted submissions per window (default: 5)
    #[serde(default = "default_max_submissions")]
    pub max_submissions: u32,

    /// Window length in seconds (default: 1800)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Name of the persisted slot holding the submission log
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Directory for the file-backed store; in-memory when unset
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    /// Seconds between sweeps removing expired slots (default: 300)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Bot detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamConfig {
    /// Reject submissions filled faster or slower than the bounds below
    #[serde(default)]
    pub require_fill_time: bool,

    /// Minimum fill time in milliseconds (default: 1000)
    #[serde(default = "default_min_fill_ms")]
    pub min_fill_ms: i64,

    /// Maximum fill time in milliseconds (default: one hour)
    #[serde(default = "default_max_fill_ms")]
    pub max_fill_ms: i64,

    /// Enable the phrase/repetition/link heuristics
    #[serde(default)]
    pub content_filter: bool,

    /// Links tolerated by the content filter (default: 5)
    #[serde(default = "default_max_links")]
    pub max_links: usize,
}

/// Maximum lengths, in characters, per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLimits {
    #[serde(default = "default_name_max")]
    pub name: usize,
    #[serde(default = "default_email_max")]
    pub email: usize,
    #[serde(default = "default_subject_max")]
    pub subject: usize,
    #[serde(default = "default_message_max")]
    pub message: usize,
    #[serde(default = "default_honeypot_max")]
    pub honeypot: usize,
}

/// Email relay credentials and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub public_key: String,

    #[serde(default)]
    pub service_id: String,

    #[serde(default)]
    pub template_id: String,

    /// Relay send endpoint
    #[serde(default = "default_email_endpoint")]
    pub endpoint: String,

    /// Display name of the site owner, sent as `to_name`
    #[serde(default = "default_recipient_name")]
    pub recipient_name: String,

    /// Transport timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_submissions() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    30 * 60
}

fn default_storage_key() -> String {
    "contact_form_submissions".to_string()
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_min_fill_ms() -> i64 {
    1_000
}

fn default_max_fill_ms() -> i64 {
    60 * 60 * 1_000
}

fn default_max_links() -> usize {
    5
}

fn default_name_max() -> usize {
    100
}

fn default_email_max() -> usize {
    254
}

fn default_subject_max() -> usize {
    200
}

fn default_message_max() -> usize {
    2000
}

fn default_honeypot_max() -> usize {
    256
}

fn default_email_endpoint() -> String {
    "https://api.emailjs.com/api/v1.0/email/send".to_string()
}

fn default_recipient_name() -> String {
    "Site Owner".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            spam: SpamConfig::default(),
            limits: FieldLimits::default(),
            email: EmailConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_submissions: default_max_submissions(),
            window_secs: default_window_secs(),
            storage_key: default_storage_key(),
            store_dir: None,
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            require_fill_time: false,
            min_fill_ms: default_min_fill_ms(),
            max_fill_ms: default_max_fill_ms(),
            content_filter: false,
            max_links: default_max_links(),
        }
    }
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            name: default_name_max(),
            email: default_email_max(),
            subject: default_subject_max(),
            message: default_message_max(),
            honeypot: default_honeypot_max(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            service_id: String::new(),
            template_id: String::new(),
            endpoint: default_email_endpoint(),
            recipient_name: default_recipient_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Interval between expired-slot sweeps, never shorter than a second.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl EmailConfig {
    /// Whether real credentials are present.
    ///
    /// Empty values and template placeholders (`your_public_key`,
    /// `YOUR_SERVICE_ID`, ...) count as unconfigured.
    pub fn is_configured(&self) -> bool {
        [&self.public_key, &self.service_id, &self.template_id]
            .iter()
            .all(|value| !is_placeholder(value))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    let lower = value.to_ascii_lowercase();
    value.is_empty() || lower.starts_with("your_") || lower.contains("placeholder")
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// - `BIND_ADDR`
    /// - `RATE_LIMIT_MAX_SUBMISSIONS`, `RATE_LIMIT_WINDOW_SECS`,
    ///   `RATE_LIMIT_STORAGE_KEY`, `RATE_LIMIT_STORE_DIR`,
    ///   `RATE_LIMIT_CLEANUP_SECS`
    /// - `SPAM_REQUIRE_FILL_TIME`, `SPAM_MIN_FILL_MS`, `SPAM_MAX_FILL_MS`,
    ///   `SPAM_CONTENT_FILTER`, `SPAM_MAX_LINKS`
    /// - `MESSAGE_MAX_LEN`
    /// - `EMAILJS_PUBLIC_KEY`, `EMAILJS_SERVICE_ID`, `EMAILJS_TEMPLATE_ID`,
    ///   `EMAILJS_ENDPOINT`, `CONTACT_RECIPIENT_NAME`, `EMAIL_TIMEOUT_SECS`
    /// - `METRICS_ENABLED`, `METRICS_PATH`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<Flag>().ok());
        let defaults = Config::default();

        Config {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            rate_limit: RateLimitConfig {
                max_submissions: parse_or(&lookup, "RATE_LIMIT_MAX_SUBMISSIONS", defaults.rate_limit.max_submissions),
                window_secs: parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", defaults.rate_limit.window_secs),
                storage_key: lookup("RATE_LIMIT_STORAGE_KEY").unwrap_or(defaults.rate_limit.storage_key),
                store_dir: lookup("RATE_LIMIT_STORE_DIR").map(PathBuf::from),
                cleanup_interval_secs: parse_or(
                    &lookup,
                    "RATE_LIMIT_CLEANUP_SECS",
                    defaults.rate_limit.cleanup_interval_secs,
                ),
            },
            spam: SpamConfig {
                require_fill_time: parsed("SPAM_REQUIRE_FILL_TIME")
                    .map(|f| f.0)
                    .unwrap_or(defaults.spam.require_fill_time),
                min_fill_ms: parse_or(&lookup, "SPAM_MIN_FILL_MS", defaults.spam.min_fill_ms),
                max_fill_ms: parse_or(&lookup, "SPAM_MAX_FILL_MS", defaults.spam.max_fill_ms),
                content_filter: parsed("SPAM_CONTENT_FILTER")
                    .map(|f| f.0)
                    .unwrap_or(defaults.spam.content_filter),
                max_links: parse_or(&lookup, "SPAM_MAX_LINKS", defaults.spam.max_links),
            },
            limits: FieldLimits {
                message: parse_or(&lookup, "MESSAGE_MAX_LEN", defaults.limits.message),
                ..defaults.limits
            },
            email: EmailConfig {
                public_key: lookup("EMAILJS_PUBLIC_KEY").unwrap_or_default(),
                service_id: lookup("EMAILJS_SERVICE_ID").unwrap_or_default(),
                template_id: lookup("EMAILJS_TEMPLATE_ID").unwrap_or_default(),
                endpoint: lookup("EMAILJS_ENDPOINT").unwrap_or(defaults.email.endpoint),
                recipient_name: lookup("CONTACT_RECIPIENT_NAME").unwrap_or(defaults.email.recipient_name),
                timeout_secs: parse_or(&lookup, "EMAIL_TIMEOUT_SECS", defaults.email.timeout_secs),
            },
            metrics: MetricsConfig {
                enabled: parsed("METRICS_ENABLED")
                    .map(|f| f.0)
                    .unwrap_or(defaults.metrics.enabled),
                path: lookup("METRICS_PATH").unwrap_or(defaults.metrics.path),
            },
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean that also accepts `1`/`0`, `yes`/`no` and `on`/`off`.
struct Flag(bool);

impl FromStr for Flag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Flag(true)),
            "0" | "false" | "no" | "off" => Ok(Flag(false)),
            _ => Err(()),
        }
    }
}
