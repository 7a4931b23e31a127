// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Rolling-window submission limiter.
//!
//! The submission log is a JSON array of `{timestamp, count}` records kept
//! in a [`RateLimitStore`] slot. Every read discards records older than the
//! window; a submission is allowed while the remaining counts sum to less
//! than the cap.
//!
//! `check` and `record` are separate read-modify-write steps with no
//! transaction between them. Within one process the pipeline's in-flight
//! guard serialises them per client; stores shared by several processes
//! give no such guarantee. The limit is advisory, not a security boundary.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::store::{Clock, RateLimitStore, SystemClock};

/// One accepted submission in the persisted log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Milliseconds since the epoch
    pub timestamp: i64,
    pub count: u32,
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Submission is allowed
    Allowed {
        /// Submissions left in the current window, this one included
        remaining: u32,
    },
    /// Submission is rate limited
    Limited {
        /// Time until the oldest counted record leaves the window
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Snapshot of a client's submission log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// Submissions counted in the current window
    pub submissions: u32,
    pub max_submissions: u32,
    pub window_secs: u64,
}

/// Rolling-window limiter backed by an injected store.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter using the wall clock.
    pub fn new(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: RateLimitConfig,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check whether `client` may submit now.
    pub async fn check(&self, client: Option<&str>) -> RateLimitResult {
        let now = self.clock.now_ms();
        let mut records = self.load_recent(client, now).await;
        let max = u64::from(self.config.max_submissions);
        let mut used = total(&records);

        if used < max {
            // used < max <= u32::MAX
            let remaining = (max - used) as u32;
            debug!(client = ?client, used, remaining, "Submission allowed");
            return RateLimitResult::Allowed { remaining };
        }

        // The limit lifts once enough of the oldest records have expired
        // for the rest to sum below the cap.
        let window_ms = self.window_ms();
        records.sort_by_key(|r| r.timestamp);
        let mut lifts_at = None;
        for record in &records {
            used = used.saturating_sub(u64::from(record.count));
            if used < max {
                lifts_at = Some(record.timestamp.saturating_add(window_ms));
                break;
            }
        }

        let retry_after_ms = lifts_at
            .map(|at| at.saturating_sub(now).max(0))
            .unwrap_or(window_ms);
        debug!(client = ?client, used = total(&records), retry_after_ms, "Submission rate limited");
        RateLimitResult::Limited {
            retry_after: Duration::from_millis(retry_after_ms as u64),
        }
    }

    /// Append one record for an accepted submission.
    ///
    /// Persistence failures are logged and swallowed; the submission has
    /// already been delivered by the time this is called.
    pub async fn record(&self, client: Option<&str>) {
        let now = self.clock.now_ms();
        let key = self.slot(client);
        let mut records = self.load_recent(client, now).await;
        records.push(SubmissionRecord {
            timestamp: now,
            count: 1,
        });

        let encoded = match serde_json::to_string(&records) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(slot = %key, error = %e, "Failed to encode submission log");
                return;
            }
        };
        if let Err(e) = self.store.save(&key, encoded).await {
            warn!(slot = %key, error = %e, "Failed to persist submission log");
        }
    }

    /// Count of submissions in the current window.
    pub async fn status(&self, client: Option<&str>) -> RateLimitStatus {
        let records = self.load_recent(client, self.clock.now_ms()).await;
        RateLimitStatus {
            submissions: u32::try_from(total(&records)).unwrap_or(u32::MAX),
            max_submissions: self.config.max_submissions,
            window_secs: self.config.window_secs,
        }
    }

    /// Forget every recorded submission for `client`.
    pub async fn clear(&self, client: Option<&str>) {
        let key = self.slot(client);
        match self.store.remove(&key).await {
            Ok(()) => debug!(slot = %key, "Submission log cleared"),
            Err(e) => warn!(slot = %key, error = %e, "Failed to clear submission log"),
        }
    }

    /// Sweep every slot under the storage key, dropping expired records
    /// and deleting slots left empty. Returns the number of slots deleted.
    ///
    /// Slots are otherwise only pruned when their own client returns, so
    /// this should run periodically.
    pub async fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let window_ms = self.window_ms();
        let keys = match self.store.keys(&self.config.storage_key).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to list submission logs");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys {
            let raw = match self.store.load(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(slot = %key, error = %e, "Failed to read submission log during cleanup");
                    continue;
                }
            };

            // Malformed logs already count as empty.
            let records: Vec<SubmissionRecord> = serde_json::from_str(&raw).unwrap_or_default();
            let before = records.len();
            let recent: Vec<SubmissionRecord> = records
                .into_iter()
                .filter(|r| now.saturating_sub(r.timestamp) < window_ms)
                .collect();

            let outcome = if recent.is_empty() {
                self.store.remove(&key).await.map(|()| removed += 1)
            } else if recent.len() < before {
                match serde_json::to_string(&recent) {
                    Ok(encoded) => self.store.save(&key, encoded).await,
                    Err(e) => {
                        warn!(slot = %key, error = %e, "Failed to encode submission log");
                        Ok(())
                    }
                }
            } else {
                Ok(())
            };
            if let Err(e) = outcome {
                warn!(slot = %key, error = %e, "Failed to clean submission log");
            }
        }

        debug!(removed, "Submission log cleanup complete");
        removed
    }

    fn slot(&self, client: Option<&str>) -> String {
        match client {
            Some(client) => format!("{}:{}", self.config.storage_key, client),
            None => self.config.storage_key.clone(),
        }
    }

    fn window_ms(&self) -> i64 {
        i64::try_from(self.config.window_duration().as_millis()).unwrap_or(i64::MAX)
    }

    /// Load the log and drop records outside the window. Missing, unreadable
    /// or malformed state counts as an empty log.
    async fn load_recent(&self, client: Option<&str>, now: i64) -> Vec<SubmissionRecord> {
        let key = self.slot(client);
        let raw = match self.store.load(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(slot = %key, error = %e, "Failed to read submission log, allowing");
                return Vec::new();
            }
        };

        let records: Vec<SubmissionRecord> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(slot = %key, error = %e, "Malformed submission log, ignoring");
                return Vec::new();
            }
        };

        let window_ms = self.window_ms();
        records
            .into_iter()
            .filter(|r| now.saturating_sub(r.timestamp) < window_ms)
            .collect()
    }
}

/// Sum of record counts. Widened so a tampered log cannot overflow.
fn total(records: &[SubmissionRecord]) -> u64 {
    records.iter().map(|r| u64::from(r.count)).sum()
}
