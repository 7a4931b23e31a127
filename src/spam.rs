// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Bot detection for contact form submissions.
//!
//! Two checks decide whether a submission looks human:
//! - the hidden decoy field must be empty
//! - optionally, the time between opening and submitting the form must fall
//!   inside configured bounds
//!
//! A content heuristic can be plugged in on top. Callers only ever learn
//! that a submission was rejected, never which check tripped.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::SpamConfig;
use crate::fields::FormFields;

/// Pluggable content check applied after the honeypot and timing checks.
pub trait ContentFilter: Send + Sync {
    /// Returns `false` when the content looks like spam.
    fn looks_legitimate(&self, fields: &FormFields) -> bool;
}

static SPAM_PHRASES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(viagra|cialis|casino|lottery winner|congratulations.*winner)\b",
        r"(?i)\b(click here now|visit now urgent|act now limited)\b",
        r"\${4,}|!{5,}",
        r"(?i)\b(free money now|make money fast)\b|(?i)\bearn \$\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("spam phrase pattern is valid"))
    .collect()
});

static SUSPICIOUS_EMAILS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\d{8,}@", r"[a-z]{30,}@", r"\.(tk|ml|ga|cf)$"]
        .iter()
        .map(|p| Regex::new(p).expect("email heuristic pattern is valid"))
        .collect()
});

/// Phrase, repetition, link-count and sender-address heuristics.
#[derive(Debug, Clone)]
pub struct HeuristicContentFilter {
    max_links: usize,
}

impl HeuristicContentFilter {
    pub fn new(max_links: usize) -> Self {
        Self { max_links }
    }
}

impl Default for HeuristicContentFilter {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ContentFilter for HeuristicContentFilter {
    fn looks_legitimate(&self, fields: &FormFields) -> bool {
        let text = format!(
            "{} {} {} {}",
            fields.name, fields.email, fields.subject, fields.message
        )
        .to_lowercase();

        if SPAM_PHRASES.iter().any(|p| p.is_match(&text)) {
            debug!("Content filter: blacklisted phrase");
            return false;
        }

        let words: Vec<&str> = text
            .split_whitespace()
            .filter(|w| w.chars().count() > 2)
            .collect();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for word in &words {
            *counts.entry(word).or_insert(0) += 1;
        }
        if let Some(max) = counts.values().max() {
            if *max as f64 > words.len() as f64 * 0.5 {
                debug!(repeated = max, words = words.len(), "Content filter: repetition");
                return false;
            }
        }

        let links = text.matches("http://").count() + text.matches("https://").count();
        if links > self.max_links {
            debug!(links, max = self.max_links, "Content filter: too many links");
            return false;
        }

        let email = fields.email.to_lowercase();
        if SUSPICIOUS_EMAILS.iter().any(|p| p.is_match(&email)) {
            debug!("Content filter: suspicious sender address");
            return false;
        }

        true
    }
}

/// Honeypot and fill-time checks, plus an optional content filter.
pub struct SpamGuard {
    config: SpamConfig,
    filter: Option<Box<dyn ContentFilter>>,
}

impl SpamGuard {
    /// Guard configured from `config`; the heuristic content filter is
    /// installed only when `config.content_filter` is set.
    pub fn new(config: SpamConfig) -> Self {
        let filter: Option<Box<dyn ContentFilter>> = config
            .content_filter
            .then(|| Box::new(HeuristicContentFilter::new(config.max_links)) as Box<dyn ContentFilter>);
        Self { config, filter }
    }

    /// Replace the content filter.
    pub fn with_filter(mut self, filter: impl ContentFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Remove any content filter.
    pub fn without_filter(mut self) -> Self {
        self.filter = None;
        self
    }

    /// The decoy field must be left empty.
    pub fn check_honeypot(&self, value: &str) -> bool {
        value.is_empty()
    }

    /// Elapsed fill time must lie within `[min_fill_ms, max_fill_ms]`.
    pub fn check_fill_time(&self, opened_at: i64, now: i64) -> bool {
        let elapsed = now - opened_at;
        elapsed >= self.config.min_fill_ms && elapsed <= self.config.max_fill_ms
    }

    /// Whether a submission appears to come from a person.
    ///
    /// `opened_at` and `now` are milliseconds since the epoch. With
    /// `require_fill_time` set, a missing `opened_at` is a rejection.
    pub fn is_human(&self, fields: &FormFields, opened_at: Option<i64>, now: i64) -> bool {
        if !self.check_honeypot(&fields.honeypot) {
            debug!("Honeypot filled");
            return false;
        }

        if self.config.require_fill_time {
            match opened_at {
                Some(opened_at) if self.check_fill_time(opened_at, now) => {}
                _ => {
                    debug!(?opened_at, now, "Fill time outside bounds");
                    return false;
                }
            }
        }

        match &self.filter {
            Some(filter) => filter.looks_legitimate(fields),
            None => true,
        }
    }
}
