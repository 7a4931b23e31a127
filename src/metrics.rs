// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the submission pipeline.

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramTimer, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Submission outcome counters and dispatch latency.
#[derive(Clone)]
pub struct ContactMetrics {
    registry: Registry,
    submissions: IntCounterVec,
    dispatch_seconds: Histogram,
}

impl ContactMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new("contact_submissions_total", "Contact form submissions by outcome"),
            &["outcome"],
        )?;
        let dispatch_seconds = Histogram::with_opts(
            HistogramOpts::new("contact_dispatch_seconds", "Email relay dispatch latency")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(dispatch_seconds.clone()))?;

        Ok(Self {
            registry,
            submissions,
            dispatch_seconds,
        })
    }

    /// Count one submission with the given outcome label.
    pub fn observe(&self, outcome: &str) {
        self.submissions.with_label_values(&[outcome]).inc();
    }

    /// Current count for an outcome label.
    pub fn count(&self, outcome: &str) -> u64 {
        self.submissions.with_label_values(&[outcome]).get()
    }

    /// Time a dispatch; the observation is recorded when the timer drops.
    pub fn dispatch_timer(&self) -> HistogramTimer {
        self.dispatch_seconds.start_timer()
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
