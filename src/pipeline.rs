// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact submission pipeline.
//!
//! ```text
//! Idle -> Validating -> CheckingSpam -> Sanitizing -> RateLimitCheck -> Dispatching -> Idle
//!            |              |                              |                 |
//!            +--------------+------------------------------+-----------------+--> Idle + error
//! ```
//!
//! Every stage but dispatch is synchronous. A client has at most one
//! submission in flight; a second one is refused rather than queued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::config::{Config, FieldLimits};
use crate::dispatcher::{Delivery, EmailDispatcher, EmailTransport};
use crate::error::{ContactError, MSG_RECEIVED, MSG_SUCCESS};
use crate::fields::{ContactForm, ErrorMap, FormStatus};
use crate::limiter::{RateLimitResult, RateLimitStatus, RateLimiter};
use crate::metrics::ContactMetrics;
use crate::sanitizer::sanitize;
use crate::spam::SpamGuard;
use crate::store::{Clock, RateLimitStore, SystemClock};
use crate::validator::FieldValidator;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    Validating,
    CheckingSpam,
    Sanitizing,
    RateLimitCheck,
    Dispatching,
}

/// Outcome of one submit attempt.
#[derive(Debug, Clone)]
pub struct Submission {
    pub result: Result<Delivery, ContactError>,
    /// Last stage entered before returning to idle
    pub furthest: Stage,
}

impl Submission {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Marks a client as having a submission in flight until dropped.
struct InFlightGuard<'a> {
    slots: &'a Mutex<HashSet<String>>,
    client: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(slots: &'a Mutex<HashSet<String>>, client: &str) -> Option<Self> {
        let mut held = slots.lock().unwrap_or_else(PoisonError::into_inner);
        held.insert(client.to_string()).then(|| Self {
            slots,
            client: client.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.client);
    }
}

/// Validation, spam checks, sanitization, rate limiting and dispatch.
pub struct ContactPipeline {
    validator: FieldValidator,
    spam: SpamGuard,
    limits: FieldLimits,
    limiter: RateLimiter,
    dispatcher: EmailDispatcher,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<ContactMetrics>>,
    in_flight: Mutex<HashSet<String>>,
}

impl ContactPipeline {
    pub fn new(
        validator: FieldValidator,
        spam: SpamGuard,
        limits: FieldLimits,
        limiter: RateLimiter,
        dispatcher: EmailDispatcher,
    ) -> Self {
        Self {
            validator,
            spam,
            limits,
            limiter,
            dispatcher,
            clock: Arc::new(SystemClock),
            metrics: None,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Assemble a pipeline from configuration.
    ///
    /// `clock` drives both the rate limiter and the fill-time check.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn RateLimitStore>,
        transport: Arc<dyn EmailTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = RateLimiter::with_clock(config.rate_limit.clone(), store, clock.clone());
        Self::new(
            FieldValidator::new(&config.limits),
            SpamGuard::new(config.spam.clone()),
            config.limits,
            limiter,
            EmailDispatcher::new(config.email.clone(), transport),
        )
        .with_clock(clock)
    }

    /// Clock used for the fill-time check.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ContactMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn validator(&self) -> &FieldValidator {
        &self.validator
    }

    pub fn dispatcher(&self) -> &EmailDispatcher {
        &self.dispatcher
    }

    /// Whether `client` currently has a submission pending.
    pub fn is_in_flight(&self, client: Option<&str>) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(client.unwrap_or_default())
    }

    pub async fn rate_limit_status(&self, client: Option<&str>) -> RateLimitStatus {
        self.limiter.status(client).await
    }

    /// Forget recorded submissions for `client`.
    pub async fn clear_rate_limit(&self, client: Option<&str>) {
        self.limiter.clear(client).await
    }

    /// Delete submission logs whose records have all expired.
    pub async fn cleanup_rate_limits(&self) -> usize {
        self.limiter.cleanup().await
    }

    /// Run one submission of `form`.
    ///
    /// On success the form is reset and carries a success status. On any
    /// failure the fields are left as entered and the status carries the
    /// user-facing message.
    pub async fn submit(&self, form: &mut ContactForm) -> Submission {
        let client = form.client().map(str::to_string);
        let client = client.as_deref();

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, client.unwrap_or_default())
        else {
            debug!(client = ?client, "Submission refused, another is in flight");
            return self.finish(form, Stage::Idle, Err(ContactError::InFlight));
        };
        form.clear_status();

        debug!(client = ?client, stage = ?Stage::Validating, "Submission stage");
        let errors = self.validator.validate(&form.fields);
        if !errors.is_empty() {
            form.set_errors(errors.clone());
            return self.finish(form, Stage::Validating, Err(ContactError::Validation(errors)));
        }
        form.set_errors(ErrorMap::new());

        debug!(client = ?client, stage = ?Stage::CheckingSpam, "Submission stage");
        let now = self.clock.now_ms();
        if !self.spam.is_human(&form.fields, form.opened_at(), now) {
            return self.finish(form, Stage::CheckingSpam, Err(ContactError::SpamRejected));
        }

        debug!(client = ?client, stage = ?Stage::Sanitizing, "Submission stage");
        let clean = sanitize(&form.fields, &self.limits);

        debug!(client = ?client, stage = ?Stage::RateLimitCheck, "Submission stage");
        if let RateLimitResult::Limited { retry_after } = self.limiter.check(client).await {
            return self.finish(
                form,
                Stage::RateLimitCheck,
                Err(ContactError::RateLimited { retry_after }),
            );
        }

        debug!(client = ?client, stage = ?Stage::Dispatching, "Submission stage");
        let dispatched = {
            let _timer = self.metrics.as_ref().map(|m| m.dispatch_timer());
            self.dispatcher.dispatch(&clean).await
        };

        let result = match dispatched {
            Ok(delivery) => {
                self.limiter.record(client).await;
                form.reset();
                Ok(delivery)
            }
            Err(failure) => Err(ContactError::Transport(failure)),
        };
        self.finish(form, Stage::Dispatching, result)
    }

    fn finish(
        &self,
        form: &mut ContactForm,
        furthest: Stage,
        result: Result<Delivery, ContactError>,
    ) -> Submission {
        let outcome = match &result {
            Ok(Delivery::Sent) => {
                form.set_status(FormStatus::success(MSG_SUCCESS));
                info!(client = ?form.client(), "Contact message sent");
                "sent"
            }
            Ok(Delivery::Simulated) => {
                form.set_status(FormStatus::success(MSG_RECEIVED));
                info!(client = ?form.client(), "Contact message accepted in degraded mode");
                "simulated"
            }
            Err(error) => {
                form.set_status(FormStatus::error(error.user_message()));
                match error {
                    ContactError::Transport(_) => {
                        warn!(client = ?form.client(), error = %error, "Contact submission failed")
                    }
                    _ => info!(client = ?form.client(), error = %error, "Contact submission rejected"),
                }
                error.code()
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.observe(outcome);
        }

        Submission { result, furthest }
    }
}
