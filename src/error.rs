// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission failure taxonomy and the messages shown for each.

use std::time::Duration;
use thiserror::Error;

use crate::dispatcher::TransportFailure;
use crate::fields::ErrorMap;

pub const MSG_SUCCESS: &str = "Thank you! Your message has been sent successfully.";
pub const MSG_RECEIVED: &str = "Thank you! Your message has been received.";
pub const MSG_INVALID: &str = "Please correct the highlighted fields and try again.";
pub const MSG_SPAM: &str = "Submission blocked. Please try again.";
pub const MSG_RATE_LIMITED: &str = "Too many submissions. Please wait before sending another message.";
pub const MSG_IN_FLIGHT: &str = "Your message is already being sent. Please wait.";

/// Why a submission did not complete.
#[derive(Debug, Clone, Error)]
pub enum ContactError {
    #[error("{} field(s) failed validation", .0.len())]
    Validation(ErrorMap),

    /// Deliberately carries no detail about which check tripped.
    #[error("Submission rejected as spam")]
    SpamRejected,

    #[error("Rate limit exceeded, retry in {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Email transport failed: {0}")]
    Transport(#[from] TransportFailure),

    #[error("A submission is already in flight")]
    InFlight,
}

impl ContactError {
    /// Message for the form's status region. Never includes internals.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => MSG_INVALID,
            Self::SpamRejected => MSG_SPAM,
            Self::RateLimited { .. } => MSG_RATE_LIMITED,
            Self::Transport(failure) => failure.user_message(),
            Self::InFlight => MSG_IN_FLIGHT,
        }
    }

    /// Short machine-readable code, also used as the metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid",
            Self::SpamRejected => "spam",
            Self::RateLimited { .. } => "rate_limited",
            Self::Transport(_) => "transport_failure",
            Self::InFlight => "in_flight",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;

    #[test]
    fn test_messages_do_not_leak_detail() {
        let errors = ErrorMap::from([(Field::Email, "Please enter a valid email address".to_string())]);
        let cases = [
            ContactError::Validation(errors),
            ContactError::SpamRejected,
            ContactError::RateLimited {
                retry_after: Duration::from_secs(90),
            },
            ContactError::Transport(TransportFailure::AuthFailure),
            ContactError::InFlight,
        ];

        for error in &cases {
            let message = error.user_message();
            assert!(!message.is_empty());
            assert!(!message.contains("401"), "{message}");
        }
    }

    #[test]
    fn test_display() {
        let error = ContactError::RateLimited {
            retry_after: Duration::from_secs(90),
        };
        assert_eq!(error.to_string(), "Rate limit exceeded, retry in 90s");
        assert_eq!(error.code(), "rate_limited");
    }
}
