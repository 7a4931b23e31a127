// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact form field validator.
//!
//! Each field is checked against a rule, in order:
//! - required and blank
//! - blank and optional (passes, nothing else is checked)
//! - minimum / maximum length in characters
//! - pattern
//! - custom predicate
//!
//! Only the first failing check is reported per field.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::FieldLimits;
use crate::fields::{ErrorMap, Field, FormFields};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s'’-]+$").expect("name pattern is valid"));

/// Custom check returning a domain-specific error message.
pub type CustomCheck = fn(&str) -> Option<String>;

/// Validation rule for one field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: Field,
    pub required: bool,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub pattern: Option<Regex>,
    pub custom: Option<CustomCheck>,
}

impl FieldRule {
    /// An optional field with no constraints.
    pub fn new(field: Field) -> Self {
        Self {
            field,
            required: false,
            min_len: None,
            max_len: None,
            pattern: None,
            custom: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_len(mut self, min: usize) -> Self {
        self.min_len = Some(min);
        self
    }

    pub fn max_len(mut self, max: usize) -> Self {
        self.max_len = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn custom(mut self, check: CustomCheck) -> Self {
        self.custom = Some(check);
        self
    }

    /// Check a single value, returning the first error triggered.
    pub fn check(&self, value: &str) -> Option<String> {
        let value = value.trim();
        let label = self.field.label();

        if value.is_empty() {
            return self.required.then(|| format!("{label} is required"));
        }

        let len = value.chars().count();
        if let Some(min) = self.min_len {
            if len < min {
                return Some(format!("{label} must be at least {min} characters"));
            }
        }
        if let Some(max) = self.max_len {
            if len > max {
                return Some(format!("{label} must be no more than {max} characters"));
            }
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                return Some(match self.field {
                    Field::Email => "Please enter a valid email address".to_string(),
                    other => format!("Please enter a valid {}", other.key()),
                });
            }
        }

        self.custom.and_then(|check| check(value))
    }
}

fn check_name_characters(value: &str) -> Option<String> {
    if NAME_PATTERN.is_match(value) {
        None
    } else {
        Some("Name can only contain letters, spaces, hyphens, and apostrophes".to_string())
    }
}

/// The standard rule table for the contact form.
pub fn default_rules(limits: &FieldLimits) -> Vec<FieldRule> {
    vec![
        FieldRule::new(Field::Name)
            .required()
            .min_len(2)
            .max_len(limits.name)
            .custom(check_name_characters),
        FieldRule::new(Field::Email)
            .required()
            .max_len(limits.email)
            .pattern(EMAIL_PATTERN.clone()),
        FieldRule::new(Field::Subject)
            .required()
            .min_len(5)
            .max_len(limits.subject),
        FieldRule::new(Field::Message)
            .required()
            .min_len(10)
            .max_len(limits.message),
    ]
}

/// Validates contact form fields against a rule table.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    rules: Vec<FieldRule>,
}

impl Default for FieldValidator {
    fn default() -> Self {
        Self::new(&FieldLimits::default())
    }
}

impl FieldValidator {
    /// Validator using the standard rules with the given length caps.
    pub fn new(limits: &FieldLimits) -> Self {
        Self::with_rules(default_rules(limits))
    }

    pub fn with_rules(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    /// Validate every field that has a rule, in table order.
    pub fn validate(&self, fields: &FormFields) -> ErrorMap {
        let errors: ErrorMap = self
            .rules
            .iter()
            .filter_map(|rule| {
                rule.check(fields.get(rule.field))
                    .map(|error| (rule.field, error))
            })
            .collect();

        debug!(invalid = errors.len(), "Validated contact form");
        errors
    }

    /// Validate one field. Fields without a rule are always valid.
    pub fn validate_field(&self, field: Field, value: &str) -> Option<String> {
        self.rules
            .iter()
            .find(|rule| rule.field == field)
            .and_then(|rule| rule.check(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_fields() -> FormFields {
        FormFields::new("Jo", "jo@x.com", "Hi there", "This is a test message.")
    }

    #[test]
    fn test_valid_form() {
        let validator = FieldValidator::default();
        assert!(validator.validate(&valid_fields()).is_empty());
    }

    #[test]
    fn test_required_fields() {
        let validator = FieldValidator::default();
        let errors = validator.validate(&FormFields::new("", "   ", "\t", "\n"));

        assert_eq!(errors.len(), 4);
        assert_eq!(errors[&Field::Name], "Name is required");
        assert_eq!(errors[&Field::Email], "Email is required");
        assert_eq!(errors[&Field::Subject], "Subject is required");
        assert_eq!(errors[&Field::Message], "Message is required");
    }

    #[test]
    fn test_optional_empty_skips_remaining_checks() {
        let validator = FieldValidator::with_rules(vec![FieldRule::new(Field::Subject)
            .min_len(5)
            .pattern(Regex::new("^never$").unwrap())
            .custom(|_| Some("always fails".to_string()))]);

        assert!(validator.validate_field(Field::Subject, "").is_none());
        assert!(validator.validate_field(Field::Subject, "   ").is_none());
        assert_eq!(
            validator.validate_field(Field::Subject, "abc").as_deref(),
            Some("Subject must be at least 5 characters")
        );
    }

    #[test]
    fn test_email_pattern() {
        let validator = FieldValidator::default();

        assert!(validator.validate_field(Field::Email, "a@b.co").is_none());
        assert_eq!(
            validator.validate_field(Field::Email, "not-an-email").as_deref(),
            Some("Please enter a valid email address")
        );
        assert!(validator.validate_field(Field::Email, "a b@c.io").is_some());
    }

    #[test]
    fn test_length_bounds() {
        let validator = FieldValidator::default();

        assert_eq!(
            validator.validate_field(Field::Name, "J").as_deref(),
            Some("Name must be at least 2 characters")
        );
        assert_eq!(
            validator.validate_field(Field::Subject, "Hey").as_deref(),
            Some("Subject must be at least 5 characters")
        );
        assert_eq!(
            validator.validate_field(Field::Message, &"x".repeat(2001)).as_deref(),
            Some("Message must be no more than 2000 characters")
        );
        assert!(validator.validate_field(Field::Message, &"x".repeat(2000)).is_none());
    }

    #[test]
    fn test_length_counts_characters() {
        let validator = FieldValidator::default();
        // Two characters, four bytes.
        assert!(validator.validate_field(Field::Name, "Éé").is_none());
    }

    #[test]
    fn test_name_characters() {
        let validator = FieldValidator::default();

        assert!(validator.validate_field(Field::Name, "Mary-Jane O'Neil").is_none());
        assert!(validator.validate_field(Field::Name, "José Núñez").is_none());
        assert_eq!(
            validator.validate_field(Field::Name, "R2-D2").as_deref(),
            Some("Name can only contain letters, spaces, hyphens, and apostrophes")
        );
    }

    #[test]
    fn test_first_error_wins() {
        let validator = FieldValidator::default();
        // Too short and invalid characters: the length error is reported.
        assert_eq!(
            validator.validate_field(Field::Name, "1").as_deref(),
            Some("Name must be at least 2 characters")
        );
    }

    #[test]
    fn test_message_cap_follows_limits() {
        let limits = FieldLimits {
            message: 1000,
            ..Default::default()
        };
        let validator = FieldValidator::new(&limits);
        assert!(validator.validate_field(Field::Message, &"x".repeat(1001)).is_some());
    }
}
