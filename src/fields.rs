// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Typed model of the contact form.
//!
//! The four user-editable fields are a closed enum so rules, limits and
//! error maps are keyed by type rather than by string. The decoy field is
//! carried alongside but never validated or displayed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::validator::FieldValidator;

/// A user-editable contact form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Subject,
    Message,
}

impl Field {
    /// All fields in form order.
    pub const ALL: [Field; 4] = [Field::Name, Field::Email, Field::Subject, Field::Message];

    /// Key used on the wire and in template parameters.
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Subject => "subject",
            Self::Message => "message",
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Subject => "Subject",
            Self::Message => "Message",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// First error per invalid field. A missing key means the field is valid.
pub type ErrorMap = BTreeMap<Field, String>;

/// Raw values of a contact form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    /// Decoy field, hidden from people and left empty by them.
    #[serde(default, rename = "website")]
    pub honeypot: String,
}

impl FormFields {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            subject: subject.into(),
            message: message.into(),
            honeypot: String::new(),
        }
    }

    pub fn with_honeypot(mut self, value: impl Into<String>) -> Self {
        self.honeypot = value.into();
        self
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Subject => &self.subject,
            Field::Message => &self.message,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Subject => &mut self.subject,
            Field::Message => &mut self.message,
        };
        *slot = value.into();
    }

    /// Reset every field, decoy included, to the empty string.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_empty()) && self.honeypot.is_empty()
    }
}

/// Whether the status region reports success or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Error,
}

/// Message shown in the form's live status region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormStatus {
    pub kind: StatusKind,
    pub message: String,
}

impl FormStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == StatusKind::Success
    }
}

/// State of one contact form as seen by its user.
///
/// Errors are tracked for every field but only surfaced for fields the
/// user has touched (blurred, or all of them after a submit attempt).
#[derive(Debug, Clone)]
pub struct ContactForm {
    pub fields: FormFields,
    errors: ErrorMap,
    touched: BTreeSet<Field>,
    status: Option<FormStatus>,
    opened_at: Option<i64>,
    client: Option<String>,
}

impl ContactForm {
    /// A blank form opened at `opened_at` (milliseconds since the epoch).
    pub fn new(opened_at: i64) -> Self {
        Self::with_fields(FormFields::default(), Some(opened_at))
    }

    /// A form prefilled with `fields`, e.g. from a submitted request body.
    pub fn with_fields(fields: FormFields, opened_at: Option<i64>) -> Self {
        Self {
            fields,
            errors: ErrorMap::new(),
            touched: BTreeSet::new(),
            status: None,
            opened_at,
            client: None,
        }
    }

    /// Partition rate limiting and the in-flight guard by `client`.
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn opened_at(&self) -> Option<i64> {
        self.opened_at
    }

    pub fn client(&self) -> Option<&str> {
        self.client.as_deref()
    }

    pub fn status(&self) -> Option<&FormStatus> {
        self.status.as_ref()
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn is_touched(&self, field: Field) -> bool {
        self.touched.contains(&field)
    }

    /// Change a field value. A stale status message is cleared, and a
    /// touched field is re-validated so its error tracks the input.
    pub fn update(&mut self, validator: &FieldValidator, field: Field, value: impl Into<String>) {
        self.fields.set(field, value);
        self.status = None;
        if self.is_touched(field) {
            self.revalidate(validator, field);
        }
    }

    /// Mark a field as touched and validate it without affecting the others.
    pub fn blur(&mut self, validator: &FieldValidator, field: Field) {
        self.touched.insert(field);
        self.revalidate(validator, field);
    }

    /// The error to display for `field`, if any.
    pub fn visible_error(&self, field: Field) -> Option<&str> {
        if self.is_touched(field) {
            self.errors.get(&field).map(String::as_str)
        } else {
            None
        }
    }

    /// Clear values, errors and touched state. The status is kept so a
    /// success message survives the reset.
    pub fn reset(&mut self) {
        self.fields.clear();
        self.errors.clear();
        self.touched.clear();
    }

    pub(crate) fn set_errors(&mut self, errors: ErrorMap) {
        self.touched.extend(Field::ALL);
        self.errors = errors;
    }

    pub(crate) fn set_status(&mut self, status: FormStatus) {
        self.status = Some(status);
    }

    pub(crate) fn clear_status(&mut self) {
        self.status = None;
    }

    fn revalidate(&mut self, validator: &FieldValidator, field: Field) {
        match validator.validate_field(field, self.fields.get(field)) {
            Some(error) => {
                self.errors.insert(field, error);
            }
            None => {
                self.errors.remove(&field);
            }
        }
    }
}
