// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Markup stripping, whitespace normalisation and length capping.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::FieldLimits;
use crate::fields::FormFields;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Sanitize a single value and cap it at `max` characters.
///
/// Truncation is silent. Trailing whitespace exposed by truncation is
/// trimmed so that sanitizing twice gives the same result as once.
pub fn sanitize_value(value: &str, max: usize) -> String {
    let stripped = TAG.replace_all(value, "");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    match collapsed.char_indices().nth(max) {
        Some((cut, _)) => collapsed[..cut].trim_end().to_string(),
        None => collapsed,
    }
}

/// Sanitize every field, decoy included, against its cap.
pub fn sanitize(fields: &FormFields, limits: &FieldLimits) -> FormFields {
    FormFields {
        name: sanitize_value(&fields.name, limits.name),
        email: sanitize_value(&fields.email, limits.email),
        subject: sanitize_value(&fields.subject, limits.subject),
        message: sanitize_value(&fields.message, limits.message),
        honeypot: sanitize_value(&fields.honeypot, limits.honeypot),
    }
}
