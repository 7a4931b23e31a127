// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tally for simulated submissions.

use contact_relay::pipeline::Submission;
use std::collections::HashMap;
use std::fmt;

/// Counts submissions by outcome code.
#[derive(Debug, Default)]
pub struct Tally {
    outcomes: HashMap<&'static str, usize>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, submission: &Submission) {
        let code = match &submission.result {
            Ok(_) => "accepted",
            Err(e) => e.code(),
        };
        *self.outcomes.entry(code).or_insert(0) += 1;
    }

    pub fn count(&self, code: &str) -> usize {
        self.outcomes.get(code).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn accepted(&self) -> usize {
        self.count("accepted")
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.outcomes.iter().collect();
        codes.sort();
        writeln!(f, "=== Submission Tally ({} total) ===", self.total())?;
        for (code, count) in codes {
            writeln!(f, "{code:<18} {count}")?;
        }
        Ok(())
    }
}
