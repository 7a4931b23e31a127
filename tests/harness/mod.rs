// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for contact pipeline abuse simulation.
//!
//! Generators produce human and bot submissions; the tally records what
//! the pipeline did with each of them.

#![allow(dead_code)]

pub mod generators;
pub mod tally;

use async_trait::async_trait;
use contact_relay::dispatcher::{EmailTransport, TemplateParams, TransportFailure};
use std::sync::Mutex;

/// Transport double that records every message it is handed.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<TemplateParams>>,
    pub fail_with: Option<TransportFailure>,
}

impl RecordingTransport {
    pub fn failing(failure: TransportFailure) -> Self {
        Self {
            fail_with: Some(failure),
            ..Default::default()
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn send(
        &self,
        _service_id: &str,
        _template_id: &str,
        params: &TemplateParams,
        _credential_key: &str,
    ) -> Result<(), TransportFailure> {
        if let Some(failure) = &self.fail_with {
            return Err(failure.clone());
        }
        self.sent.lock().unwrap().push(params.clone());
        Ok(())
    }
}
