// src/checker/result.rs
// =============================================================================
// The record produced for every checked URL.
//
// Status codes are strings on purpose: when every attempt fails, the final
// status holds an error label (TIMEOUT, DNS_ERROR, ...) instead of a number,
// so the column always says *something*.
// =============================================================================

use super::errors::ErrorKind;
use super::http::Probe;
use serde::{Deserialize, Serialize, Serializer};

/// The outcome of checking one URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub input_url: String,
    /// Status of the very first response, before any redirect
    pub first_status_code: String,
    /// Status after following redirects, or an error label
    pub final_status_code: String,
    pub final_url: String,
    #[serde(serialize_with = "round_to_tenth")]
    pub response_time_ms: f64,
    pub redirect_count: usize,
    /// e.g. "301→302→200"
    pub redirect_chain: String,
    /// "HEAD" or "GET"; empty if no request succeeded
    pub method_used: String,
    /// Label of the identity that produced the final result
    pub user_agent_used: String,
    pub soft_404: bool,
    /// Error label, empty on success
    pub error: String,
    /// Status from the alternate-identity retry, if one was made
    pub alt_status_code: String,
    pub alt_user_agent_used: String,
}

fn round_to_tenth<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 10.0).round() / 10.0)
}

impl CheckResult {
    pub fn new(input_url: impl Into<String>) -> Self {
        Self {
            input_url: input_url.into(),
            ..Default::default()
        }
    }

    /// Builds the result for a URL where every attempt failed.
    pub fn failed(input_url: impl Into<String>, kind: &ErrorKind, elapsed_ms: f64, identity_label: &str) -> Self {
        let label = kind.to_string();
        Self {
            input_url: input_url.into(),
            final_status_code: label.clone(),
            error: label,
            response_time_ms: elapsed_ms,
            user_agent_used: identity_label.to_string(),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    // Copies everything a probe observed into the result
    pub(crate) fn record_probe(&mut self, probe: &Probe, identity_label: &str) {
        self.first_status_code = probe.first_status().to_string();
        self.final_status_code = probe.final_status().to_string();
        self.final_url = probe.final_url.clone();
        self.redirect_count = probe.redirect_count();
        self.redirect_chain = probe.chain();
        self.method_used = probe.method.to_string();
        self.user_agent_used = identity_label.to_string();
        self.soft_404 = probe.soft_404;
    }

    // Records the alternate-identity probe, and promotes it to the final
    // result when it got through (status < 400)
    pub(crate) fn record_alternate(&mut self, probe: &Probe, identity_label: &str) {
        self.alt_status_code = probe.final_status().to_string();
        self.alt_user_agent_used = identity_label.to_string();

        if probe.final_status() < 400 {
            self.first_status_code = probe.first_status().to_string();
            self.final_status_code = probe.final_status().to_string();
            self.final_url = probe.final_url.clone();
            self.redirect_count = probe.redirect_count();
            self.redirect_chain = probe.chain();
            self.method_used = probe.method.to_string();
            self.soft_404 = probe.soft_404;
            self.user_agent_used = format!("{} (retry)", identity_label);
        }
    }
}
