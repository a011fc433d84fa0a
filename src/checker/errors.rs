// src/checker/errors.rs
// =============================================================================
// This module turns transport failures into a small, fixed set of labels.
//
// reqwest reports many different low-level problems (TLS, DNS, refused
// connections, timeouts, dropped bodies...). Users only care about a handful
// of categories, so every failure is mapped to exactly one ErrorKind.
//
// Classification is a priority cascade, first match wins:
//   SSL -> timeout -> DNS -> connect -> read -> generic
// The order matters: a TLS handshake failure is also a "connect" error in
// reqwest's eyes, and we want it reported as SSL_ERROR.
//
// We look at the error's *source chain* text rather than its top-level
// message, because the top-level message contains the URL, and a URL like
// https://example.com/ssl-timeout-docs must not change the classification.
// =============================================================================

use std::error::Error as StdError;
use thiserror::Error;

// Text fragments that identify each category, matched case-insensitively
const SSL_MARKERS: &[&str] = &["certificate", "ssl", "tls", "handshake"];
const TIMEOUT_MARKERS: &[&str] = &["timed out", "timeout", "deadline"];
const DNS_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "no such host",
    "name resolution",
];
// "connect" alone would also match "connection closed", which is a read failure
const CONNECT_MARKERS: &[&str] = &[
    "tcp connect",
    "error trying to connect",
    "connection refused",
    "unreachable",
];
const READ_MARKERS: &[&str] = &[
    "connection reset",
    "connection closed",
    "unexpected eof",
    "incomplete message",
    "error reading",
    "broken pipe",
];

/// Why every attempt at checking a URL failed.
///
/// `Display` is the label shown to users.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("SSL_ERROR")]
    Ssl,
    #[error("TIMEOUT")]
    Timeout,
    #[error("DNS_ERROR")]
    Dns,
    #[error("CONNECT_ERROR")]
    Connect,
    #[error("READ_ERROR")]
    Read,
    /// Anything else, with a short name for the kind of failure
    #[error("ERROR ({0})")]
    Other(String),
}

impl ErrorKind {
    /// True if `label` is one of the labels this enum can produce.
    #[cfg(test)]
    pub fn is_label(label: &str) -> bool {
        matches!(
            label,
            "SSL_ERROR" | "TIMEOUT" | "DNS_ERROR" | "CONNECT_ERROR" | "READ_ERROR"
        ) || (label.starts_with("ERROR (") && label.ends_with(')'))
    }
}

/// What went wrong in a single probe.
#[derive(Error, Debug)]
pub(crate) enum ProbeError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("too many redirects")]
    TooManyRedirects,
}

impl ProbeError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Transport(e) => classify(e),
            ProbeError::TooManyRedirects => ErrorKind::Other("redirect".to_string()),
        }
    }
}

// The facts about a failure that the cascade looks at
#[derive(Debug, Default, Clone)]
struct Signals {
    timeout: bool,
    connect: bool,
    read: bool,
    kind: &'static str,
    // Lowercased text of the source chain
    detail: String,
}

/// Classifies a reqwest error.
pub fn classify(error: &reqwest::Error) -> ErrorKind {
    let kind = if error.is_redirect() {
        "redirect"
    } else if error.is_builder() {
        "builder"
    } else if error.is_status() {
        "status"
    } else if error.is_request() {
        "request"
    } else {
        "unknown"
    };

    let signals = Signals {
        timeout: error.is_timeout(),
        connect: error.is_connect(),
        read: error.is_body() || error.is_decode(),
        kind,
        detail: source_chain_text(error),
    };
    classify_signals(&signals)
}

fn source_chain_text(error: &reqwest::Error) -> String {
    let mut parts = Vec::new();
    let mut source = error.source();
    while let Some(err) = source {
        parts.push(err.to_string().to_lowercase());
        source = err.source();
    }
    parts.join(": ")
}

fn classify_signals(signals: &Signals) -> ErrorKind {
    let mentions = |markers: &[&str]| markers.iter().any(|m| signals.detail.contains(m));

    if mentions(SSL_MARKERS) {
        ErrorKind::Ssl
    } else if signals.timeout || mentions(TIMEOUT_MARKERS) {
        ErrorKind::Timeout
    } else if mentions(DNS_MARKERS) {
        ErrorKind::Dns
    } else if signals.connect || mentions(CONNECT_MARKERS) {
        ErrorKind::Connect
    } else if signals.read || mentions(READ_MARKERS) {
        ErrorKind::Read
    } else {
        ErrorKind::Other(signals.kind.to_string())
    }
}
