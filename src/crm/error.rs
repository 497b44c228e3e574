//! Upstream failure parsing and classification.

use serde_json::Value;
use thiserror::Error;

/// Dataverse service-protection and transient SQL codes that are safe to
/// retry even when the HTTP status alone would not say so.
const RETRYABLE_VENDOR_CODES: &[&str] = &[
    "0x80072321", // request count limit
    "0x80072322", // execution time limit
    "0x80072326", // concurrent request limit
    "0x80044151", // SQL deadlock
    "0x80044150", // SQL timeout
];

const NON_RETRYABLE_STATUSES: &[u16] = &[400, 404, 409];
const RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// One interpreted upstream failure. Immutable from construction; the retry
/// path never mutates a status code after the fact.
#[derive(Debug, Clone)]
pub struct ParsedError {
    pub status_code: u16,
    /// Vendor error code, opaque to us.
    pub error_code: String,
    /// Raw upstream message, for server-side logs only.
    pub message: String,
    pub is_retryable: bool,
    /// Sanitized message safe to surface to a caller.
    pub user_message: String,
}

impl ParsedError {
    /// Interpret an HTTP failure body. Dynamics wraps failures as
    /// `{"error": {"code": "...", "message": "...", "innererror": {...}}}`;
    /// anything unparsable degrades to the raw text.
    pub fn from_response(status_code: u16, body: &str) -> Self {
        let (error_code, message) = match serde_json::from_str::<Value>(body) {
            Ok(parsed) => {
                let error = &parsed["error"];
                let code = error["code"].as_str().unwrap_or("").to_string();
                let message = error["message"]
                    .as_str()
                    .or_else(|| error["innererror"]["message"].as_str())
                    .unwrap_or(body)
                    .to_string();
                (code, message)
            }
            Err(_) => (String::new(), body.to_string()),
        };

        let is_retryable = classify_retryable(status_code, &error_code);
        Self {
            user_message: user_message_for(status_code).to_string(),
            status_code,
            error_code,
            message,
            is_retryable,
        }
    }

    /// Network-level failure (connect error, reset). Always retryable.
    pub fn network(message: String) -> Self {
        Self {
            status_code: 0,
            error_code: "network".to_string(),
            message,
            is_retryable: true,
            user_message: user_message_for(503).to_string(),
        }
    }

    /// Request timeout: the in-flight call was cancelled; treated as a
    /// retryable network error.
    pub fn timeout(message: String) -> Self {
        Self {
            status_code: 0,
            error_code: "timeout".to_string(),
            message,
            is_retryable: true,
            user_message: user_message_for(504).to_string(),
        }
    }

    /// Message with GUIDs and stack-trace lines stripped, bounded in length.
    /// Never contains a bearer token; tokens are not threaded through error
    /// construction at all.
    pub fn sanitized_message(&self) -> String {
        sanitize_message(&self.message)
    }
}

fn classify_retryable(status_code: u16, error_code: &str) -> bool {
    if NON_RETRYABLE_STATUSES.contains(&status_code) {
        return false;
    }
    if RETRYABLE_STATUSES.contains(&status_code) {
        return true;
    }
    RETRYABLE_VENDOR_CODES
        .iter()
        .any(|code| error_code.eq_ignore_ascii_case(code))
}

/// Fixed status -> user-facing message table. Vendor detail never reaches a
/// response.
fn user_message_for(status_code: u16) -> &'static str {
    match status_code {
        400 => "The request could not be processed.",
        404 => "The requested record was not found.",
        409 => "The record was changed by another user. Please refresh and try again.",
        429 => "The service is busy. Please try again shortly.",
        _ => "The service is temporarily unavailable. Please try again later.",
    }
}

/// Strip GUIDs and stack-trace lines from an upstream message and bound its
/// length.
pub fn sanitize_message(message: &str) -> String {
    let first_line = message
        .lines()
        .find(|line| !line.trim_start().starts_with("at "))
        .unwrap_or("");
    let stripped = strip_guids(first_line);
    let mut out: String = stripped.chars().take(200).collect();
    if stripped.chars().count() > 200 {
        out.push_str("...");
    }
    out
}

fn strip_guids(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if i + 36 <= chars.len() && is_guid_at(&chars[i..i + 36]) {
            out.push_str("[guid]");
            i += 36;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn is_guid_at(window: &[char]) -> bool {
    window.iter().enumerate().all(|(i, c)| match i {
        8 | 13 | 18 | 23 => *c == '-',
        _ => c.is_ascii_hexdigit(),
    })
}

#[derive(Error, Debug)]
pub enum CrmError {
    /// No bearer token available. Fatal configuration error; never retried.
    #[error("No access token available for the CRM connection")]
    MissingToken,

    #[error("CRM client configuration error: {0}")]
    Configuration(String),

    /// Terminal non-retryable upstream failure.
    #[error("CRM request failed with status {}: {}", .0.status_code, .0.error_code)]
    Upstream(ParsedError),

    /// All retry attempts consumed.
    #[error("CRM request failed after {attempts} attempts ({total_delay_ms}ms of backoff)")]
    RetriesExhausted {
        last: ParsedError,
        attempts: u32,
        total_delay_ms: u64,
    },

    #[error("Unexpected CRM response: {0}")]
    InvalidResponse(String),
}
