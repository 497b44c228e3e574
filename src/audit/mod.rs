//! Structured security audit events.
//!
//! Events carry a closed taxonomy, a derived severity, and redacted detail
//! fields. Every event goes to the process log via `tracing` and to an
//! optional pluggable sink; sink failures never propagate to the caller
//! whose action triggered the event.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

pub const REDACTED: &str = "[REDACTED]";

/// Closed audit event taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    AccessGranted,
    AccessDenied,
    CrossTenantAttempt,
    FilterApplied,
    QueryExecuted,
    QueryFailed,
    MissingOrgContext,
    InvalidOrgType,
    InvalidSortField,
    InitiativeMappingFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl AuditSeverity {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "critical" => AuditSeverity::Critical,
            "error" => AuditSeverity::Error,
            "warning" | "warn" => AuditSeverity::Warning,
            _ => AuditSeverity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditResult {
    Success,
    Failure,
}

/// Write-once audit event. Severity is derived from the event type and
/// result at construction; `with_severity` exists for the few call sites
/// that deliberately downgrade (e.g. tolerated per-record mapping misses).
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub user_id: Option<String>,
    pub initiative: Option<String>,
    pub resource: Option<String>,
    pub result: AuditResult,
    pub details: Value,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, result: AuditResult) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            severity: derive_severity(event_type, result),
            user_id: None,
            initiative: None,
            resource: None,
            result,
            details: Value::Null,
        }
    }

    pub fn with_user(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.map(str::to_string);
        self
    }

    pub fn with_initiative(mut self, initiative: &str) -> Self {
        self.initiative = Some(initiative.to_string());
        self
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = Some(resource.to_string());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Fixed severity derivation for the closed taxonomy.
pub fn derive_severity(event_type: AuditEventType, result: AuditResult) -> AuditSeverity {
    use AuditEventType::*;
    match event_type {
        CrossTenantAttempt => AuditSeverity::Critical,
        AccessDenied | QueryFailed | InitiativeMappingFailed => AuditSeverity::Error,
        MissingOrgContext | InvalidOrgType | InvalidSortField => AuditSeverity::Warning,
        _ if result == AuditResult::Failure => AuditSeverity::Error,
        _ => AuditSeverity::Info,
    }
}

/// Receives every emitted event in addition to the default log stream.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: &AuditEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Clone)]
pub struct AuditLogger {
    min_severity: AuditSeverity,
    sink: Option<Arc<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("min_severity", &self.min_severity)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl AuditLogger {
    pub fn new(min_severity: AuditSeverity) -> Self {
        Self {
            min_severity,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Redact and emit one event. Events below the minimum severity are
    /// dropped.
    pub fn log(&self, mut event: AuditEvent) {
        if event.severity < self.min_severity {
            return;
        }
        redact(&mut event.details);

        let payload = serde_json::to_string(&event).unwrap_or_else(|_| format!("{:?}", event));
        match event.severity {
            AuditSeverity::Info => tracing::info!(target: "audit", "{}", payload),
            AuditSeverity::Warning => tracing::warn!(target: "audit", "{}", payload),
            AuditSeverity::Error => tracing::error!(target: "audit", "{}", payload),
            AuditSeverity::Critical => {
                tracing::error!(target: "audit", security_critical = true, "{}", payload)
            }
        }

        if let Some(ref sink) = self.sink {
            if let Err(e) = sink.emit(&event) {
                tracing::warn!("audit sink failed: {}", e);
            }
        }
    }
}

/// Replace values under sensitive key names, recursing through nested
/// objects and arrays. Matching is a case-insensitive substring check.
fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *child = Value::String(REDACTED.to_string());
                } else {
                    redact(child);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact(item);
            }
        }
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    ["password", "token", "secret", "authorization"]
        .iter()
        .any(|needle| lower.contains(needle))
}
