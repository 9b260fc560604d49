// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for verification outcomes.
//!
//! The verifier itself has no side effects beyond the nonce claim; the HTTP
//! layer reports every verdict to an [`AuditSink`]. A failing sink is logged
//! and never changes the verdict.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    VerificationSucceeded,
    VerificationRejected,
    /// A consumed nonce was submitted again. Always security-relevant.
    ReplayDetected,
    /// The nonce store could not be reached; the request failed closed.
    StoreUnavailable,
    RateLimited,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Nonce of the submitted record (if it got that far).
    pub nonce: Option<String>,
    /// Public key claimed by the caller.
    pub public_key: Option<String>,
    /// Domain named in the record.
    pub domain: Option<String>,
    /// Internal rejection code, including details hidden from the caller.
    pub code: Option<String>,
    /// Whether the request was accepted.
    pub success: bool,
    /// Internal error description.
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            nonce: None,
            public_key: None,
            domain: None,
            code: None,
            success: true,
            error: None,
        }
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Mark as failed with an internal code and description.
    pub fn failed(mut self, code: impl Into<String>, error: impl Into<String>) -> Self {
        self.success = false;
        self.code = Some(code.into());
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Emits audit events as structured logs on the `audit` target.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        tracing::info!(
            target: "audit",
            event_id = %event.event_id,
            event_type = ?event.event_type,
            nonce = event.nonce.as_deref().unwrap_or("-"),
            domain = event.domain.as_deref().unwrap_or("-"),
            code = event.code.as_deref().unwrap_or("-"),
            success = event.success,
            "audit event"
        );
        Ok(())
    }
}

/// Appends events as JSON lines to `{root}/{date}/events.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlAuditSink {
    root: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn events_file(&self, date: &str) -> PathBuf {
        self.root.join(date).join("events.jsonl")
    }

    /// Read audit events for a specific date (`YYYY-MM-DD`).
    #[cfg(test)]
    pub(crate) fn read_events(&self, date: &str) -> Result<Vec<AuditEvent>, AuditError> {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| AuditError::InvalidDate(e.to_string()))?;

        let path = self.events_file(date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.events_file(&date);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(&line)?;
        Ok(())
    }
}

/// Record an event, logging (not propagating) sink failures.
#[macro_export]
macro_rules! audit_log {
    ($sink:expr, $event:expr) => {{
        let event = $event;
        if let Err(e) = $sink.record(&event) {
            tracing::warn!(
                error = %e,
                event_type = ?event.event_type,
                "Failed to record audit event"
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_audit_event() {
        let event = AuditEvent::new(AuditEventType::VerificationSucceeded)
            .with_nonce("n1")
            .with_public_key("pk")
            .with_domain("app.example");

        assert_eq!(event.event_type, AuditEventType::VerificationSucceeded);
        assert_eq!(event.nonce.as_deref(), Some("n1"));
        assert_eq!(event.domain.as_deref(), Some("app.example"));
        assert!(event.success);
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::ReplayDetected)
            .failed("REPLAYED_NONCE", "nonce already consumed");

        assert!(!event.success);
        assert_eq!(event.code.as_deref(), Some("REPLAYED_NONCE"));
    }

    #[test]
    fn log_and_read_events() {
        let temp = TempDir::new().unwrap();
        let sink = JsonlAuditSink::new(temp.path());

        sink.record(&AuditEvent::new(AuditEventType::VerificationSucceeded).with_nonce("n1"))
            .unwrap();
        sink.record(
            &AuditEvent::new(AuditEventType::ReplayDetected)
                .with_nonce("n1")
                .failed("REPLAYED_NONCE", "nonce already consumed"),
        )
        .unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = sink.read_events(&today).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::VerificationSucceeded);
        assert_eq!(events[1].event_type, AuditEventType::ReplayDetected);
    }

    #[test]
    fn read_missing_day_is_empty() {
        let temp = TempDir::new().unwrap();
        let sink = JsonlAuditSink::new(temp.path());
        assert!(sink.read_events("2020-01-01").unwrap().is_empty());
        assert!(sink.read_events("../etc").is_err());
    }

    #[test]
    fn macro_swallows_sink_errors() {
        struct Failing;
        impl AuditSink for Failing {
            fn record(&self, _: &AuditEvent) -> Result<(), AuditError> {
                Err(AuditError::InvalidDate("boom".to_string()))
            }
        }
        crate::audit_log!(Failing, AuditEvent::new(AuditEventType::RateLimited));
    }
}
