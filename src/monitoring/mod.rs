use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::transport::ConnectionState;

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct IngestSnapshot {
	pub messages_appended: u64,
	pub bytes_appended: u64,
	pub started_at: Option<DateTime<Utc>>,
	pub last_message_at: Option<DateTime<Utc>>,
}

/// Running counters for one logger. Updated from the receive loop only.
#[derive(Debug, Default)]
pub struct IngestStats {
	inner: Mutex<IngestSnapshot>,
}

impl IngestStats {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mark_started(&self) {
		if let Ok(mut guard) = self.inner.lock() {
			guard.started_at = Some(Utc::now());
		}
	}

	pub fn record_append(&self, bytes: usize) {
		if let Ok(mut guard) = self.inner.lock() {
			guard.messages_appended += 1;
			guard.bytes_appended = guard.bytes_appended.saturating_add(bytes as u64);
			guard.last_message_at = Some(Utc::now());
		}
	}

	pub fn snapshot(&self) -> IngestSnapshot {
		self.inner
			.lock()
			.map(|guard| guard.clone())
			.unwrap_or_default()
	}
}

/// Structured lifecycle events, emitted under the `ingest` target.
#[derive(Debug, Clone, Default)]
pub struct IngestEvents;

impl IngestEvents {
	pub fn new() -> Self {
		Self
	}

	pub fn connecting(&self, endpoint: &str) {
		info!(target: "ingest", event = "connecting", endpoint);
	}

	pub fn connected(&self, endpoint: &str) {
		info!(target: "ingest", event = "connected", endpoint);
	}

	pub fn connect_failed(&self, endpoint: &str, error_msg: &str) {
		warn!(target: "ingest", event = "connect_failed", endpoint, error = error_msg);
	}

	pub fn message_appended(&self, seq: u64, bytes: usize) {
		debug!(target: "ingest", event = "message_appended", seq, bytes);
	}

	pub fn connection_closed(&self, endpoint: &str, state: ConnectionState, messages: u64) {
		info!(target: "ingest", event = "connection_closed", endpoint, state = %state, messages);
	}

	pub fn stop_requested(&self, state: ConnectionState) {
		info!(target: "ingest", event = "stop_requested", state = %state);
	}

	pub fn transport_error(&self, endpoint: &str, error_msg: &str) {
		warn!(target: "ingest", event = "transport_error", endpoint, error = error_msg);
	}

	pub fn persistence_failed(&self, path: &str, error_msg: &str) {
		error!(target: "ingest", event = "persistence_failed", path, error = error_msg);
	}
}
