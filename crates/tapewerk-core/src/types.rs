// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Tapewerk driver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

use crate::status::TapeType;

/// Unique identifier for one print session, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Steps of a print session, in the order they are entered.
///
/// `Error` is absorbing: once a step fails the session ends there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Checking the status register before touching the device.
    Idle,
    /// Acquiring the device lock over the control channel.
    Locking,
    /// Dialing the data channel and announcing the job.
    Connecting,
    /// Streaming the job and closing the data channel.
    Sending,
    /// Polling until the print head stops, then unlocking.
    WaitingCompletion,
    /// Job printed and device released.
    Done,
    /// A step failed.
    Error,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// Classification of errors for caller-side retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Network blip, timeout, busy device. The whole session can be retried.
    Transient,
    /// Someone must look at the device (wrong tape, stuck lock, jam).
    UserAction,
    /// Retrying cannot help: bad image, protocol mismatch or bad config.
    Permanent,
}

/// Summary of a successful print session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintReport {
    pub session_id: SessionId,
    pub device: SocketAddr,
    /// Tape loaded when the job was accepted.
    pub tape: TapeType,
    /// Raster columns sent (feed-direction length of the image).
    pub columns: u32,
    /// Size of the job stream written to the data channel.
    pub job_bytes: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PrintReport {
    /// Wall-clock time of the whole session.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(SessionState::Done.is_terminal());
        assert!(SessionState::Error.is_terminal());
        assert!(!SessionState::Sending.is_terminal());
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn report_serializes() {
        let now = Utc::now();
        let report = PrintReport {
            session_id: SessionId::new(),
            device: "127.0.0.1:9100".parse().expect("socket addr"),
            tape: TapeType::Width12mm,
            columns: 40,
            job_bytes: 512,
            started_at: now,
            finished_at: now + chrono::Duration::seconds(3),
        };
        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains("\"Width12mm\""));
        assert_eq!(report.elapsed().num_seconds(), 3);
    }
}
