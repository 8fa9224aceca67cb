// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Tapewerk.
//
// Each orchestrator step has its own variant so a caller can tell exactly
// which step of a print session failed. Nothing is retried internally.

use std::time::Duration;

use thiserror::Error;

use crate::status::{Status, TapeType};
use crate::types::ErrorClass;

/// Top-level error type for all Tapewerk operations.
#[derive(Debug, Error)]
pub enum TapewerkError {
    // -- Transport / wire --
    #[error("connectivity: {0}")]
    Connectivity(String),

    #[error("protocol: {message} (raw: {})", hex::encode(.raw))]
    Protocol { message: String, raw: Vec<u8> },

    // -- Preconditions (no device state touched) --
    #[error("printer is not idle (status {0})")]
    NotIdle(Status),

    #[error("image needs {requested} dots across but the {tape} only fits {available}")]
    Capacity {
        requested: u16,
        available: u16,
        tape: TapeType,
    },

    #[error("another print is already in progress on {0}")]
    Busy(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    // -- Orchestrator steps --
    #[error("requesting lock: {0}")]
    Lock(#[source] Box<TapewerkError>),

    #[error("connecting data channel: {0}")]
    Connect(String),

    #[error("requesting start: {0}")]
    Start(#[source] Box<TapewerkError>),

    #[error("writing print data: {0}")]
    Transfer(String),

    #[error("closing data channel: {0}")]
    Close(String),

    #[error("waiting for print to finish: {0}")]
    StatusPoll(#[source] Box<TapewerkError>),

    #[error("print did not finish within {0:?}")]
    PrintTimeout(Duration),

    #[error("print cancelled while waiting for completion")]
    Cancelled,

    #[error("requesting unlock: {0}")]
    Unlock(#[source] Box<TapewerkError>),

    // -- Ambient --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TapewerkError {
    /// Build a protocol error carrying the offending bytes.
    pub fn protocol(message: impl Into<String>, raw: &[u8]) -> Self {
        Self::Protocol {
            message: message.into(),
            raw: raw.to_vec(),
        }
    }

    /// How a caller should treat this error when deciding whether to retry
    /// the whole session.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Connectivity(_)
            | Self::Connect(_)
            | Self::Busy(_)
            | Self::StatusPoll(_) => ErrorClass::Transient,

            // The device did not become idle or holds a stale lock; someone
            // has to look at it.
            Self::NotIdle(_) | Self::Capacity { .. } | Self::PrintTimeout(_) => {
                ErrorClass::UserAction
            }

            // A session that failed after the lock leaves the device locked,
            // so blind retries would only hit NotIdle.
            Self::Lock(inner) | Self::Start(inner) => match inner.class() {
                ErrorClass::Transient => ErrorClass::UserAction,
                other => other,
            },
            Self::Transfer(_) | Self::Close(_) | Self::Unlock(_) => ErrorClass::UserAction,

            Self::Cancelled => ErrorClass::Permanent,
            Self::Protocol { .. }
            | Self::InvalidImage(_)
            | Self::Config(_)
            | Self::Serialization(_) => ErrorClass::Permanent,

            Self::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::Interrupted => ErrorClass::Transient,
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    ErrorClass::UserAction
                }
                _ => ErrorClass::Transient,
            },
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TapewerkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::IDLE_TEMPLATE;

    #[test]
    fn protocol_error_shows_raw_bytes() {
        let err = TapewerkError::protocol("unexpected lock response", &[0x02, 0x01, 0xff]);
        assert_eq!(
            err.to_string(),
            "protocol: unexpected lock response (raw: 0201ff)"
        );
    }

    #[test]
    fn step_errors_keep_their_cause() {
        let err = TapewerkError::Lock(Box::new(TapewerkError::Connectivity(
            "receive: timed out".into(),
        )));
        assert!(err.to_string().starts_with("requesting lock: connectivity"));
        let source = std::error::Error::source(&err).expect("boxed cause");
        assert!(source.to_string().contains("timed out"));
    }

    #[test]
    fn capacity_message_names_the_tape() {
        let err = TapewerkError::Capacity {
            requested: 120,
            available: 72,
            tape: TapeType::Width6mm,
        };
        assert_eq!(
            err.to_string(),
            "image needs 120 dots across but the 6mm tape only fits 72"
        );
    }

    #[test]
    fn classification() {
        assert_eq!(
            TapewerkError::Connectivity("x".into()).class(),
            ErrorClass::Transient
        );
        assert_eq!(
            TapewerkError::NotIdle(Status::new(IDLE_TEMPLATE)).class(),
            ErrorClass::UserAction
        );
        assert_eq!(
            TapewerkError::protocol("bad", &[]).class(),
            ErrorClass::Permanent
        );
        let locked_then_lost = TapewerkError::Start(Box::new(TapewerkError::Connectivity(
            "timed out".into(),
        )));
        assert_eq!(locked_then_lost.class(), ErrorClass::UserAction);
    }
}
