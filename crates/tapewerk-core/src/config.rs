// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Driver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TapewerkError};

/// How the device frames control-channel responses.
///
/// Two firmware revisions have been observed. Only `HeaderAndBody` has been
/// checked against current hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseFraming {
    /// 32-byte response header followed by the body.
    #[default]
    HeaderAndBody,
    /// The device echoes the 32-byte request header, then sends the body.
    EchoedRequest,
}

/// Timeouts and protocol options for the print driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Bound for each connect, write and read on the control channel.
    pub control_timeout_ms: u64,
    /// Bound for dialing the data channel.
    pub data_connect_timeout_ms: u64,
    /// Bound for writing the whole job to the data channel.
    pub data_write_timeout_ms: u64,
    /// Interval between status polls while waiting for the print to finish.
    pub poll_interval_ms: u64,
    /// Overall deadline for the print to finish once the job is sent.
    pub completion_timeout_ms: u64,
    /// Pause between device steps; the device drops commands sent back to back.
    pub settle_delay_ms: u64,
    /// Data-channel port. `None` uses the control-channel port.
    pub data_port: Option<u16>,
    /// Control response framing revision.
    pub framing: ResponseFraming,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            control_timeout_ms: 1_000,
            data_connect_timeout_ms: 5_000,
            data_write_timeout_ms: 30_000,
            poll_interval_ms: 500,
            completion_timeout_ms: 30_000,
            settle_delay_ms: 500,
            data_port: None,
            framing: ResponseFraming::HeaderAndBody,
        }
    }
}

impl DriverConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the completion wait meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(TapewerkError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.poll_interval_ms > self.completion_timeout_ms {
            return Err(TapewerkError::Config(format!(
                "poll_interval_ms ({}) exceeds completion_timeout_ms ({})",
                self.poll_interval_ms, self.completion_timeout_ms
            )));
        }
        if self.control_timeout_ms == 0
            || self.data_connect_timeout_ms == 0
            || self.data_write_timeout_ms == 0
        {
            return Err(TapewerkError::Config("network timeouts must be > 0".into()));
        }
        Ok(())
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_millis(self.control_timeout_ms)
    }

    pub fn data_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.data_connect_timeout_ms)
    }

    pub fn data_write_timeout(&self) -> Duration {
        Duration::from_millis(self.data_write_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
