// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print orchestrator.
//
// One print session walks the device through a fixed sequence:
//
//   1. status must be idle and the tape wide enough
//   2. lock
//   3. dial the data channel
//   4. start print
//   5. write the job
//   6. close the data channel
//   7. poll status until the head stops
//   8. unlock
//
// Each step runs only after the previous one succeeded; the first failure
// ends the session with an error naming that step. A lock taken in step 2 is
// not released if a later step (before 8) fails: a locked device is visible
// at the printer, a blind unlock after an unknown failure is not.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use tapewerk_core::config::DriverConfig;
use tapewerk_core::error::{Result, TapewerkError};
use tapewerk_core::status::{Status, TapeType};
use tapewerk_core::types::{PrintReport, SessionId, SessionState};

use crate::control::ControlClient;
use crate::data_channel::DataChannel;
use crate::device_locks::DeviceLocks;
use crate::raster::RasterImageSource;
use crate::request::PrintRequest;
use crate::wait::{PollOutcome, poll_until};

/// Entry point for printing labels.
///
/// Cheap to clone; clones share the set of devices with a session in
/// flight, so concurrent calls for the same device are rejected with
/// [`TapewerkError::Busy`] while calls for different devices run
/// independently.
#[derive(Debug, Clone)]
pub struct PrintDriver {
    config: Arc<DriverConfig>,
    locks: DeviceLocks,
}

impl Default for PrintDriver {
    fn default() -> Self {
        Self {
            config: Arc::new(DriverConfig::default()),
            locks: DeviceLocks::new(),
        }
    }
}

impl PrintDriver {
    pub fn new(config: DriverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            locks: DeviceLocks::new(),
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn locks(&self) -> &DeviceLocks {
        &self.locks
    }

    /// Read the status register once.
    #[instrument(skip(self))]
    pub async fn status(&self, addr: &str) -> Result<Status> {
        let device = resolve(addr, self.config.control_timeout()).await?;
        let status = self.control(device).get_status().await?;
        info!(
            printing = status.is_printing(),
            idle = status.is_idle(),
            tape = %status.tape_type(),
            "printer status"
        );
        Ok(status)
    }

    /// Print `source` on the device at `addr` (`host:port`).
    pub async fn print<S>(&self, source: &S, addr: &str) -> Result<PrintReport>
    where
        S: RasterImageSource + Sync + ?Sized,
    {
        self.print_with_cancel(source, addr, std::future::pending())
            .await
    }

    /// Like [`print`](Self::print), but stops waiting for completion when
    /// `cancel` resolves. The device is still unlocked; the call then
    /// returns [`TapewerkError::Cancelled`].
    pub async fn print_with_cancel<S, C>(
        &self,
        source: &S,
        addr: &str,
        cancel: C,
    ) -> Result<PrintReport>
    where
        S: RasterImageSource + Sync + ?Sized,
        C: Future<Output = ()>,
    {
        let job = PrintRequest::build(source)?;
        let device = resolve(addr, self.config.control_timeout()).await?;
        let _guard = self
            .locks
            .try_acquire(device)
            .ok_or_else(|| TapewerkError::Busy(device.to_string()))?;

        let mut session = PrintSession::new(device, &self.config, job.width());
        let span = info_span!("print_session", session = %session.id, device = %device);

        async move {
            info!(
                width = job.width(),
                columns = job.columns(),
                bytes = job.len(),
                "starting print session"
            );
            match session.run(&job, cancel).await {
                Ok(tape) => {
                    session.enter(SessionState::Done);
                    let report = PrintReport {
                        session_id: session.id,
                        device,
                        tape,
                        columns: job.columns(),
                        job_bytes: job.len(),
                        started_at: session.started_at,
                        finished_at: Utc::now(),
                    };
                    info!(
                        elapsed_ms = report.elapsed().num_milliseconds(),
                        "print session finished"
                    );
                    Ok(report)
                }
                Err(err) => {
                    warn!(step = ?session.state, error = %err, "print session failed");
                    session.enter(SessionState::Error);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn control(&self, device: SocketAddr) -> ControlClient {
        ControlClient::new(device, self.config.control_timeout(), self.config.framing)
    }
}

/// State carried through one run of the orchestrator.
struct PrintSession<'a> {
    id: SessionId,
    state: SessionState,
    control: ControlClient,
    data_addr: SocketAddr,
    width: u16,
    config: &'a DriverConfig,
    started_at: chrono::DateTime<Utc>,
}

impl<'a> PrintSession<'a> {
    fn new(device: SocketAddr, config: &'a DriverConfig, width: u16) -> Self {
        let data_addr = SocketAddr::new(device.ip(), config.data_port.unwrap_or(device.port()));
        Self {
            id: SessionId::new(),
            state: SessionState::Idle,
            control: ControlClient::new(device, config.control_timeout(), config.framing),
            data_addr,
            width,
            config,
            started_at: Utc::now(),
        }
    }

    fn enter(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    async fn settle(&self) {
        let delay = self.config.settle_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Steps 1 to 8. Returns the tape that was loaded.
    async fn run<C>(&mut self, job: &PrintRequest, cancel: C) -> Result<TapeType>
    where
        C: Future<Output = ()>,
    {
        let status = self.control.get_status().await?;
        if !status.is_idle() {
            return Err(TapewerkError::NotIdle(status));
        }
        let tape = status.tape_type();
        if self.width > tape.width_dots() {
            return Err(TapewerkError::Capacity {
                requested: self.width,
                available: tape.width_dots(),
                tape,
            });
        }
        debug!(tape = %tape, "printer idle");

        self.enter(SessionState::Locking);
        self.control
            .lock()
            .await
            .map_err(|e| TapewerkError::Lock(Box::new(e)))?;
        self.settle().await;

        self.enter(SessionState::Connecting);
        let mut channel =
            DataChannel::connect(self.data_addr, self.config.data_connect_timeout()).await?;
        self.settle().await;

        if let Err(e) = self.control.start_print().await {
            channel.abandon();
            return Err(TapewerkError::Start(Box::new(e)));
        }
        self.settle().await;

        self.enter(SessionState::Sending);
        let head = &job.as_bytes()[..job.len().min(64)];
        debug!(bytes = job.len(), head = %hex::encode(head), "sending print data");
        if let Err(e) = channel
            .send(job.as_bytes(), self.config.data_write_timeout())
            .await
        {
            channel.abandon();
            return Err(e);
        }
        self.settle().await;
        channel.close().await?;
        self.settle().await;

        self.enter(SessionState::WaitingCompletion);
        let control = &self.control;
        let outcome = poll_until(
            self.config.poll_interval(),
            self.config.completion_timeout(),
            cancel,
            move || async move {
                let status = control.get_status().await?;
                Ok((!status.is_printing()).then_some(status))
            },
        )
        .await
        .map_err(|e| TapewerkError::StatusPoll(Box::new(e)))?;

        match outcome {
            PollOutcome::Ready(_) => {}
            PollOutcome::TimedOut => {
                return Err(TapewerkError::PrintTimeout(self.config.completion_timeout()));
            }
            PollOutcome::Cancelled => {
                info!("cancelled while waiting for completion, unlocking");
                self.control
                    .unlock()
                    .await
                    .map_err(|e| TapewerkError::Unlock(Box::new(e)))?;
                return Err(TapewerkError::Cancelled);
            }
        }

        self.control
            .unlock()
            .await
            .map_err(|e| TapewerkError::Unlock(Box::new(e)))?;
        Ok(tape)
    }
}

/// Resolve `host:port` within `timeout`, preferring IPv4 like the device
/// firmware does.
async fn resolve(addr: &str, timeout: Duration) -> Result<SocketAddr> {
    resolve_with(addr, timeout, tokio::net::lookup_host(addr)).await
}

async fn resolve_with<L, I>(addr: &str, timeout: Duration, lookup: L) -> Result<SocketAddr>
where
    L: Future<Output = std::io::Result<I>>,
    I: Iterator<Item = SocketAddr>,
{
    let candidates: Vec<SocketAddr> = tokio::time::timeout(timeout, lookup)
        .await
        .map_err(|_| {
            TapewerkError::Connectivity(format!("resolve {addr}: timed out after {timeout:?}"))
        })?
        .map_err(|e| TapewerkError::Connectivity(format!("resolve {addr}: {e}")))?
        .collect();
    candidates
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| TapewerkError::Connectivity(format!("resolve {addr}: no addresses")))
}
