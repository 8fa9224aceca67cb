// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deadline-bounded, cancellable polling.
//
// Waiting for the device to reach some state is always the same loop: ask,
// sleep, ask again, give up at a deadline or when the caller cancels.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use tapewerk_core::error::Result;

/// How a [`poll_until`] call ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe produced a value.
    Ready(T),
    /// The deadline passed first.
    TimedOut,
    /// The cancel future resolved first.
    Cancelled,
}

/// Call `probe` now and then every `interval` until it yields `Some`, the
/// `deadline` (measured from the call) passes, or `cancel` resolves.
///
/// A probe error ends the wait immediately and is returned as-is. A probe
/// still running when the deadline passes is abandoned.
pub async fn poll_until<T, P, F, C>(
    interval: Duration,
    deadline: Duration,
    cancel: C,
    mut probe: P,
) -> Result<PollOutcome<T>>
where
    P: FnMut() -> F,
    F: Future<Output = Result<Option<T>>>,
    C: Future<Output = ()>,
{
    let deadline_at = Instant::now() + deadline;
    tokio::pin!(cancel);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        tokio::select! {
            biased;
            _ = &mut cancel => {
                debug!(attempts, "poll cancelled");
                return Ok(PollOutcome::Cancelled);
            }
            _ = tokio::time::sleep_until(deadline_at) => {
                debug!(attempts, "poll deadline passed during probe");
                return Ok(PollOutcome::TimedOut);
            }
            found = probe() => {
                if let Some(value) = found? {
                    debug!(attempts, "poll condition met");
                    return Ok(PollOutcome::Ready(value));
                }
            }
        }

        let now = Instant::now();
        if now >= deadline_at {
            debug!(attempts, "poll deadline passed");
            return Ok(PollOutcome::TimedOut);
        }

        tokio::select! {
            biased;
            _ = &mut cancel => {
                debug!(attempts, "poll cancelled");
                return Ok(PollOutcome::Cancelled);
            }
            _ = tokio::time::sleep(interval.min(deadline_at - now)) => {}
        }
    }
}
