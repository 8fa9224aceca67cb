// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tapewerk Print: UDP control channel, raster and job-stream encoders, TCP
// data channel and the orchestrator that drives a device through one print
// session. Domain types live in `tapewerk-core`.

pub mod control;
pub mod data_channel;
pub mod device_locks;
pub mod printer;
pub mod raster;
pub mod request;
pub mod wait;

#[cfg(test)]
mod mock;

pub use control::{Command, ControlClient};
pub use data_channel::DataChannel;
pub use device_locks::{DeviceGuard, DeviceLocks};
pub use printer::PrintDriver;
pub use raster::{Bitmap, RasterImageSource};
pub use request::PrintRequest;
pub use wait::{PollOutcome, poll_until};
