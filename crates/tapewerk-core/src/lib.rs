// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tapewerk: status codec, core types and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod status;
pub mod types;

pub use config::{DriverConfig, ResponseFraming};
pub use error::TapewerkError;
pub use status::{Status, TapeType};
pub use types::*;
