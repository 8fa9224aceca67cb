// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status register codec.
//
// The printer reports its state as an opaque 20-byte register. Only a few
// bytes are understood: byte 1 flags an active print, byte 3 identifies the
// loaded tape cassette, and the whole register is compared against a fixed
// idle template to decide whether a job may start.

use serde::{Deserialize, Serialize};

/// Size of the status register in bytes.
pub const STATUS_LEN: usize = 20;

/// Offset of the "printing" flag.
const PRINTING_OFFSET: usize = 1;
/// Value of the printing flag while a job is on the print head.
const PRINTING_VALUE: u8 = 0x02;
/// Offset of the tape cassette code.
const TAPE_TYPE_OFFSET: usize = 3;
/// Offset of the byte carrying the transient bit masked out by [`Status::is_idle`].
const FLICKER_OFFSET: usize = 13;

/// Register contents of an idle printer with bytes 3 and bit 0 of byte 13
/// forced to their masked values. Captured from the device.
pub const IDLE_TEMPLATE: [u8; STATUS_LEN] = [
    0x14, 0x00, 0x00, 0xff, //
    0x00, 0x00, 0x00, 0x00, //
    0x40, 0x00, 0x00, 0x00, //
    0x00, 0x01, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00,
];

/// A snapshot of the 20-byte device status register.
///
/// Always exactly [`STATUS_LEN`] bytes; any other length is rejected by
/// [`Status::from_bytes`] and must be treated as a protocol error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status([u8; STATUS_LEN]);

impl Status {
    pub const fn new(raw: [u8; STATUS_LEN]) -> Self {
        Self(raw)
    }

    /// Parse a register from a response body. Returns `None` unless the body
    /// is exactly [`STATUS_LEN`] bytes long.
    pub fn from_bytes(body: &[u8]) -> Option<Self> {
        let raw: [u8; STATUS_LEN] = body.try_into().ok()?;
        Some(Self(raw))
    }

    /// Raw register bytes.
    pub fn as_bytes(&self) -> &[u8; STATUS_LEN] {
        &self.0
    }

    /// Whether the print head is currently busy with a job.
    pub fn is_printing(&self) -> bool {
        self.0[PRINTING_OFFSET] == PRINTING_VALUE
    }

    /// Whether the device is ready to accept a job.
    ///
    /// The tape code varies with the loaded cassette and bit 0 of byte 13
    /// toggles on its own, so both are masked before the register is
    /// compared byte-for-byte with [`IDLE_TEMPLATE`].
    pub fn is_idle(&self) -> bool {
        let mut masked = self.0;
        masked[TAPE_TYPE_OFFSET] = 0xff;
        masked[FLICKER_OFFSET] |= 0x01;
        masked == IDLE_TEMPLATE
    }

    /// The cassette currently loaded.
    pub fn tape_type(&self) -> TapeType {
        TapeType::from_code(self.0[TAPE_TYPE_OFFSET])
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Tape cassette reported in byte 3 of the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TapeType {
    /// No cassette, or the device could not identify it (code 0).
    Unknown,
    Width6mm,
    Width9mm,
    Width12mm,
    Width18mm,
    Width24mm,
    Width36mm,
    Width4mm,
    /// A code outside the known table.
    Unrecognized(u8),
}

impl TapeType {
    /// Decode a status byte.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::Unknown,
            0x01 => Self::Width6mm,
            0x02 => Self::Width9mm,
            0x03 => Self::Width12mm,
            0x04 => Self::Width18mm,
            0x05 => Self::Width24mm,
            0x06 => Self::Width36mm,
            0x07 => Self::Width4mm,
            other => Self::Unrecognized(other),
        }
    }

    /// The status byte for this tape type.
    pub fn code(&self) -> u8 {
        match self {
            Self::Unknown => 0x00,
            Self::Width6mm => 0x01,
            Self::Width9mm => 0x02,
            Self::Width12mm => 0x03,
            Self::Width18mm => 0x04,
            Self::Width24mm => 0x05,
            Self::Width36mm => 0x06,
            Self::Width4mm => 0x07,
            Self::Unrecognized(code) => *code,
        }
    }

    /// Printable width across the tape, in device dots. Zero when the tape
    /// is unknown, so every job is rejected.
    ///
    /// 4mm and 36mm both report 384 dots; that is what the device does.
    pub fn width_dots(&self) -> u16 {
        match self {
            Self::Width6mm => 72,
            Self::Width9mm => 108,
            Self::Width12mm => 144,
            Self::Width18mm => 216,
            Self::Width24mm => 288,
            Self::Width36mm => 384,
            Self::Width4mm => 384,
            Self::Unknown | Self::Unrecognized(_) => 0,
        }
    }
}

impl std::fmt::Display for TapeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown tape"),
            Self::Width6mm => f.write_str("6mm tape"),
            Self::Width9mm => f.write_str("9mm tape"),
            Self::Width12mm => f.write_str("12mm tape"),
            Self::Width18mm => f.write_str("18mm tape"),
            Self::Width24mm => f.write_str("24mm tape"),
            Self::Width36mm => f.write_str("36mm tape"),
            Self::Width4mm => f.write_str("4mm tape"),
            Self::Unrecognized(code) => write!(f, "tape type {code:#04x}"),
        }
    }
}
