// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print request builder (data channel job stream).
//
// Setup and teardown commands are framed as
//
//   1b 7b <len> <cmd> <payload..> <sum> 7d
//
// where `len` counts cmd + payload + sum + the closing brace, and `sum` is
// the low byte of cmd + payload. Apart from the tape length, every frame is
// a literal captured from the vendor driver (sequence as documented by the
// sr5900p project, github.com/hikalium/sr5900p). Their effect beyond what
// was observed is unknown; names follow the opcode and observed behaviour.

use std::io::Write;

use tracing::debug;

use tapewerk_core::error::{Result, TapewerkError};

use crate::raster::{self, RasterImageSource};

pub const ESC: u8 = 0x1b;
pub const FRAME_OPEN: u8 = b'{';
pub const FRAME_CLOSE: u8 = b'}';

/// Opcode of the tape length frame.
pub const TAPE_LENGTH_CMD: u8 = b'L';

/// Dots added to the image length in the tape length frame.
pub const TAPE_LENGTH_MARGIN: u32 = 4;

/// `@`: resets the print mode. Opens and closes every job.
pub const RESET: [u8; 6] = [0x1b, 0x7b, 0x03, 0x40, 0x40, 0x7d];
/// `{`: print mode configuration.
pub const PRINT_MODE: [u8; 10] = [0x1b, 0x7b, 0x07, 0x7b, 0x00, 0x00, 0x53, 0x54, 0x22, 0x7d];
/// `C`: margin configuration.
pub const MARGINS: [u8; 10] = [0x1b, 0x7b, 0x07, 0x43, 0x02, 0x02, 0x01, 0x01, 0x49, 0x7d];
/// `D`: print density.
pub const DENSITY: [u8; 7] = [0x1b, 0x7b, 0x04, 0x44, 0x05, 0x49, 0x7d];
/// `G`: generic mode set, no payload.
pub const MODE_SET: [u8; 6] = [0x1b, 0x7b, 0x03, 0x47, 0x47, 0x7d];
/// `T`: cut configuration.
pub const CUT: [u8; 8] = [0x1b, 0x7b, 0x05, 0x54, 0x2a, 0x00, 0x7e, 0x7d];
/// `H`: feed configuration.
pub const FEED: [u8; 7] = [0x1b, 0x7b, 0x04, 0x48, 0x05, 0x4d, 0x7d];
/// `s`: raster data follows.
pub const RASTER_START: [u8; 7] = [0x1b, 0x7b, 0x04, 0x73, 0x00, 0x73, 0x7d];

/// Frames sent before the tape length, in order.
pub const SETUP_FRAMES: [&[u8]; 5] = [&RESET, &PRINT_MODE, &MARGINS, &DENSITY, &MODE_SET];
/// Frames sent between the tape length and the raster payload, in order.
pub const PRE_RASTER_FRAMES: [&[u8]; 3] = [&CUT, &FEED, &RASTER_START];

/// Frame checksum: low byte of the opcode plus the payload.
pub fn checksum(cmd: u8, payload: &[u8]) -> u8 {
    payload.iter().fold(cmd, |sum, b| sum.wrapping_add(*b))
}

/// Encode one `{ … }` frame.
///
/// The length field is one byte, so payloads longer than 252 bytes are
/// rejected.
pub fn frame(cmd: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let len = u8::try_from(payload.len() + 3).map_err(|_| {
        TapewerkError::protocol(
            format!("frame payload of {} bytes does not fit the length field", payload.len()),
            payload,
        )
    })?;
    let mut out = Vec::with_capacity(payload.len() + 6);
    out.extend_from_slice(&[ESC, FRAME_OPEN, len, cmd]);
    out.extend_from_slice(payload);
    out.push(checksum(cmd, payload));
    out.push(FRAME_CLOSE);
    Ok(out)
}

/// Tape length frame: `dots` as a little-endian u32 payload.
pub fn tape_length_frame(dots: u32) -> [u8; 10] {
    let mut out = [0u8; 10];
    out[..4].copy_from_slice(&[ESC, FRAME_OPEN, 0x07, TAPE_LENGTH_CMD]);
    out[4..8].copy_from_slice(&dots.to_le_bytes());
    out[8] = checksum(TAPE_LENGTH_CMD, &out[4..8]);
    out[9] = FRAME_CLOSE;
    out
}

/// The complete byte stream for one job, ready for the data channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintRequest {
    bytes: Vec<u8>,
    width: u16,
    columns: u32,
}

impl PrintRequest {
    /// Encode `source` into a job stream.
    ///
    /// Empty images are rejected: the device has no way to print zero
    /// columns and the tape length would be nonsense.
    pub fn build<S: RasterImageSource + ?Sized>(source: &S) -> Result<Self> {
        let width = source.width();
        let columns = source.length();
        if width == 0 || columns == 0 {
            return Err(TapewerkError::InvalidImage(format!(
                "image is {width} dots across and {columns} dots long"
            )));
        }

        let setup_len: usize = SETUP_FRAMES.iter().map(|f| f.len()).sum();
        let pre_len: usize = PRE_RASTER_FRAMES.iter().map(|f| f.len()).sum();
        let mut bytes = Vec::with_capacity(
            setup_len + 10 + pre_len + raster::raster_len(source) + RESET.len(),
        );

        for setup in SETUP_FRAMES {
            bytes.extend_from_slice(setup);
        }
        bytes.extend_from_slice(&tape_length_frame(
            columns.saturating_add(TAPE_LENGTH_MARGIN),
        ));
        for pre in PRE_RASTER_FRAMES {
            bytes.extend_from_slice(pre);
        }
        raster::encode_raster(source, &mut bytes);
        bytes.extend_from_slice(&RESET);

        debug!(width, columns, len = bytes.len(), "built print request");
        Ok(Self {
            bytes,
            width,
            columns,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Dots across the tape the job needs.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Number of raster columns in the job.
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Dump the job stream, e.g. to a file for offline inspection.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writer.write_all(&self.bytes)?;
        writer.flush()
    }
}
