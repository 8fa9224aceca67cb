// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster encoder.
//
// The print head is a single vertical line of dots across the tape, so the
// image is sent one feed-direction column at a time, last column first.
// Each column command is:
//
//   1b 2e 00 00 00 01   opcode + reserved
//   ww ww               dots across the tape (little-endian u16)
//   ..                  ceil(width / 8) bytes, 8 vertically adjacent dots
//                       per byte, MSB first, unused low bits zero
//
// A single form feed closes the raster payload.

/// Prefix of every column command.
pub const COLUMN_PREFIX: [u8; 6] = [0x1b, 0x2e, 0x00, 0x00, 0x00, 0x01];

/// Terminates the raster payload.
pub const FORM_FEED: u8 = 0x0c;

/// A monochrome bitmap the driver can print.
///
/// Coordinates are in device dots: `feed` runs along the tape
/// (`0..length`), `across` runs across it (`0..width`).
pub trait RasterImageSource {
    /// Dots across the tape.
    fn width(&self) -> u16;

    /// Dots along the feed direction.
    fn length(&self) -> u32;

    /// Straight-alpha RGBA of one dot.
    fn pixel(&self, feed: u32, across: u16) -> [u8; 4];

    /// Whether the dot is printed. Defaults to [`is_ink`] on [`pixel`](Self::pixel).
    fn is_ink(&self, feed: u32, across: u16) -> bool {
        is_ink(self.pixel(feed, across))
    }
}

/// Only fully opaque pure black counts as ink. Anything translucent, even
/// black, stays blank.
pub fn is_ink([r, g, b, a]: [u8; 4]) -> bool {
    a == 0xff && r == 0 && g == 0 && b == 0
}

/// Size in bytes of one column command for a tape `width` dots across.
pub fn column_len(width: u16) -> usize {
    COLUMN_PREFIX.len() + 2 + usize::from(width.div_ceil(8))
}

/// Size in bytes of the full raster payload for `source`.
pub fn raster_len<S: RasterImageSource + ?Sized>(source: &S) -> usize {
    column_len(source.width()) * source.length() as usize + 1
}

/// Append the raster payload for `source` to `out`.
///
/// Reads every dot exactly once, last column first.
pub fn encode_raster<S: RasterImageSource + ?Sized>(source: &S, out: &mut Vec<u8>) {
    out.reserve(raster_len(source));
    for feed in (0..source.length()).rev() {
        encode_column(source, feed, out);
    }
    out.push(FORM_FEED);
}

/// Append the column command for feed position `feed`.
pub fn encode_column<S: RasterImageSource + ?Sized>(source: &S, feed: u32, out: &mut Vec<u8>) {
    let width = source.width();
    out.extend_from_slice(&COLUMN_PREFIX);
    out.extend_from_slice(&width.to_le_bytes());

    let mut packed = 0u8;
    for across in 0..width {
        if source.is_ink(feed, across) {
            packed |= 0x80 >> (across % 8);
        }
        if across % 8 == 7 {
            out.push(packed);
            packed = 0;
        }
    }
    if width % 8 != 0 {
        out.push(packed);
    }
}

/// An in-memory 1-bit bitmap, for labels built in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u16,
    length: u32,
    dots: Vec<bool>,
}

impl Bitmap {
    /// A blank bitmap.
    pub fn new(width: u16, length: u32) -> Self {
        Self {
            width,
            length,
            dots: vec![false; usize::from(width) * length as usize],
        }
    }

    /// Build a bitmap from a predicate over `(feed, across)`.
    pub fn from_fn(width: u16, length: u32, mut ink: impl FnMut(u32, u16) -> bool) -> Self {
        let mut bitmap = Self::new(width, length);
        for feed in 0..length {
            for across in 0..width {
                if ink(feed, across) {
                    bitmap.set(feed, across, true);
                }
            }
        }
        bitmap
    }

    /// Set one dot. Out-of-range coordinates are ignored.
    pub fn set(&mut self, feed: u32, across: u16, ink: bool) {
        if let Some(index) = self.index(feed, across) {
            self.dots[index] = ink;
        }
    }

    pub fn get(&self, feed: u32, across: u16) -> bool {
        self.index(feed, across).is_some_and(|i| self.dots[i])
    }

    fn index(&self, feed: u32, across: u16) -> Option<usize> {
        (feed < self.length && across < self.width)
            .then(|| feed as usize * usize::from(self.width) + usize::from(across))
    }
}

impl RasterImageSource for Bitmap {
    fn width(&self) -> u16 {
        self.width
    }

    fn length(&self) -> u32 {
        self.length
    }

    fn pixel(&self, feed: u32, across: u16) -> [u8; 4] {
        if self.get(feed, across) {
            [0x00, 0x00, 0x00, 0xff]
        } else {
            [0xff, 0xff, 0xff, 0xff]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Source that returns fixed pixels and counts reads.
    struct Pixels {
        width: u16,
        length: u32,
        rgba: fn(u32, u16) -> [u8; 4],
        reads: Cell<usize>,
    }

    impl RasterImageSource for Pixels {
        fn width(&self) -> u16 {
            self.width
        }
        fn length(&self) -> u32 {
            self.length
        }
        fn pixel(&self, feed: u32, across: u16) -> [u8; 4] {
            self.reads.set(self.reads.get() + 1);
            (self.rgba)(feed, across)
        }
    }

    #[test]
    fn two_dot_black_column() {
        let bitmap = Bitmap::from_fn(2, 1, |_, _| true);
        let mut out = Vec::new();
        encode_raster(&bitmap, &mut out);
        assert_eq!(
            out,
            vec![0x1b, 0x2e, 0x00, 0x00, 0x00, 0x01, 0x02, 0x00, 0b1100_0000, FORM_FEED]
        );
    }

    #[test]
    fn payload_size_matches_dimensions() {
        for (width, length) in [(1u16, 1u32), (7, 3), (8, 2), (9, 5), (72, 10), (384, 4)] {
            let bitmap = Bitmap::new(width, length);
            let mut out = Vec::new();
            encode_raster(&bitmap, &mut out);
            let column = 6 + 2 + usize::from(width).div_ceil(8);
            assert_eq!(column_len(width), column);
            assert_eq!(out.len(), column * length as usize + 1, "{width}x{length}");
            assert_eq!(out.len(), raster_len(&bitmap));
            assert_eq!(out.last(), Some(&FORM_FEED));
            for chunk in out[..out.len() - 1].chunks(column) {
                assert_eq!(&chunk[..6], &COLUMN_PREFIX);
                assert_eq!(&chunk[6..8], &width.to_le_bytes());
            }
        }
    }

    #[test]
    fn columns_are_sent_last_first() {
        // Only the first feed column has ink.
        let bitmap = Bitmap::from_fn(8, 3, |feed, _| feed == 0);
        let mut out = Vec::new();
        encode_raster(&bitmap, &mut out);
        let column = column_len(8);
        assert_eq!(out[8], 0x00);
        assert_eq!(out[column + 8], 0x00);
        assert_eq!(out[2 * column + 8], 0xff);
    }

    #[test]
    fn bits_are_msb_first_with_zero_padding() {
        // width 10: dots 0 and 9 inked.
        let bitmap = Bitmap::from_fn(10, 1, |_, across| across == 0 || across == 9);
        let mut out = Vec::new();
        encode_column(&bitmap, 0, &mut out);
        assert_eq!(&out[8..], &[0b1000_0000, 0b0100_0000]);
    }

    #[test]
    fn only_opaque_black_is_ink() {
        assert!(is_ink([0, 0, 0, 255]));
        assert!(!is_ink([0, 0, 0, 254]));
        assert!(!is_ink([0, 0, 0, 0]));
        assert!(!is_ink([1, 0, 0, 255]));
        assert!(!is_ink([0, 0, 1, 255]));
        assert!(!is_ink([255, 255, 255, 255]));
    }

    #[test]
    fn translucent_black_prints_blank() {
        let source = Pixels {
            width: 8,
            length: 1,
            rgba: |_, across| if across < 4 { [0, 0, 0, 128] } else { [0, 0, 0, 255] },
            reads: Cell::new(0),
        };
        let mut out = Vec::new();
        encode_raster(&source, &mut out);
        assert_eq!(out[8], 0b0000_1111);
    }

    #[test]
    fn every_dot_read_once() {
        let source = Pixels {
            width: 13,
            length: 7,
            rgba: |_, _| [0, 0, 0, 255],
            reads: Cell::new(0),
        };
        let mut out = Vec::new();
        encode_raster(&source, &mut out);
        assert_eq!(source.reads.get(), 13 * 7);
    }

    #[test]
    fn bitmap_ignores_out_of_range() {
        let mut bitmap = Bitmap::new(4, 4);
        bitmap.set(10, 10, true);
        assert!(!bitmap.get(10, 10));
        bitmap.set(3, 3, true);
        assert!(bitmap.get(3, 3));
    }
}
