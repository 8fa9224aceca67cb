// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image adapter. A label is drawn as an ordinary image whose x axis runs
// along the tape and whose y axis runs across it.

use image::{DynamicImage, RgbaImage};
use tapewerk_core::error::{Result, TapewerkError};
use tapewerk_print::raster::RasterImageSource;
use tracing::{debug, info, instrument};

/// A decoded label image ready to be rastered.
///
/// Image width becomes the feed-direction length, image height becomes the
/// printable width across the tape. Only opaque black pixels print.
///
/// ```ignore
/// let label = TapeImage::open("label.png")?;
/// driver.print(&label, "192.168.1.40:9100").await?;
/// ```
#[derive(Debug, Clone)]
pub struct TapeImage {
    image: RgbaImage,
}

impl TapeImage {
    /// Load and decode an image file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            TapewerkError::InvalidImage(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Label image loaded");
        Self::from_dynamic(img)
    }

    /// Decode an in-memory PNG, BMP, etc.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            TapewerkError::InvalidImage(format!("failed to decode image: {}", err))
        })?;
        Self::from_dynamic(img)
    }

    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        Self::from_rgba(image.into_rgba8())
    }

    /// Wrap an RGBA buffer. Rejects images taller than a raster column can
    /// describe.
    pub fn from_rgba(image: RgbaImage) -> Result<Self> {
        if image.height() > u32::from(u16::MAX) {
            return Err(TapewerkError::InvalidImage(format!(
                "image height {} exceeds {} dots",
                image.height(),
                u16::MAX
            )));
        }
        debug!(
            length = image.width(),
            width = image.height(),
            "Label image adapted"
        );
        Ok(Self { image })
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }
}

impl RasterImageSource for TapeImage {
    fn width(&self) -> u16 {
        // Checked on construction.
        u16::try_from(self.image.height()).unwrap_or(u16::MAX)
    }

    fn length(&self) -> u32 {
        self.image.width()
    }

    fn pixel(&self, feed: u32, across: u16) -> [u8; 4] {
        self.image.get_pixel(feed, u32::from(across)).0
    }
}
