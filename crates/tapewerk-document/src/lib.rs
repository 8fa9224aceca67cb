// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tapewerk-document: turns decoded images into raster sources the print
// driver can encode.

pub mod tape_image;

pub use tape_image::TapeImage;
