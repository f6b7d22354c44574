// SPDX-License-Identifier: GPL-3.0-only

//! Depth confidence classification
//!
//! Confidence maps carry one category code per depth sample:
//! 0 = low (red), 1 = medium (green), 2 = high (blue).

use image::RgbaImage;

use super::{check_frame, check_len, for_each_row};
use crate::backends::camera::{BackendResult, CameraFrame, PixelFormat};
use crate::constants::confidence::{DEFAULT_SENTINEL, HIGH, LOW, MEDIUM};

/// What to write for codes outside 0..=2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownConfidence {
    /// Leave the destination pixel as it was
    Preserve,
    /// Write a fixed color
    Sentinel([u8; 4]),
}

impl Default for UnknownConfidence {
    fn default() -> Self {
        Self::Sentinel(DEFAULT_SENTINEL)
    }
}

/// Palette color for a known confidence code
#[inline]
pub fn confidence_color(code: u8) -> Option<[u8; 4]> {
    match code {
        0 => Some(LOW),
        1 => Some(MEDIUM),
        2 => Some(HIGH),
        _ => None,
    }
}

#[inline]
fn classify(code: u8, unknown: UnknownConfidence, dst: &mut [u8]) {
    match (confidence_color(code), unknown) {
        (Some(color), _) | (None, UnknownConfidence::Sentinel(color)) => dst.copy_from_slice(&color),
        (None, UnknownConfidence::Preserve) => {}
    }
}

/// Classify a tightly packed code buffer into `out`
pub fn confidence_to_rgba(
    codes: &[u8],
    unknown: UnknownConfidence,
    out: &mut RgbaImage,
) -> BackendResult<()> {
    check_len(codes.len(), out)?;
    let dst: &mut [u8] = &mut *out;
    for (px, &code) in dst.chunks_exact_mut(4).zip(codes) {
        classify(code, unknown, px);
    }
    Ok(())
}

/// Classify a `Confidence8` frame into `out`
pub fn confidence_frame_to_rgba(
    frame: &CameraFrame,
    unknown: UnknownConfidence,
    out: &mut RgbaImage,
    flip_vertical: bool,
) -> BackendResult<()> {
    check_frame(frame, PixelFormat::Confidence8, out)?;
    for_each_row(frame, out, flip_vertical, |src, dst| {
        for (px, &code) in dst.chunks_exact_mut(4).zip(src) {
            classify(code, unknown, px);
        }
    });
    Ok(())
}
