// SPDX-License-Identifier: GPL-3.0-only

//! Sensor data visualization
//!
//! Pure per-pixel mappings from depth and confidence samples to RGBA. The
//! slice-based functions are the mappings themselves; the `*_frame_*`
//! variants walk a source frame's rows (honoring stride and the optional
//! vertical mirror) and feed them through the same mapping.

pub mod confidence;
pub mod depth;

pub use confidence::{UnknownConfidence, confidence_color, confidence_frame_to_rgba, confidence_to_rgba};
pub use depth::{DepthRange, depth_frame_to_grayscale, depth_gray_level, depth_to_grayscale};

use image::RgbaImage;

use crate::backends::camera::{BackendError, BackendResult, CameraFrame, PixelFormat};

/// Check a source frame against an expected format and destination buffer
fn check_frame(frame: &CameraFrame, expected: PixelFormat, out: &RgbaImage) -> BackendResult<()> {
    if frame.format != expected {
        return Err(BackendError::FormatNotSupported(format!(
            "expected {}, got {}",
            expected, frame.format
        )));
    }
    if out.dimensions() != (frame.width, frame.height) {
        return Err(BackendError::InvalidFrame(format!(
            "destination is {}x{}, frame is {}x{}",
            out.width(),
            out.height(),
            frame.width,
            frame.height
        )));
    }
    frame.validate()
}

/// Visit each (source row, destination row) pair
fn for_each_row<F>(frame: &CameraFrame, out: &mut RgbaImage, flip_vertical: bool, mut f: F)
where
    F: FnMut(&[u8], &mut [u8]),
{
    let height = frame.height as usize;
    let out_stride = frame.width as usize * 4;
    let dst: &mut [u8] = &mut *out;

    for (y, src_row) in frame.rows().enumerate() {
        let dst_y = if flip_vertical { height - 1 - y } else { y };
        f(src_row, &mut dst[dst_y * out_stride..(dst_y + 1) * out_stride]);
    }
}

/// Check that a sample slice covers the destination exactly
fn check_len(samples: usize, out: &RgbaImage) -> BackendResult<()> {
    let pixels = out.width() as usize * out.height() as usize;
    if samples != pixels {
        return Err(BackendError::InvalidFrame(format!(
            "{} samples for a {}x{} buffer",
            samples,
            out.width(),
            out.height()
        )));
    }
    Ok(())
}
