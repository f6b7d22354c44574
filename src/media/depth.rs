// SPDX-License-Identifier: GPL-3.0-only

//! Depth to grayscale visualization
//!
//! Depth samples are meters. Values between the near and far clip map
//! linearly to black..white; values outside are clamped. Non-finite samples
//! (sensors report NaN/inf where there was no return) render as black.

use std::borrow::Cow;

use image::RgbaImage;

use super::{check_frame, check_len, for_each_row};
use crate::backends::camera::{BackendResult, CameraFrame, PixelFormat};
use crate::constants::depth::{RAW_VIEW_FAR_M, RAW_VIEW_NEAR_M};
use crate::errors::ConfigError;

/// Near/far clip pair with `near < far`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthRange {
    near: f32,
    far: f32,
}

impl DepthRange {
    /// Range shown by the raw depth view
    pub const RAW_VIEW: DepthRange = DepthRange {
        near: RAW_VIEW_NEAR_M,
        far: RAW_VIEW_FAR_M,
    };

    pub fn new(near: f32, far: f32) -> Result<Self, ConfigError> {
        // The span must also be finite or every ratio becomes NaN
        if !near.is_finite() || !far.is_finite() || near >= far || !(far - near).is_finite() {
            return Err(ConfigError::InvalidDepthRange { near, far });
        }
        Ok(Self { near, far })
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }
}

/// Gray level in [0, 1] for a depth sample
#[inline]
pub fn depth_gray_level(depth: f32, range: DepthRange) -> f32 {
    if !depth.is_finite() {
        return 0.0;
    }
    let level = (depth - range.near) / (range.far - range.near);
    if level.is_nan() {
        return 0.0;
    }
    level.clamp(0.0, 1.0)
}

#[inline]
fn gray_pixel(depth: f32, range: DepthRange) -> [u8; 4] {
    let g = (depth_gray_level(depth, range) * 255.0).round() as u8;
    [g, g, g, 255]
}

/// Map a tightly packed depth buffer into `out`
///
/// `depth` must hold exactly one sample per destination pixel.
pub fn depth_to_grayscale(depth: &[f32], range: DepthRange, out: &mut RgbaImage) -> BackendResult<()> {
    check_len(depth.len(), out)?;
    for (px, &d) in out.pixels_mut().zip(depth) {
        px.0 = gray_pixel(d, range);
    }
    Ok(())
}

/// Map a `DepthF32` frame into `out`
pub fn depth_frame_to_grayscale(
    frame: &CameraFrame,
    range: DepthRange,
    out: &mut RgbaImage,
    flip_vertical: bool,
) -> BackendResult<()> {
    check_frame(frame, PixelFormat::DepthF32, out)?;
    for_each_row(frame, out, flip_vertical, |src, dst| {
        let samples = depth_samples(src);
        for (d, &depth) in dst.chunks_exact_mut(4).zip(samples.iter()) {
            d.copy_from_slice(&gray_pixel(depth, range));
        }
    });
    Ok(())
}

/// Reinterpret a row of native-endian f32 bytes, copying only if misaligned
fn depth_samples(row: &[u8]) -> Cow<'_, [f32]> {
    match bytemuck::try_cast_slice::<u8, f32>(row) {
        Ok(samples) => Cow::Borrowed(samples),
        Err(_) => Cow::Owned(
            row.chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<f32>)
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(near: f32, far: f32) -> DepthRange {
        DepthRange::new(near, far).unwrap()
    }

    fn depth_bytes(values: &[f32]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    #[test]
    fn test_range_validation() {
        assert!(DepthRange::new(0.5, 2.5).is_ok());
        assert!(DepthRange::new(2.5, 2.5).is_err());
        assert!(DepthRange::new(3.0, 1.0).is_err());
        assert!(DepthRange::new(f32::NAN, 1.0).is_err());
        assert!(DepthRange::new(0.0, f32::INFINITY).is_err());
        // Finite bounds whose span overflows
        assert!(DepthRange::new(-3e38, 3e38).is_err());
        assert!(DepthRange::new(-f32::MAX, 0.0).is_ok());
    }

    #[test]
    fn test_wide_range_endpoints() {
        let r = range(-1.5e38, 1.5e38);
        assert_eq!(depth_gray_level(-1.5e38, r), 0.0);
        assert_eq!(depth_gray_level(1.5e38, r), 1.0);
        assert!((depth_gray_level(0.0, r) - 0.5).abs() < 1e-6);

        // A range that bypassed `new` still stays in [0, 1]
        let unchecked = DepthRange { near: -3e38, far: 3e38 };
        assert_eq!(depth_gray_level(3e38, unchecked), 0.0);
    }

    #[test]
    fn test_endpoints() {
        let r = range(0.5, 2.5);
        assert_eq!(depth_gray_level(0.5, r), 0.0);
        assert_eq!(depth_gray_level(2.5, r), 1.0);
    }

    #[test]
    fn test_reference_scenario() {
        let r = range(0.5, 2.5);
        let levels: Vec<f32> = [0.5, 1.5, 2.5, 1.0]
            .iter()
            .map(|&d| depth_gray_level(d, r))
            .collect();
        assert_eq!(levels[0], 0.0);
        assert!((levels[1] - 0.5).abs() < 1e-6);
        assert_eq!(levels[2], 1.0);
        assert!((levels[3] - 0.25).abs() < 1e-6);

        let mut out = RgbaImage::new(2, 2);
        depth_to_grayscale(&[0.5, 1.5, 2.5, 1.0], r, &mut out).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [128, 128, 128, 255]);
        assert_eq!(out.get_pixel(0, 1).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(1, 1).0, [64, 64, 64, 255]);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let r = range(1.0, 2.0);
        assert_eq!(depth_gray_level(0.2, r), 0.0);
        assert_eq!(depth_gray_level(-5.0, r), 0.0);
        assert_eq!(depth_gray_level(9.0, r), 1.0);
    }

    #[test]
    fn test_non_finite_is_black() {
        let r = range(1.0, 2.0);
        assert_eq!(depth_gray_level(f32::NAN, r), 0.0);
        assert_eq!(depth_gray_level(f32::INFINITY, r), 0.0);
        assert_eq!(depth_gray_level(f32::NEG_INFINITY, r), 0.0);
    }

    #[test]
    fn test_monotonic() {
        let r = range(0.3, 4.0);
        let mut prev = -1.0f32;
        for i in 0..=500 {
            let d = i as f32 * 0.01;
            let v = depth_gray_level(d, r);
            assert!(v >= prev, "not monotonic at {}", d);
            prev = v;
        }
    }

    #[test]
    fn test_uniform_input_uniform_output() {
        let mut out = RgbaImage::new(3, 3);
        depth_to_grayscale(&[1.7; 9], range(0.5, 2.5), &mut out).unwrap();
        let first = *out.get_pixel(0, 0);
        assert!(out.pixels().all(|p| *p == first));
    }

    #[test]
    fn test_length_mismatch() {
        let mut out = RgbaImage::new(2, 2);
        assert!(depth_to_grayscale(&[0.0; 3], range(0.0, 1.0), &mut out).is_err());
    }

    #[test]
    fn test_frame_with_flip() {
        let frame = CameraFrame::packed(1, 2, PixelFormat::DepthF32, depth_bytes(&[0.0, 1.0]), 0);
        let mut out = RgbaImage::new(1, 2);
        depth_frame_to_grayscale(&frame, DepthRange::RAW_VIEW, &mut out, true).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(0, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_misaligned_rows() {
        // Stride of 6 bytes puts the second row off a 4-byte boundary
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.25f32.to_ne_bytes());
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(&0.75f32.to_ne_bytes());
        let mut frame = CameraFrame::packed(1, 2, PixelFormat::DepthF32, bytes, 0);
        frame.stride = 6;

        let mut out = RgbaImage::new(1, 2);
        depth_frame_to_grayscale(&frame, DepthRange::RAW_VIEW, &mut out, false).unwrap();
        assert_eq!(out.get_pixel(0, 0).0[0], 64);
        assert_eq!(out.get_pixel(0, 1).0[0], 191);
    }

    #[test]
    fn test_rejects_color_frame() {
        let frame = CameraFrame::packed(1, 1, PixelFormat::RGBA, vec![0; 4], 0);
        let mut out = RgbaImage::new(1, 1);
        assert!(depth_frame_to_grayscale(&frame, DepthRange::RAW_VIEW, &mut out, false).is_err());
    }
}
