// SPDX-License-Identifier: GPL-3.0-only
//! Camera pixel format conversion to RGBA
//!
//! Converts color frames in the formats sensors commonly deliver into the
//! RGBA layout the display buffers use. All converters honor the frame's row
//! stride and write straight into the destination buffer.

use image::RgbaImage;

use super::types::{BackendError, BackendResult, CameraFrame, PixelFormat};

/// Convert a color frame into `out`
///
/// `out` must already have the frame's dimensions. With `flip_vertical` the
/// first source row lands at the bottom of the output.
pub fn convert_to_rgba(
    frame: &CameraFrame,
    out: &mut RgbaImage,
    flip_vertical: bool,
) -> BackendResult<()> {
    if out.dimensions() != (frame.width, frame.height) {
        return Err(BackendError::InvalidFrame(format!(
            "destination is {}x{}, frame is {}x{}",
            out.width(),
            out.height(),
            frame.width,
            frame.height
        )));
    }
    frame.validate()?;

    let width = frame.width as usize;
    let height = frame.height as usize;
    let out_stride = width * 4;
    let dst: &mut [u8] = &mut *out;

    for y in 0..height {
        let dst_y = if flip_vertical { height - 1 - y } else { y };
        let dst_row = &mut dst[dst_y * out_stride..(dst_y + 1) * out_stride];
        let src_start = y * frame.stride as usize;

        match frame.format {
            PixelFormat::RGBA => {
                dst_row.copy_from_slice(&frame.data[src_start..src_start + out_stride]);
            }
            PixelFormat::BGRA => {
                let src = &frame.data[src_start..src_start + out_stride];
                for (d, s) in dst_row.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                    d.copy_from_slice(&[s[2], s[1], s[0], s[3]]);
                }
            }
            PixelFormat::RGB24 => {
                let src = &frame.data[src_start..src_start + width * 3];
                for (d, s) in dst_row.chunks_exact_mut(4).zip(src.chunks_exact(3)) {
                    d.copy_from_slice(&[s[0], s[1], s[2], 255]);
                }
            }
            PixelFormat::Gray8 => {
                let src = &frame.data[src_start..src_start + width];
                for (d, &g) in dst_row.chunks_exact_mut(4).zip(src) {
                    d.copy_from_slice(&[g, g, g, 255]);
                }
            }
            PixelFormat::YUYV => {
                // Y0 U Y1 V - each 4-byte group encodes 2 pixels
                let src = &frame.data[src_start..src_start + width * 2];
                for (d, s) in dst_row.chunks_exact_mut(8).zip(src.chunks_exact(4)) {
                    let (r0, g0, b0) = yuv_to_rgb(s[0], s[1], s[3]);
                    let (r1, g1, b1) = yuv_to_rgb(s[2], s[1], s[3]);
                    d.copy_from_slice(&[r0, g0, b0, 255, r1, g1, b1, 255]);
                }
            }
            PixelFormat::NV12 => {
                let stride = frame.stride as usize;
                let uv_plane = stride * height;
                let luma = &frame.data[src_start..src_start + width];
                let uv_start = uv_plane + (y / 2) * stride;
                let uv = &frame.data[uv_start..uv_start + width];
                for (x, d) in dst_row.chunks_exact_mut(4).enumerate() {
                    let uv_x = x & !1;
                    let (r, g, b) = yuv_to_rgb(luma[x], uv[uv_x], uv[uv_x + 1]);
                    d.copy_from_slice(&[r, g, b, 255]);
                }
            }
            PixelFormat::DepthF32 | PixelFormat::Confidence8 => {
                return Err(BackendError::FormatNotSupported(format!(
                    "{} is not a color format",
                    frame.format
                )));
            }
        }
    }

    Ok(())
}

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

/// Convert RGB (BT.601) to YUV, used to build test patterns in camera formats
pub fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let u = (b - y) / 1.772 + 128.0;
    let v = (r - y) / 1.402 + 128.0;
    (
        y.round().clamp(0.0, 255.0) as u8,
        u.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(frame: &CameraFrame, flip: bool) -> RgbaImage {
        let mut out = RgbaImage::new(frame.width, frame.height);
        convert_to_rgba(frame, &mut out, flip).unwrap();
        out
    }

    #[test]
    fn test_bgra_swaps_channels() {
        let frame = CameraFrame::packed(1, 1, PixelFormat::BGRA, vec![10, 20, 30, 40], 0);
        assert_eq!(convert(&frame, false).into_raw(), vec![30, 20, 10, 40]);
    }

    #[test]
    fn test_rgb24_adds_alpha() {
        let frame =
            CameraFrame::packed(2, 1, PixelFormat::RGB24, vec![255, 128, 64, 0, 0, 0], 0);
        assert_eq!(
            convert(&frame, false).into_raw(),
            vec![255, 128, 64, 255, 0, 0, 0, 255]
        );
    }

    #[test]
    fn test_gray8_with_stride_and_flip() {
        let mut frame = CameraFrame::packed(1, 2, PixelFormat::Gray8, vec![10, 0, 20], 0);
        frame.stride = 2;
        let out = convert(&frame, true);
        assert_eq!(out.get_pixel(0, 0).0, [20, 20, 20, 255]);
        assert_eq!(out.get_pixel(0, 1).0, [10, 10, 10, 255]);
    }

    #[test]
    fn test_yuyv_white() {
        // Pure white in YUV (Y=255, U=128, V=128)
        let frame = CameraFrame::packed(2, 1, PixelFormat::YUYV, vec![255, 128, 255, 128], 0);
        let out = convert(&frame, false);
        for px in out.pixels() {
            assert!(px.0[0] > 250 && px.0[1] > 250 && px.0[2] > 250);
            assert_eq!(px.0[3], 255);
        }
    }

    #[test]
    fn test_nv12_primary_roundtrip_is_close() {
        let (y, u, v) = rgb_to_yuv(200, 40, 40);
        // 2x2 Y plane + one UV pair
        let frame = CameraFrame::packed(2, 2, PixelFormat::NV12, vec![y, y, y, y, u, v, 0, 0], 0);
        let out = convert(&frame, false);
        let px = out.get_pixel(1, 1).0;
        assert!((px[0] as i32 - 200).abs() <= 3);
        assert!((px[1] as i32 - 40).abs() <= 3);
        assert!((px[2] as i32 - 40).abs() <= 3);
    }

    #[test]
    fn test_rejects_depth_format() {
        let frame = CameraFrame::packed(1, 1, PixelFormat::DepthF32, vec![0; 4], 0);
        let mut out = RgbaImage::new(1, 1);
        assert!(matches!(
            convert_to_rgba(&frame, &mut out, false),
            Err(BackendError::FormatNotSupported(_))
        ));
    }

    #[test]
    fn test_rejects_mismatched_destination() {
        let frame = CameraFrame::packed(2, 2, PixelFormat::RGBA, vec![0; 16], 0);
        let mut out = RgbaImage::new(1, 1);
        assert!(convert_to_rgba(&frame, &mut out, false).is_err());
    }
}
