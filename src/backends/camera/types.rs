// SPDX-License-Identifier: GPL-3.0-only
// Shared types for frame source abstraction

//! Shared types for frame sources

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Frame data storage
///
/// Sources hand out frames backed by reference-counted bytes so a lease can
/// be created without copying. The monitor converts out of it before the
/// lease is released.
#[derive(Clone)]
pub struct FrameData(Arc<[u8]>);

impl FrameData {
    /// Create FrameData from owned bytes
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        FrameData(Arc::from(bytes.into_boxed_slice()))
    }

    /// Get the length of the frame data in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the frame data is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for FrameData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_vec(bytes)
    }
}

impl std::fmt::Debug for FrameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameData({} bytes)", self.0.len())
    }
}

impl AsRef<[u8]> for FrameData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::Deref for FrameData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// Kind of frame a source can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// Camera color image
    Color,
    /// Environment depth map (meters)
    Depth,
    /// Per-pixel depth confidence codes
    Confidence,
}

impl FrameKind {
    pub const ALL: [FrameKind; 3] = [FrameKind::Color, FrameKind::Depth, FrameKind::Confidence];
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameKind::Color => write!(f, "color"),
            FrameKind::Depth => write!(f, "depth"),
            FrameKind::Confidence => write!(f, "confidence"),
        }
    }
}

/// Sample format of a source frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// BGRA - 32-bit with alpha (B G R A byte order)
    BGRA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale
    Gray8,
    /// NV12 - Semi-planar 4:2:0 (Y plane + interleaved UV plane)
    /// Typical output of mobile camera ISPs
    NV12,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    YUYV,
    /// Single-channel 32-bit float depth in meters, native endian
    DepthF32,
    /// Single-channel 8-bit confidence category code
    Confidence8,
}

impl PixelFormat {
    /// Check if this format is a YUV format
    pub fn is_yuv(&self) -> bool {
        matches!(self, Self::NV12 | Self::YUYV)
    }

    /// Whether this format can be produced for a given frame kind
    pub fn is_valid_for(&self, kind: FrameKind) -> bool {
        match kind {
            FrameKind::Color => !matches!(self, Self::DepthF32 | Self::Confidence8),
            FrameKind::Depth => *self == Self::DepthF32,
            FrameKind::Confidence => *self == Self::Confidence8,
        }
    }

    /// Bytes per pixel of the first (or only) plane
    pub fn plane_bytes_per_pixel(&self) -> u32 {
        match self {
            Self::RGBA | Self::BGRA | Self::DepthF32 => 4,
            Self::RGB24 => 3,
            Self::YUYV => 2,
            Self::Gray8 | Self::NV12 | Self::Confidence8 => 1,
        }
    }

    /// Packed size of one row of the first plane, `None` on overflow
    pub fn row_bytes(&self, width: u32) -> Option<u32> {
        width.checked_mul(self.plane_bytes_per_pixel())
    }

    /// Minimum number of bytes needed to hold a frame of this format,
    /// `None` if the shape does not fit in memory
    pub fn required_len(&self, width: u32, height: u32, stride: u32) -> Option<usize> {
        let stride = stride as usize;
        let height = height as usize;
        match self {
            // UV plane follows the Y plane at the same stride, half height
            Self::NV12 => stride
                .checked_mul(height)?
                .checked_add(stride.checked_mul(height.div_ceil(2))?),
            _ if height == 0 => Some(0),
            // Last row does not need trailing padding
            _ => stride
                .checked_mul(height - 1)?
                .checked_add(self.row_bytes(width)? as usize),
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RGBA => "RGBA",
            Self::BGRA => "BGRA",
            Self::RGB24 => "RGB24",
            Self::Gray8 => "GRAY8",
            Self::NV12 => "NV12",
            Self::YUYV => "YUYV",
            Self::DepthF32 => "DepthFloat32",
            Self::Confidence8 => "Confidence8",
        };
        write!(f, "{}", name)
    }
}

/// Identifier of one acquisition, used to release it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// A single frame from a sensor
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Raw samples
    pub data: FrameData,
    /// Sample format of the data
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Monotonic frame sequence number from the source
    pub sequence: u64,
    /// Timestamp when the frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Create a tightly packed frame (stride = width * bytes per pixel)
    pub fn packed(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: impl Into<FrameData>,
        sequence: u64,
    ) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            format,
            stride: width.saturating_mul(format.plane_bytes_per_pixel()),
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Check that the reported shape is consistent with the data
    pub fn validate(&self) -> BackendResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BackendError::InvalidFrame(format!(
                "empty frame {}x{}",
                self.width, self.height
            )));
        }
        let row_bytes = self.format.row_bytes(self.width).ok_or_else(|| {
            BackendError::InvalidFrame(format!(
                "row size overflows for {} {}x{}",
                self.format, self.width, self.height
            ))
        })?;
        if self.stride < row_bytes {
            return Err(BackendError::InvalidFrame(format!(
                "stride {} smaller than row size {} for {} {}x{}",
                self.stride, row_bytes, self.format, self.width, self.height
            )));
        }
        if self.format == PixelFormat::NV12 && (self.width % 2 != 0) {
            return Err(BackendError::InvalidFrame(format!(
                "NV12 width must be even, got {}",
                self.width
            )));
        }
        if self.format == PixelFormat::YUYV && (self.width % 2 != 0) {
            return Err(BackendError::InvalidFrame(format!(
                "YUYV width must be even, got {}",
                self.width
            )));
        }
        let required = self
            .format
            .required_len(self.width, self.height, self.stride)
            .ok_or_else(|| {
                BackendError::InvalidFrame(format!(
                    "{} {}x{} stride {} overflows",
                    self.format, self.width, self.height, self.stride
                ))
            })?;
        if self.data.len() < required {
            return Err(BackendError::InvalidFrame(format!(
                "{} {}x{} needs {} bytes, got {}",
                self.format,
                self.width,
                self.height,
                required,
                self.data.len()
            )));
        }
        Ok(())
    }

    /// Iterate over rows of the first plane, trimmed to the packed row size
    ///
    /// Only meaningful on a frame that passed [`CameraFrame::validate`].
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let row_bytes = self.format.row_bytes(self.width).unwrap_or(0) as usize;
        let stride = self.stride as usize;
        (0..self.height as usize).map(move |y| &self.data[y * stride..y * stride + row_bytes])
    }
}

/// Result type for frame source operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for frame source operations
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Source does not produce this kind of frame
    NotAvailable(String),
    /// Frame shape or format is inconsistent
    InvalidFrame(String),
    /// Format not supported for this frame kind
    FormatNotSupported(String),
    /// General I/O error
    IoError(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Source not available: {}", msg),
            BackendError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_stride() {
        let frame = CameraFrame::packed(4, 2, PixelFormat::DepthF32, vec![0u8; 32], 0);
        assert_eq!(frame.stride, 16);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_validate_short_buffer() {
        let frame = CameraFrame::packed(4, 2, PixelFormat::RGBA, vec![0u8; 31], 0);
        assert!(matches!(
            frame.validate(),
            Err(BackendError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_validate_padded_rows() {
        // Last row may omit its padding
        let mut frame = CameraFrame::packed(2, 2, PixelFormat::Gray8, vec![0u8; 6], 0);
        frame.stride = 4;
        assert!(frame.validate().is_ok());
        frame.stride = 1;
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_validate_nv12() {
        // 4x2: Y plane 8 bytes + UV plane 4 bytes
        let frame = CameraFrame::packed(4, 2, PixelFormat::NV12, vec![0u8; 12], 0);
        assert!(frame.validate().is_ok());
        let frame = CameraFrame::packed(4, 2, PixelFormat::NV12, vec![0u8; 10], 0);
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_validate_empty() {
        let frame = CameraFrame::packed(0, 4, PixelFormat::Gray8, Vec::new(), 0);
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_validate_huge_width_is_invalid() {
        let mut frame = CameraFrame::packed(1, 1, PixelFormat::DepthF32, vec![0u8; 16], 0);
        frame.width = 0x4000_0001;
        frame.stride = 16;
        assert!(matches!(
            frame.validate(),
            Err(BackendError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_required_len_overflow() {
        assert_eq!(PixelFormat::RGBA.row_bytes(0x4000_0000), None);
        assert_eq!(PixelFormat::RGBA.required_len(0x4000_0000, 1, 16), None);
        assert_eq!(PixelFormat::Gray8.required_len(2, 2, 4), Some(6));
        assert_eq!(PixelFormat::NV12.required_len(4, 2, 4), Some(12));
    }

    #[test]
    fn test_rows_skip_padding() {
        let mut frame =
            CameraFrame::packed(2, 2, PixelFormat::Gray8, vec![1, 2, 9, 9, 3, 4], 0);
        frame.stride = 4;
        let rows: Vec<&[u8]> = frame.rows().collect();
        assert_eq!(rows, vec![&[1u8, 2][..], &[3u8, 4][..]]);
    }

    #[test]
    fn test_format_kind_compat() {
        assert!(PixelFormat::NV12.is_valid_for(FrameKind::Color));
        assert!(!PixelFormat::DepthF32.is_valid_for(FrameKind::Color));
        assert!(PixelFormat::DepthF32.is_valid_for(FrameKind::Depth));
        assert!(!PixelFormat::Gray8.is_valid_for(FrameKind::Confidence));
    }
}
