// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Depth visualization defaults (meters)
pub mod depth {
    /// Default near clip for the grayscale depth view
    pub const DEFAULT_NEAR_M: f32 = 0.5;
    /// Default far clip for the grayscale depth view
    pub const DEFAULT_FAR_M: f32 = 2.5;
    /// Range shown by the raw depth view (0~1m)
    pub const RAW_VIEW_NEAR_M: f32 = 0.0;
    pub const RAW_VIEW_FAR_M: f32 = 1.0;
    /// Millimeters per meter, for 16-bit depth captures stored in mm
    pub const MM_PER_METER: f32 = 1000.0;
}

/// Confidence palette (RGBA)
pub mod confidence {
    /// Code 0 (low confidence)
    pub const LOW: [u8; 4] = [255, 0, 0, 255];
    /// Code 1 (medium confidence)
    pub const MEDIUM: [u8; 4] = [0, 255, 0, 255];
    /// Code 2 (high confidence)
    pub const HIGH: [u8; 4] = [0, 0, 255, 255];
    /// Default fill for codes outside 0..=2
    pub const DEFAULT_SENTINEL: [u8; 4] = [0, 0, 0, 255];
}

/// Frame notification and pacing
pub mod timing {
    use super::Duration;

    /// Capacity of a subscriber's notification channel
    pub const NOTIFY_CHANNEL_CAPACITY: usize = 4;
    /// Default synthetic/file source frame rate
    pub const DEFAULT_FPS: u32 = 30;
    /// Poll interval while waiting for notifications
    pub const POLL_INTERVAL: Duration = Duration::from_millis(16);
}

/// Synthetic source defaults
pub mod synthetic {
    pub const DEFAULT_COLOR_WIDTH: u32 = 256;
    pub const DEFAULT_COLOR_HEIGHT: u32 = 192;
    /// Depth maps are typically lower resolution than the color camera
    pub const DEFAULT_DEPTH_WIDTH: u32 = 128;
    pub const DEFAULT_DEPTH_HEIGHT: u32 = 96;
    /// Depth ramp extent (meters)
    pub const RAMP_MIN_M: f32 = 0.25;
    pub const RAMP_MAX_M: f32 = 3.0;
}

/// Capture directory layout for the file source
pub mod file_formats {
    /// Base name of the color image (any supported extension)
    pub const COLOR_STEM: &str = "color";
    /// 16-bit grayscale PNG, millimeters
    pub const DEPTH_FILE: &str = "depth.png";
    /// 8-bit grayscale PNG, category codes
    pub const CONFIDENCE_FILE: &str = "confidence.png";

    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}
