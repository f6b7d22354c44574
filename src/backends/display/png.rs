// SPDX-License-Identifier: GPL-3.0-only

//! PNG file sink

use image::RgbaImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{DisplaySink, DisplayView};
use crate::errors::{SinkError, SinkResult};

/// How the PNG sink names its files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PngSinkMode {
    /// `<view>_<n>.png`, one file per update
    #[default]
    Sequence,
    /// `<view>.png`, overwritten on every update
    LatestOnly,
}

/// Writes display textures as PNG files into a directory
#[derive(Debug)]
pub struct PngSink {
    dir: PathBuf,
    mode: PngSinkMode,
    /// Successful writes per view
    counters: HashMap<DisplayView, u64>,
    latest: HashMap<DisplayView, PathBuf>,
}

impl PngSink {
    /// Create the sink, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>, mode: PngSinkMode) -> SinkResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| SinkError::WriteFailed {
            path: dir.clone(),
            message: e.to_string(),
        })?;
        info!(dir = %dir.display(), ?mode, "PNG sink ready");
        Ok(Self {
            dir,
            mode,
            counters: HashMap::new(),
            latest: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of distinct files on disk written by this sink
    pub fn files_written(&self) -> u64 {
        match self.mode {
            PngSinkMode::Sequence => self.counters.values().sum(),
            PngSinkMode::LatestOnly => self.latest.len() as u64,
        }
    }

    /// Most recent file written for `view`
    pub fn latest_path(&self, view: DisplayView) -> Option<&Path> {
        self.latest.get(&view).map(PathBuf::as_path)
    }

    fn path_for(&self, view: DisplayView) -> PathBuf {
        match self.mode {
            PngSinkMode::LatestOnly => self.dir.join(format!("{}.png", view.name())),
            PngSinkMode::Sequence => {
                let counter = self.counters.get(&view).copied().unwrap_or(0);
                self.dir.join(format!("{}_{:06}.png", view.name(), counter))
            }
        }
    }
}

impl DisplaySink for PngSink {
    fn set_display_texture(&mut self, view: DisplayView, texture: &RgbaImage) -> SinkResult<()> {
        let path = self.path_for(view);
        texture
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| SinkError::WriteFailed {
                path: path.clone(),
                message: e.to_string(),
            })?;
        debug!(view = %view, path = %path.display(), "Texture written");
        *self.counters.entry(view).or_insert(0) += 1;
        self.latest.insert(view, path);
        Ok(())
    }
}
