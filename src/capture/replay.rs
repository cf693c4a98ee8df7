//! Capture source that replays image files from a directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{CaptureSource, Frame};

/// Cycles through the images of a directory in filename order, decoding
/// each to RGB8. Useful for driving the detectors from a recorded clip
/// instead of live hardware.
pub struct ReplayCamera {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl ReplayCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            next: 0,
        }
    }

    fn is_image(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("png" | "jpg" | "jpeg" | "bmp")
        )
    }
}

impl CaptureSource for ReplayCamera {
    fn open(&mut self) -> Result<()> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read replay directory {}", self.dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| Self::is_image(path))
            .collect();
        files.sort();

        if files.is_empty() {
            anyhow::bail!("no image files in replay directory {}", self.dir.display());
        }

        self.files = files;
        self.next = 0;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        if self.files.is_empty() {
            anyhow::bail!("replay camera not opened");
        }

        let path = &self.files[self.next];
        self.next = (self.next + 1) % self.files.len();

        let rgb = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Frame::new(width, height, rgb.into_raw()))
    }

    fn release(&mut self) {
        self.files.clear();
        self.next = 0;
    }
}
