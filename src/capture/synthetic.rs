//! Hardware-free capture source producing flat frames.

use anyhow::Result;

use super::{CaptureSource, Frame};

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

/// Emits identical mid-gray frames. Stands in for a webcam in demos and
/// tests; the detectors decide what they "see", not the pixels.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    opened: bool,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            opened: false,
        }
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for SyntheticCamera {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        if !self.opened {
            anyhow::bail!("synthetic camera not opened");
        }
        let data = vec![0x80; (self.width * self.height * 3) as usize];
        Ok(Frame::new(self.width, self.height, data))
    }

    fn release(&mut self) {
        self.opened = false;
    }
}
