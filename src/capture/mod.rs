//! Capture sources and the release-once guard around them.
//!
//! The capture device is the one scarce resource in a session: it is
//! acquired exactly once at session start and must be released on every
//! exit path (budget, cancellation, worker panic). `CaptureGuard` owns
//! that discipline so call sites never release by hand.

use anyhow::Result;

pub mod replay;
pub mod synthetic;

pub use replay::ReplayCamera;
pub use synthetic::SyntheticCamera;

/// One captured image, tightly packed RGB8.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height * 3) as usize);
        Self {
            width,
            height,
            data,
        }
    }
}

/// A frame source backed by some capture device.
///
/// `open` acquires the device; failure there means the session never
/// starts. `read_frame` may fail transiently (treated as an empty tick by
/// the sampler). `release` must be idempotent-friendly in the sense that
/// the guard calls it exactly once.
pub trait CaptureSource: Send + 'static {
    fn open(&mut self) -> Result<()>;
    fn read_frame(&mut self) -> Result<Frame>;
    fn release(&mut self);
}

/// Owns an opened capture source and guarantees a single release.
///
/// Explicit `release()` covers the normal finalization paths; `Drop`
/// covers teardown and panics. Whichever runs first wins, the other is a
/// no-op.
pub struct CaptureGuard<C: CaptureSource> {
    source: C,
    released: bool,
}

impl<C: CaptureSource> CaptureGuard<C> {
    /// Acquire the device. On failure the source is returned unopened and
    /// nothing needs releasing.
    pub fn open(mut source: C) -> Result<Self> {
        source.open()?;
        Ok(Self {
            source,
            released: false,
        })
    }

    pub fn read_frame(&mut self) -> Result<Frame> {
        debug_assert!(!self.released, "read_frame after release");
        self.source.read_frame()
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
        }
    }
}

impl<C: CaptureSource> Drop for CaptureGuard<C> {
    fn drop(&mut self) {
        self.release();
    }
}
