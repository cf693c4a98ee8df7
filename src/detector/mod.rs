//! Detector capability shared by the face and pose pipelines.
//!
//! The models themselves are opaque: a detector turns one frame into zero
//! or more observations, and everything downstream (sampling, budgets,
//! aggregation) is detector-agnostic.

use std::future::Future;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::capture::Frame;
use crate::mood::ExpressionScores;

pub mod remote;
pub mod simulated;

pub use remote::{RemoteFaceDetector, RemotePoseDetector};
pub use simulated::{SimulatedFaceDetector, SimulatedPoseDetector};

/// One face found in a frame: its expression confidences plus the model's
/// age estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceObservation {
    pub expressions: ExpressionScores,
    #[serde(default)]
    pub age: f32,
}

/// One 2-D pose landmark with the usual depth and visibility extras.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default)]
    pub visibility: f32,
}

/// MediaPipe-layout landmark indices used by the posture evaluator.
pub const LEFT_SHOULDER: usize = 11;
pub const LEFT_ELBOW: usize = 13;
pub const LEFT_WRIST: usize = 15;

/// One body found in a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseObservation {
    pub landmarks: Vec<Landmark>,
}

impl PoseObservation {
    /// The (shoulder, elbow, wrist) triple, if the landmark list is long
    /// enough to contain it.
    pub fn left_arm(&self) -> Option<(&Landmark, &Landmark, &Landmark)> {
        Some((
            self.landmarks.get(LEFT_SHOULDER)?,
            self.landmarks.get(LEFT_ELBOW)?,
            self.landmarks.get(LEFT_WRIST)?,
        ))
    }
}

/// Something that can analyze a single frame.
///
/// An empty result is a valid outcome (nothing recognized this tick);
/// errors cover transport or model failure. Implementations should return
/// promptly relative to the sampling tick; the sampler additionally caps
/// each call with a timeout.
pub trait Detector: Send + 'static {
    type Obs: Send + 'static;

    fn detect_once(
        &mut self,
        frame: &Frame,
    ) -> impl Future<Output = Result<Vec<Self::Obs>>> + Send;
}
