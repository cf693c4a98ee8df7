//! Detector doubles: randomized for demos, scripted for tests.

use std::collections::VecDeque;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::capture::Frame;
use crate::mood::{ExpressionScores, MoodLabel};

use super::{Detector, FaceObservation, Landmark, PoseObservation, LEFT_WRIST};

/// Probability that a simulated tick finds a face at all. Empty ticks are
/// part of the contract the sampler has to tolerate.
const PRESENCE_PROBABILITY: f64 = 0.9;

/// Produces expression scores jittered around a bias mood. Lets the full
/// pipeline run without a camera or a model server.
pub struct SimulatedFaceDetector {
    rng: StdRng,
    bias: MoodLabel,
    age: f32,
}

impl SimulatedFaceDetector {
    pub fn new(bias: MoodLabel, age: f32) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            bias,
            age,
        }
    }

    pub fn seeded(bias: MoodLabel, age: f32, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bias,
            age,
        }
    }

    fn sample_scores(&mut self) -> ExpressionScores {
        let mut scores = ExpressionScores {
            neutral: self.rng.gen_range(0.0..0.2),
            happy: self.rng.gen_range(0.0..0.2),
            sad: self.rng.gen_range(0.0..0.2),
            angry: self.rng.gen_range(0.0..0.2),
            fearful: self.rng.gen_range(0.0..0.2),
            disgusted: self.rng.gen_range(0.0..0.2),
            surprised: self.rng.gen_range(0.0..0.2),
        };
        let boost = self.rng.gen_range(0.5..0.8);
        match self.bias {
            MoodLabel::Neutral => scores.neutral = boost,
            MoodLabel::Happy => scores.happy = boost,
            MoodLabel::Sad => scores.sad = boost,
            MoodLabel::Angry => scores.angry = boost,
            MoodLabel::Fearful => scores.fearful = boost,
            MoodLabel::Disgusted => scores.disgusted = boost,
            MoodLabel::Surprised => scores.surprised = boost,
        }
        scores
    }
}

impl Detector for SimulatedFaceDetector {
    type Obs = FaceObservation;

    async fn detect_once(&mut self, _frame: &Frame) -> Result<Vec<FaceObservation>> {
        if !self.rng.gen_bool(PRESENCE_PROBABILITY) {
            return Ok(Vec::new());
        }
        let expressions = self.sample_scores();
        let age = self.age + self.rng.gen_range(-2.0..2.0);
        Ok(vec![FaceObservation { expressions, age }])
    }
}

/// Produces a left arm whose elbow angle drifts between bent and straight,
/// so the posture feedback alternates naturally.
pub struct SimulatedPoseDetector {
    rng: StdRng,
    angle_deg: f32,
}

impl SimulatedPoseDetector {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            angle_deg: 120.0,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            angle_deg: 120.0,
        }
    }
}

impl Default for SimulatedPoseDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SimulatedPoseDetector {
    type Obs = PoseObservation;

    async fn detect_once(&mut self, _frame: &Frame) -> Result<Vec<PoseObservation>> {
        if !self.rng.gen_bool(PRESENCE_PROBABILITY) {
            return Ok(Vec::new());
        }
        // Random walk clamped to a plausible elbow range.
        self.angle_deg = (self.angle_deg + self.rng.gen_range(-8.0..8.0)).clamp(90.0, 180.0);
        Ok(vec![arm_with_elbow_angle(self.angle_deg)])
    }
}

/// Build a landmark list whose left arm forms the given elbow angle.
/// Shoulder and elbow sit on a horizontal line; the wrist rotates around
/// the elbow.
pub fn arm_with_elbow_angle(angle_deg: f32) -> PoseObservation {
    let mut landmarks = vec![
        Landmark {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 1.0,
        };
        LEFT_WRIST + 1
    ];
    landmarks[super::LEFT_SHOULDER] = Landmark {
        x: 0.3,
        y: 0.5,
        z: 0.0,
        visibility: 1.0,
    };
    landmarks[super::LEFT_ELBOW] = Landmark {
        x: 0.5,
        y: 0.5,
        z: 0.0,
        visibility: 1.0,
    };
    // Angle between elbow->shoulder (pointing at 180 degrees) and
    // elbow->wrist; placing the wrist at (180 - angle) from +x yields it.
    let theta = (180.0 - angle_deg).to_radians();
    landmarks[LEFT_WRIST] = Landmark {
        x: 0.5 + 0.2 * theta.cos(),
        y: 0.5 + 0.2 * theta.sin(),
        z: 0.0,
        visibility: 1.0,
    };
    PoseObservation { landmarks }
}

/// Replays a fixed per-tick script of observations, then reports nothing.
/// The deterministic detector the sampler tests are written against.
pub struct ScriptedDetector<O> {
    script: VecDeque<Vec<O>>,
}

impl<O> ScriptedDetector<O> {
    pub fn new(script: Vec<Vec<O>>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// A script that keeps yielding clones of the same observation.
    pub fn repeating(observation: O, ticks: usize) -> Self
    where
        O: Clone,
    {
        Self::new(vec![vec![observation]; ticks])
    }
}

impl<O: Send + 'static> Detector for ScriptedDetector<O> {
    type Obs = O;

    async fn detect_once(&mut self, _frame: &Frame) -> Result<Vec<O>> {
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::joint_angle;

    fn frame() -> Frame {
        Frame::new(2, 2, vec![0; 12])
    }

    #[tokio::test]
    async fn scripted_detector_drains_then_goes_quiet() {
        let mut detector = ScriptedDetector::new(vec![vec![1u32, 2], vec![], vec![3]]);
        assert_eq!(detector.detect_once(&frame()).await.unwrap(), vec![1, 2]);
        assert!(detector.detect_once(&frame()).await.unwrap().is_empty());
        assert_eq!(detector.detect_once(&frame()).await.unwrap(), vec![3]);
        assert!(detector.detect_once(&frame()).await.unwrap().is_empty());
    }

    #[test]
    fn synthetic_arm_reproduces_requested_angle() {
        for requested in [90.0f32, 120.0, 160.0, 175.0] {
            let observation = arm_with_elbow_angle(requested);
            let (shoulder, elbow, wrist) = observation.left_arm().unwrap();
            let measured = joint_angle(shoulder, elbow, wrist);
            assert!(
                (measured - requested).abs() < 0.1,
                "requested {requested}, measured {measured}"
            );
        }
    }

    #[tokio::test]
    async fn simulated_face_bias_dominates_over_time() {
        let mut detector = SimulatedFaceDetector::seeded(MoodLabel::Sad, 30.0, 7);
        let mut buffer = Vec::new();
        for _ in 0..100 {
            for observation in detector.detect_once(&frame()).await.unwrap() {
                buffer.push(observation.expressions);
            }
        }
        assert!(!buffer.is_empty());
        assert_eq!(crate::mood::dominant_mood(&buffer), Some(MoodLabel::Sad));
    }
}
