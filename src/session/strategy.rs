//! Per-variant sampling behavior behind one capability.
//!
//! The sampler loop is identical for mood and posture sessions; what
//! differs is what a tick's observations do to session state and what the
//! final reduction looks like. Strategies own that difference.

use std::sync::Arc;

use serde::Serialize;

use crate::detector::{FaceObservation, PoseObservation};
use crate::mood::{dominant_mood, ExpressionScores, MoodLabel, FALLBACK_AGE, FALLBACK_MOOD};
use crate::pose::{evaluate_elbow, joint_angle, PoseFeedback};
use crate::speech::SpeechChannel;

use super::state::EndReason;

/// Variant-specific half of a sampling session.
pub trait SessionStrategy: Send + 'static {
    type Obs: Send + 'static;
    type Summary: Send + 'static;

    /// Absorb one tick's worth of observations (never empty; empty ticks
    /// are filtered by the sampler). Returns true once the sample-count
    /// budget is satisfied.
    fn absorb(&mut self, observations: Vec<Self::Obs>) -> bool;

    /// One-line status for the overlay surface.
    fn status(&self) -> String;

    /// Reduce whatever was collected into the session summary. Consumes
    /// the strategy; a session reduces exactly once.
    fn finish(self, reason: EndReason) -> Self::Summary;
}

/// Finalized result of a mood session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodSummary {
    pub label: MoodLabel,
    pub age: f32,
    pub sample_count: usize,
    /// True when the duration budget expired and the policy default was
    /// used instead of reducing the buffer.
    pub used_fallback: bool,
}

/// Buffers expression scores until the count budget fills; keeps the age
/// of the most recent observation (not an average).
pub struct MoodStrategy {
    buffer: Vec<ExpressionScores>,
    last_age: Option<f32>,
    max_samples: usize,
}

impl MoodStrategy {
    pub fn new(max_samples: usize) -> Self {
        Self {
            buffer: Vec::new(),
            last_age: None,
            max_samples,
        }
    }

    #[cfg(test)]
    pub fn sample_count(&self) -> usize {
        self.buffer.len()
    }
}

impl SessionStrategy for MoodStrategy {
    type Obs = FaceObservation;
    type Summary = MoodSummary;

    fn absorb(&mut self, observations: Vec<FaceObservation>) -> bool {
        // Only the first face of a tick counts, as the source system did.
        if let Some(face) = observations.into_iter().next() {
            self.buffer.push(face.expressions);
            self.last_age = Some(face.age);
        }
        self.buffer.len() >= self.max_samples
    }

    fn status(&self) -> String {
        format!("mood samples {}/{}", self.buffer.len(), self.max_samples)
    }

    fn finish(self, reason: EndReason) -> MoodSummary {
        match reason {
            EndReason::SampleBudget => MoodSummary {
                // The buffer is full here, so the reduction cannot miss.
                label: dominant_mood(&self.buffer).unwrap_or(FALLBACK_MOOD),
                age: self.last_age.unwrap_or(FALLBACK_AGE),
                sample_count: self.buffer.len(),
                used_fallback: false,
            },
            // The duration path never reduces, even over a partial buffer.
            EndReason::DurationBudget | EndReason::Cancelled => MoodSummary {
                label: FALLBACK_MOOD,
                age: FALLBACK_AGE,
                sample_count: self.buffer.len(),
                used_fallback: true,
            },
        }
    }
}

/// Finalized result of a posture session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseSummary {
    pub ticks_observed: usize,
    pub corrections: usize,
    pub last_angle: Option<f32>,
    pub last_feedback: Option<&'static str>,
}

/// Evaluates the elbow angle fresh every tick and forwards feedback to
/// the speech channel. No buffering across ticks; identical consecutive
/// feedback is not re-spoken.
pub struct PoseStrategy {
    speech: Arc<dyn SpeechChannel>,
    last_feedback: Option<PoseFeedback>,
    last_angle: Option<f32>,
    ticks_observed: usize,
    corrections: usize,
}

impl PoseStrategy {
    pub fn new(speech: Arc<dyn SpeechChannel>) -> Self {
        Self {
            speech,
            last_feedback: None,
            last_angle: None,
            ticks_observed: 0,
            corrections: 0,
        }
    }
}

impl SessionStrategy for PoseStrategy {
    type Obs = PoseObservation;
    type Summary = PoseSummary;

    fn absorb(&mut self, observations: Vec<PoseObservation>) -> bool {
        let Some(body) = observations.into_iter().next() else {
            return false;
        };
        let Some((shoulder, elbow, wrist)) = body.left_arm() else {
            // Landmark list too short to evaluate; treat like an empty tick.
            return false;
        };

        let angle = joint_angle(shoulder, elbow, wrist);
        let feedback = evaluate_elbow(angle);

        self.ticks_observed += 1;
        self.last_angle = Some(angle);
        if feedback == PoseFeedback::KeepElbowStraight {
            self.corrections += 1;
        }

        if self.last_feedback != Some(feedback) {
            self.speech.speak(feedback.text());
            self.last_feedback = Some(feedback);
        }

        // Posture sessions are duration-bounded only.
        false
    }

    fn status(&self) -> String {
        match (self.last_angle, self.last_feedback) {
            (Some(angle), Some(feedback)) => {
                format!("elbow {angle:.1} deg - {}", feedback.text())
            }
            _ => "waiting for pose".to_string(),
        }
    }

    fn finish(self, _reason: EndReason) -> PoseSummary {
        PoseSummary {
            ticks_observed: self.ticks_observed,
            corrections: self.corrections,
            last_angle: self.last_angle,
            last_feedback: self.last_feedback.map(|f| f.text()),
        }
    }
}
