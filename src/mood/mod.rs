//! Expression scores and the session-level mood reduction.

use serde::{Deserialize, Serialize};

/// The seven expression labels the face detector reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

/// Iteration order for the reduction. An exact tie on mean confidence
/// keeps the earlier label in this order.
pub const MOOD_LABELS: [MoodLabel; 7] = [
    MoodLabel::Neutral,
    MoodLabel::Happy,
    MoodLabel::Sad,
    MoodLabel::Angry,
    MoodLabel::Fearful,
    MoodLabel::Disgusted,
    MoodLabel::Surprised,
];

impl MoodLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Neutral => "neutral",
            MoodLabel::Happy => "happy",
            MoodLabel::Sad => "sad",
            MoodLabel::Angry => "angry",
            MoodLabel::Fearful => "fearful",
            MoodLabel::Disgusted => "disgusted",
            MoodLabel::Surprised => "surprised",
        }
    }
}

/// Confidence per expression label for one detection, each in [0, 1].
/// Labels absent on the wire deserialize as 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExpressionScores {
    pub neutral: f32,
    pub happy: f32,
    pub sad: f32,
    pub angry: f32,
    pub fearful: f32,
    pub disgusted: f32,
    pub surprised: f32,
}

impl ExpressionScores {
    pub fn score(&self, label: MoodLabel) -> f32 {
        match label {
            MoodLabel::Neutral => self.neutral,
            MoodLabel::Happy => self.happy,
            MoodLabel::Sad => self.sad,
            MoodLabel::Angry => self.angry,
            MoodLabel::Fearful => self.fearful,
            MoodLabel::Disgusted => self.disgusted,
            MoodLabel::Surprised => self.surprised,
        }
    }
}

/// Mood used when the duration budget expires before enough samples arrive.
pub const FALLBACK_MOOD: MoodLabel = MoodLabel::Happy;
/// Age paired with the fallback mood.
pub const FALLBACK_AGE: f32 = 25.0;

/// Reduce a session's expression buffer to its dominant mood.
///
/// Every observation contributes to every label's total (a score of 0 when
/// the detector did not report that label), and each total is divided by
/// the full buffer length. The label with the strictly greatest mean wins;
/// ties keep the earlier label in [`MOOD_LABELS`] order.
///
/// Returns `None` for an empty buffer. Sessions that collected nothing
/// finalize with [`FALLBACK_MOOD`] instead of calling this.
pub fn dominant_mood(buffer: &[ExpressionScores]) -> Option<MoodLabel> {
    if buffer.is_empty() {
        return None;
    }

    let total = buffer.len() as f32;
    let mut best = MOOD_LABELS[0];
    let mut best_mean = mean_for(buffer, best, total);

    for &label in &MOOD_LABELS[1..] {
        let mean = mean_for(buffer, label, total);
        if mean > best_mean {
            best = label;
            best_mean = mean;
        }
    }

    Some(best)
}

fn mean_for(buffer: &[ExpressionScores], label: MoodLabel, total: f32) -> f32 {
    buffer.iter().map(|scores| scores.score(label)).sum::<f32>() / total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(happy: f32, sad: f32) -> ExpressionScores {
        ExpressionScores {
            happy,
            sad,
            ..Default::default()
        }
    }

    #[test]
    fn empty_buffer_has_no_dominant_mood() {
        assert_eq!(dominant_mood(&[]), None);
    }

    #[test]
    fn picks_label_with_highest_mean() {
        let buffer = vec![scores(0.8, 0.1), scores(0.6, 0.3)];
        // means: happy 0.7, sad 0.2
        assert_eq!(dominant_mood(&buffer), Some(MoodLabel::Happy));
    }

    #[test]
    fn exact_tie_keeps_earlier_label() {
        // neutral and happy both average 0.5; neutral iterates first.
        let buffer = vec![ExpressionScores {
            neutral: 0.5,
            happy: 0.5,
            ..Default::default()
        }];
        assert_eq!(dominant_mood(&buffer), Some(MoodLabel::Neutral));
    }

    #[test]
    fn missing_labels_count_as_zero_against_full_length() {
        // sad appears in only one of four observations; its mean divides
        // by 4, not by 1.
        let buffer = vec![
            scores(0.25, 0.0),
            scores(0.25, 0.0),
            scores(0.25, 0.0),
            scores(0.0, 0.75),
        ];
        // means: happy 0.1875, sad 0.1875 -> tie resolved to happy (earlier).
        assert_eq!(dominant_mood(&buffer), Some(MoodLabel::Happy));
    }

    #[test]
    fn reduction_is_deterministic() {
        let buffer = vec![scores(0.4, 0.5), scores(0.5, 0.4), scores(0.2, 0.2)];
        let first = dominant_mood(&buffer);
        for _ in 0..10 {
            assert_eq!(dominant_mood(&buffer), first);
        }
    }

    #[test]
    fn absent_wire_labels_deserialize_as_zero() {
        let parsed: ExpressionScores =
            serde_json::from_str(r#"{"happy": 0.9, "sad": 0.05}"#).unwrap();
        assert_eq!(parsed.happy, 0.9);
        assert_eq!(parsed.neutral, 0.0);
        assert_eq!(parsed.fearful, 0.0);
    }
}
