//! Joint-angle evaluation for posture feedback.

use crate::detector::Landmark;

/// Elbow angles below this are flagged as bent. Exactly 160 degrees is
/// already good posture (strict less-than).
pub const ELBOW_ANGLE_THRESHOLD: f32 = 160.0;

/// Per-tick verdict on the tracked joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseFeedback {
    KeepElbowStraight,
    GoodPosture,
}

impl PoseFeedback {
    /// The line forwarded to the speech channel.
    pub fn text(&self) -> &'static str {
        match self {
            PoseFeedback::KeepElbowStraight => "Keep your elbow straight.",
            PoseFeedback::GoodPosture => "Good posture!",
        }
    }
}

/// Angle in degrees at `b` formed by the segments `b->a` and `b->c`,
/// folded into [0, 180] (values past 180 reflect back as `360 - angle`).
pub fn joint_angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let angle = radians.to_degrees().abs();
    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}

pub fn evaluate_elbow(angle: f32) -> PoseFeedback {
    if angle < ELBOW_ANGLE_THRESHOLD {
        PoseFeedback::KeepElbowStraight
    } else {
        PoseFeedback::GoodPosture
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32) -> Landmark {
        Landmark {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }

    #[test]
    fn right_angle_at_elbow() {
        let shoulder = point(0.0, 0.0);
        let elbow = point(1.0, 0.0);
        let wrist = point(1.0, 1.0);
        let angle = joint_angle(&shoulder, &elbow, &wrist);
        assert!((angle - 90.0).abs() < 1e-4, "got {angle}");
        assert_eq!(evaluate_elbow(angle), PoseFeedback::KeepElbowStraight);
    }

    #[test]
    fn straight_arm_measures_180() {
        let shoulder = point(0.0, 0.0);
        let elbow = point(1.0, 0.0);
        let wrist = point(2.0, 0.0);
        let angle = joint_angle(&shoulder, &elbow, &wrist);
        assert!((angle - 180.0).abs() < 1e-4, "got {angle}");
        assert_eq!(evaluate_elbow(angle), PoseFeedback::GoodPosture);
    }

    #[test]
    fn raw_angles_past_180_reflect_back() {
        // wrist below the shoulder-elbow line: the raw atan2 difference is
        // 270 degrees, which folds to 90.
        let shoulder = point(0.0, 0.0);
        let elbow = point(1.0, 0.0);
        let wrist = point(1.0, -1.0);
        let angle = joint_angle(&shoulder, &elbow, &wrist);
        assert!((angle - 90.0).abs() < 1e-4, "got {angle}");
    }

    #[test]
    fn threshold_boundary_is_good_posture() {
        assert_eq!(evaluate_elbow(160.0), PoseFeedback::GoodPosture);
        assert_eq!(evaluate_elbow(159.999), PoseFeedback::KeepElbowStraight);
    }

    #[test]
    fn feedback_text_matches_spoken_lines() {
        assert_eq!(
            PoseFeedback::KeepElbowStraight.text(),
            "Keep your elbow straight."
        );
        assert_eq!(PoseFeedback::GoodPosture.text(), "Good posture!");
    }
}
