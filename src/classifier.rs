use serde::{Deserialize, Serialize};

use crate::types::{MotionVerdict, PostureVerdict, Sample, STATIONARY_THRESHOLD};

/// Posture limits in degrees. Each bound is strict: a reading exactly on
/// the limit still counts as good posture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureThresholds {
    /// Pitch below this means the device is tilted forward
    pub forward_pitch_deg: f64,
    /// Pitch above this means the device is tilted backward
    pub backward_pitch_deg: f64,
    /// Roll below this means the device leans left
    pub left_roll_deg: f64,
    /// Roll above this means the device leans right
    pub right_roll_deg: f64,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            forward_pitch_deg: -10.0,
            backward_pitch_deg: 20.0,
            left_roll_deg: -15.0,
            right_roll_deg: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Angle {
    Pitch,
    Roll,
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Below(f64),
    Above(f64),
}

/// One row of the posture decision table
#[derive(Debug, Clone, Copy)]
struct PostureRule {
    angle: Angle,
    bound: Bound,
    verdict: PostureVerdict,
}

impl PostureRule {
    fn matches(&self, pitch_deg: f64, roll_deg: f64) -> bool {
        let value = match self.angle {
            Angle::Pitch => pitch_deg,
            Angle::Roll => roll_deg,
        };
        match self.bound {
            Bound::Below(limit) => value < limit,
            Bound::Above(limit) => value > limit,
        }
    }
}

impl PostureThresholds {
    /// Rules in evaluation order; the first match wins
    fn rules(&self) -> [PostureRule; 4] {
        [
            PostureRule {
                angle: Angle::Pitch,
                bound: Bound::Below(self.forward_pitch_deg),
                verdict: PostureVerdict::TiltedForward,
            },
            PostureRule {
                angle: Angle::Pitch,
                bound: Bound::Above(self.backward_pitch_deg),
                verdict: PostureVerdict::TiltedBackward,
            },
            PostureRule {
                angle: Angle::Roll,
                bound: Bound::Below(self.left_roll_deg),
                verdict: PostureVerdict::TiltedLeft,
            },
            PostureRule {
                angle: Angle::Roll,
                bound: Bound::Above(self.right_roll_deg),
                verdict: PostureVerdict::TiltedRight,
            },
        ]
    }
}

/// Stateless stationary/moving and posture classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionClassifier {
    stationary_threshold: f64,
    posture: PostureThresholds,
}

impl Default for MotionClassifier {
    fn default() -> Self {
        Self::new(STATIONARY_THRESHOLD, PostureThresholds::default())
    }
}

impl MotionClassifier {
    pub fn new(stationary_threshold: f64, posture: PostureThresholds) -> Self {
        Self {
            stationary_threshold,
            posture,
        }
    }

    /// True iff every acceleration axis is strictly under the threshold.
    pub fn is_stationary(&self, sample: &Sample) -> bool {
        let t = self.stationary_threshold;
        sample.acceleration_x.abs() < t
            && sample.acceleration_y.abs() < t
            && sample.acceleration_z.abs() < t
    }

    pub fn classify_posture(&self, pitch_deg: f64, roll_deg: f64) -> PostureVerdict {
        self.posture
            .rules()
            .iter()
            .find(|rule| rule.matches(pitch_deg, roll_deg))
            .map(|rule| rule.verdict)
            .unwrap_or(PostureVerdict::Good)
    }

    /// Full verdict for one sample. Yaw plays no part in posture.
    pub fn classify(&self, sample: &Sample) -> MotionVerdict {
        if !self.is_stationary(sample) {
            return MotionVerdict::Moving;
        }
        let (pitch, roll, _yaw) = sample.attitude_degrees();
        MotionVerdict::Stationary(self.classify_posture(pitch, roll))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accel(x: f64, y: f64, z: f64) -> Sample {
        Sample {
            acceleration_x: x,
            acceleration_y: y,
            acceleration_z: z,
            ..Sample::default()
        }
    }

    #[test]
    fn small_accelerations_are_stationary() {
        let c = MotionClassifier::default();
        assert!(c.is_stationary(&accel(0.0, 0.0, 0.0)));
        assert!(c.is_stationary(&accel(0.019, -0.019, 0.0199)));
        assert!(c.is_stationary(&accel(-0.01, 0.005, -0.015)));
    }

    #[test]
    fn threshold_itself_counts_as_moving() {
        let c = MotionClassifier::default();
        assert!(!c.is_stationary(&accel(0.02, 0.0, 0.0)));
        assert!(!c.is_stationary(&accel(0.0, -0.02, 0.0)));
        assert!(!c.is_stationary(&accel(0.0, 0.0, 0.02)));
    }

    #[test]
    fn any_single_axis_over_threshold_is_moving() {
        let c = MotionClassifier::default();
        assert!(!c.is_stationary(&accel(0.5, 0.0, 0.0)));
        assert!(!c.is_stationary(&accel(0.0, 0.0, -0.03)));
    }

    #[test]
    fn posture_table_matches_documented_cases() {
        let c = MotionClassifier::default();
        assert_eq!(c.classify_posture(-11.0, 0.0), PostureVerdict::TiltedForward);
        assert_eq!(c.classify_posture(21.0, 0.0), PostureVerdict::TiltedBackward);
        assert_eq!(c.classify_posture(0.0, -16.0), PostureVerdict::TiltedLeft);
        assert_eq!(c.classify_posture(0.0, 16.0), PostureVerdict::TiltedRight);
        assert_eq!(c.classify_posture(5.0, 5.0), PostureVerdict::Good);
    }

    #[test]
    fn posture_limits_are_strict() {
        let c = MotionClassifier::default();
        assert_eq!(c.classify_posture(-10.0, 0.0), PostureVerdict::Good);
        assert_eq!(c.classify_posture(20.0, 0.0), PostureVerdict::Good);
        assert_eq!(c.classify_posture(0.0, -15.0), PostureVerdict::Good);
        assert_eq!(c.classify_posture(0.0, 15.0), PostureVerdict::Good);
    }

    #[test]
    fn pitch_rules_take_precedence_over_roll() {
        let c = MotionClassifier::default();
        assert_eq!(c.classify_posture(-30.0, 40.0), PostureVerdict::TiltedForward);
        assert_eq!(c.classify_posture(25.0, -40.0), PostureVerdict::TiltedBackward);
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let c = MotionClassifier::new(
            0.1,
            PostureThresholds {
                forward_pitch_deg: -5.0,
                ..PostureThresholds::default()
            },
        );
        assert!(c.is_stationary(&accel(0.05, 0.05, 0.05)));
        assert_eq!(c.classify_posture(-6.0, 0.0), PostureVerdict::TiltedForward);
    }

    #[test]
    fn classify_converts_radians_and_ignores_yaw() {
        let c = MotionClassifier::default();
        let mut sample = Sample::at_rest_degrees(-12.0, 0.0);
        sample.yaw = 3.0;
        assert_eq!(
            c.classify(&sample),
            MotionVerdict::Stationary(PostureVerdict::TiltedForward)
        );

        let moving = Sample {
            acceleration_x: 0.5,
            ..Sample::at_rest_degrees(-12.0, 0.0)
        };
        assert_eq!(c.classify(&moving), MotionVerdict::Moving);
    }
}
