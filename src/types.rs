use std::time::Duration;

/// Acceleration threshold (in g) below which an axis counts as still
pub const STATIONARY_THRESHOLD: f64 = 0.02;

/// Cadence at which the sensor source emits samples
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Delay before sampling resumes after movement was detected
pub const REACTIVATION_DELAY: Duration = Duration::from_secs(60);

/// Standard gravity (m/s²), used to express raw accelerometer readings in g
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// One device-motion reading: user acceleration (gravity removed, in g)
/// and attitude (radians).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub acceleration_x: f64,
    pub acceleration_y: f64,
    pub acceleration_z: f64,

    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl Sample {
    /// Sample at rest with the given attitude in degrees
    pub fn at_rest_degrees(pitch_deg: f64, roll_deg: f64) -> Self {
        Self {
            pitch: pitch_deg.to_radians(),
            roll: roll_deg.to_radians(),
            ..Self::default()
        }
    }

    /// Pitch, roll and yaw converted to degrees
    pub fn attitude_degrees(&self) -> (f64, f64, f64) {
        (
            self.pitch.to_degrees(),
            self.roll.to_degrees(),
            self.yaw.to_degrees(),
        )
    }

    /// Largest absolute acceleration over the three axes
    pub fn max_abs_acceleration(&self) -> f64 {
        self.acceleration_x
            .abs()
            .max(self.acceleration_y.abs())
            .max(self.acceleration_z.abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringState {
    /// Sampling stopped; a reactivation timer may be pending
    Idle,
    /// Sensor running and lifecycle token held
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostureVerdict {
    Good,
    TiltedForward,
    TiltedBackward,
    TiltedLeft,
    TiltedRight,
}

impl PostureVerdict {
    /// Fixed user-facing message for this verdict
    pub fn message(&self) -> &'static str {
        match self {
            PostureVerdict::Good => "Good posture, keep it up!",
            PostureVerdict::TiltedForward => {
                "You're looking down at your device. Raise it closer to eye level."
            }
            PostureVerdict::TiltedBackward => {
                "Your device is tilted far back. Bring it upright in front of you."
            }
            PostureVerdict::TiltedLeft => "Your device is leaning left. Straighten it up.",
            PostureVerdict::TiltedRight => "Your device is leaning right. Straighten it up.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostureVerdict::Good => "good",
            PostureVerdict::TiltedForward => "tilted-forward",
            PostureVerdict::TiltedBackward => "tilted-backward",
            PostureVerdict::TiltedLeft => "tilted-left",
            PostureVerdict::TiltedRight => "tilted-right",
        }
    }
}

/// Outcome of classifying one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionVerdict {
    Moving,
    Stationary(PostureVerdict),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attitude_is_reported_in_degrees() {
        let sample = Sample::at_rest_degrees(-12.0, 30.0);
        let (pitch, roll, yaw) = sample.attitude_degrees();
        assert!((pitch + 12.0).abs() < 1e-9);
        assert!((roll - 30.0).abs() < 1e-9);
        assert_eq!(yaw, 0.0);
    }

    #[test]
    fn max_abs_acceleration_uses_magnitudes() {
        let sample = Sample {
            acceleration_x: 0.01,
            acceleration_y: -0.3,
            acceleration_z: 0.2,
            ..Sample::default()
        };
        assert_eq!(sample.max_abs_acceleration(), 0.3);
    }

    #[test]
    fn every_verdict_has_a_distinct_message() {
        let verdicts = [
            PostureVerdict::Good,
            PostureVerdict::TiltedForward,
            PostureVerdict::TiltedBackward,
            PostureVerdict::TiltedLeft,
            PostureVerdict::TiltedRight,
        ];
        let mut messages: Vec<&str> = verdicts.iter().map(|v| v.message()).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), verdicts.len());
    }
}
