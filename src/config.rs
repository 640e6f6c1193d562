use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classifier::{MotionClassifier, PostureThresholds};
use crate::controller::ControllerSettings;
use crate::types::STATIONARY_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// freedesktop notifications over the session bus
    Desktop,
    /// Log lines only
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Iio,
    Replay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub kind: SensorKind,
    /// sysfs directory of the IIO accelerometer
    pub device: PathBuf,
    /// Low-pass coefficient used to track gravity (0, 1]
    pub gravity_alpha: f64,
    pub replay_path: Option<PathBuf>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::Iio,
            device: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
            gravity_alpha: 0.1,
            replay_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub sample_interval_ms: u64,
    pub stationary_threshold: f64,
    pub reactivation_delay_secs: u64,
    pub alert_on_stationary: bool,
    /// Execution-time cap per active period; unset means unlimited
    pub guard_max_active_secs: Option<u64>,
    pub notifier: NotifierKind,
    pub posture: PostureThresholds,
    pub sensor: SensorConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1000,
            stationary_threshold: STATIONARY_THRESHOLD,
            reactivation_delay_secs: 60,
            alert_on_stationary: true,
            guard_max_active_secs: None,
            notifier: NotifierKind::Desktop,
            posture: PostureThresholds::default(),
            sensor: SensorConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config {:?}", path))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("Invalid config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.sample_interval_ms > 0, "sample_interval_ms must be positive");
        ensure!(
            self.stationary_threshold > 0.0,
            "stationary_threshold must be positive (got {})",
            self.stationary_threshold
        );
        ensure!(
            self.sensor.gravity_alpha > 0.0 && self.sensor.gravity_alpha <= 1.0,
            "sensor.gravity_alpha must be in (0, 1] (got {})",
            self.sensor.gravity_alpha
        );
        ensure!(
            self.posture.forward_pitch_deg < self.posture.backward_pitch_deg,
            "posture.forward_pitch_deg must be below posture.backward_pitch_deg"
        );
        ensure!(
            self.posture.left_roll_deg < self.posture.right_roll_deg,
            "posture.left_roll_deg must be below posture.right_roll_deg"
        );
        ensure!(
            self.guard_max_active_secs != Some(0),
            "guard_max_active_secs must be positive when set"
        );
        if self.sensor.kind == SensorKind::Replay {
            ensure!(
                self.sensor.replay_path.is_some(),
                "sensor.replay_path is required when sensor.kind = \"replay\""
            );
        }
        Ok(())
    }

    pub fn guard_max_active(&self) -> Option<Duration> {
        self.guard_max_active_secs.map(Duration::from_secs)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            reactivation_delay: Duration::from_secs(self.reactivation_delay_secs),
            alert_on_stationary: self.alert_on_stationary,
            classifier: MotionClassifier::new(self.stationary_threshold, self.posture),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = MonitorConfig::default();
        config.validate().unwrap();

        let settings = config.controller_settings();
        assert_eq!(settings.sample_interval, Duration::from_secs(1));
        assert_eq!(settings.reactivation_delay, Duration::from_secs(60));
        assert!(settings.alert_on_stationary);
        assert_eq!(settings.classifier, MotionClassifier::default());
        assert_eq!(config.guard_max_active(), None);
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config: MonitorConfig = toml::from_str(
            r#"
            reactivation_delay_secs = 90
            notifier = "log"
            guard_max_active_secs = 30

            [posture]
            forward_pitch_deg = -5.0

            [sensor]
            kind = "replay"
            replay_path = "trace.csv"
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.reactivation_delay_secs, 90);
        assert_eq!(config.notifier, NotifierKind::Log);
        assert_eq!(config.guard_max_active(), Some(Duration::from_secs(30)));
        assert_eq!(config.posture.forward_pitch_deg, -5.0);
        assert_eq!(config.posture.backward_pitch_deg, 20.0);
        assert_eq!(config.sensor.kind, SensorKind::Replay);
        assert_eq!(config.sample_interval_ms, 1000);
    }

    #[test]
    fn validation_rejects_inverted_limits() {
        let mut config = MonitorConfig::default();
        config.posture.left_roll_deg = 20.0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.sensor.gravity_alpha = 0.0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.sensor.kind = SensorKind::Replay;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_guard_cap_is_rejected() {
        let mut config = MonitorConfig::default();
        config.guard_max_active_secs = Some(0);
        assert!(config.validate().is_err());

        config.guard_max_active_secs = Some(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posture.toml");
        let mut config = MonitorConfig::default();
        config.guard_max_active_secs = Some(120);
        config.notifier = NotifierKind::Log;

        config.save(&path).unwrap();
        assert_eq!(MonitorConfig::load(&path).unwrap(), config);
    }
}
