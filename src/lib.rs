//! Posture monitor
//!
//! Samples device motion, decides whether the device is being held still,
//! and if so tells the user how their posture looks. While the device is
//! moving, sampling is paused and resumed later to save power.

pub mod alert;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod guard;
pub mod iio;
pub mod lifecycle;
pub mod replay;
pub mod sensor;
pub mod timer;
pub mod types;

pub use classifier::{MotionClassifier, PostureThresholds};
pub use controller::{ControlEvent, ControllerSettings, ControllerStats, MonitorHandle, SamplingController};
pub use types::{MonitoringState, MotionVerdict, PostureVerdict, Sample};
