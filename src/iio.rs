use std::fs;
use std::io;
use std::path::PathBuf;

use crate::sensor::{SampleReader, SensorError};
use crate::types::{Sample, STANDARD_GRAVITY};

/// Accelerometer exposed through the Linux industrial-I/O sysfs interface.
///
/// Raw readings are scaled to g, gravity is tracked with a first-order
/// low-pass filter and subtracted to get user acceleration. Pitch and roll
/// come from the filtered gravity vector; there is no magnetometer, so yaw
/// is always zero.
///
/// The gravity estimate is reseeded from the first reading after `reset`,
/// so a device put down in a new orientation reads as still straight away.
pub struct IioReader {
    device: PathBuf,
    alpha: f64,
    gravity: Option<[f64; 3]>,
}

impl IioReader {
    pub fn new(device: impl Into<PathBuf>, gravity_alpha: f64) -> Self {
        Self {
            device: device.into(),
            alpha: gravity_alpha,
            gravity: None,
        }
    }

    fn read_attr(&self, name: &str) -> Result<f64, SensorError> {
        let path = self.device.join(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SensorError::Unavailable);
            }
            Err(e) => return Err(SensorError::Io(e)),
        };
        text.trim()
            .parse::<f64>()
            .map_err(|e| SensorError::Read(format!("{}: {}", path.display(), e)))
    }

    /// Total specific force in g, as the accelerometer reports it
    fn read_force(&self) -> Result<[f64; 3], SensorError> {
        let scale = self.read_attr("in_accel_scale")?;
        let x = self.read_attr("in_accel_x_raw")?;
        let y = self.read_attr("in_accel_y_raw")?;
        let z = self.read_attr("in_accel_z_raw")?;
        let to_g = scale / STANDARD_GRAVITY;
        Ok([x * to_g, y * to_g, z * to_g])
    }

    /// Splits a force reading into gravity and user acceleration
    fn apply(&mut self, force: [f64; 3]) -> Sample {
        let gravity = match self.gravity {
            Some(prev) => [
                self.alpha * force[0] + (1.0 - self.alpha) * prev[0],
                self.alpha * force[1] + (1.0 - self.alpha) * prev[1],
                self.alpha * force[2] + (1.0 - self.alpha) * prev[2],
            ],
            None => force,
        };
        self.gravity = Some(gravity);

        let (pitch, roll) = gravity_to_attitude(gravity);
        Sample {
            acceleration_x: force[0] - gravity[0],
            acceleration_y: force[1] - gravity[1],
            acceleration_z: force[2] - gravity[2],
            pitch,
            roll,
            yaw: 0.0,
        }
    }
}

impl SampleReader for IioReader {
    fn read(&mut self) -> Result<Sample, SensorError> {
        let force = self.read_force()?;
        Ok(self.apply(force))
    }

    fn reset(&mut self) {
        self.gravity = None;
    }
}

/// Pitch and roll (radians) of a device whose accelerometer measures the
/// given gravity reaction. Flat and face-up is (0, 0); raising the top edge
/// gives positive pitch.
pub fn gravity_to_attitude(g: [f64; 3]) -> (f64, f64) {
    let pitch = g[1].atan2(g[2]);
    let roll = (-g[0]).atan2((g[1] * g[1] + g[2] * g[2]).sqrt());
    (pitch, roll)
}

/// Writes a fake IIO accelerometer (scale + raw x/y/z) into `dir`
#[cfg(test)]
pub(crate) fn write_fake_device(dir: &std::path::Path, scale: f64, raw: [i64; 3]) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("in_accel_scale"), format!("{}\n", scale)).unwrap();
    fs::write(dir.join("in_accel_x_raw"), format!("{}\n", raw[0])).unwrap();
    fs::write(dir.join("in_accel_y_raw"), format!("{}\n", raw[1])).unwrap();
    fs::write(dir.join("in_accel_z_raw"), format!("{}\n", raw[2])).unwrap();
}
