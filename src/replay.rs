use std::collections::VecDeque;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;

use crate::sensor::{SampleReader, SensorError};
use crate::types::Sample;

/// Column layout of a recorded trace
pub const CSV_HEADER: &str = "ax,ay,az,pitch,roll,yaw";

/// Loads a motion trace in the format `ax,ay,az,pitch,roll,yaw`
/// (accelerations in g, angles in radians), one sample per row.
pub fn load_samples_from_csv(path: impl AsRef<Path>) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Could not open CSV {:?}", path))?;

    let mut samples = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Invalid row {} in {:?}", row_idx + 1, path))?;
        if record.len() < 6 {
            bail!("Row {} has {} columns, expected 6", row_idx + 1, record.len());
        }

        let mut values = [0.0f64; 6];
        for (col, value) in values.iter_mut().enumerate() {
            *value = record[col]
                .parse()
                .with_context(|| format!("Invalid number in row {}, column {}", row_idx + 1, col + 1))?;
        }

        samples.push(Sample {
            acceleration_x: values[0],
            acceleration_y: values[1],
            acceleration_z: values[2],
            pitch: values[3],
            roll: values[4],
            yaw: values[5],
        });
    }

    if samples.is_empty() {
        bail!("CSV {:?} contains no samples", path);
    }

    Ok(samples)
}

/// Renders samples back into the trace format
pub fn samples_to_csv(samples: &[Sample]) -> String {
    let mut csv = format!("{}\n", CSV_HEADER);
    for s in samples {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            s.acceleration_x, s.acceleration_y, s.acceleration_z, s.pitch, s.roll, s.yaw
        ));
    }
    csv
}

/// Serves a recorded trace one sample per read.
pub struct ReplayReader {
    samples: VecDeque<Sample>,
}

impl ReplayReader {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(load_samples_from_csv(path)?))
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl SampleReader for ReplayReader {
    fn read(&mut self) -> Result<Sample, SensorError> {
        self.samples.pop_front().ok_or(SensorError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn trace_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_rows_in_order() {
        let trace = trace_file(
            "ax,ay,az,pitch,roll,yaw\n0.01, 0.0, 0.0, -0.2, 0.0, 1.0\n0.5,0,0,0,0,0\n",
        );
        let samples = load_samples_from_csv(trace.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].acceleration_x, 0.01);
        assert_eq!(samples[0].pitch, -0.2);
        assert_eq!(samples[0].yaw, 1.0);
        assert_eq!(samples[1].acceleration_x, 0.5);
    }

    #[test]
    fn rejects_short_rows_and_empty_traces() {
        let short = trace_file("ax,ay,az,pitch,roll,yaw\n0.1,0.2\n");
        assert!(load_samples_from_csv(short.path()).is_err());

        let empty = trace_file("ax,ay,az,pitch,roll,yaw\n");
        assert!(load_samples_from_csv(empty.path()).is_err());
    }

    #[test]
    fn rendered_trace_loads_back() {
        let samples = vec![Sample::at_rest_degrees(-12.0, 3.0)];
        let trace = trace_file(&samples_to_csv(&samples));
        assert_eq!(load_samples_from_csv(trace.path()).unwrap(), samples);
    }

    #[test]
    fn replay_reader_runs_dry() {
        let mut reader = ReplayReader::new(vec![Sample::default()]);
        assert_eq!(reader.remaining(), 1);
        assert!(reader.read().is_ok());
        assert!(matches!(reader.read(), Err(SensorError::Unavailable)));
    }
}
