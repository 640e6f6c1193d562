use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use posture_monitor::config::MonitorConfig;
use posture_monitor::replay::load_samples_from_csv;
use posture_monitor::types::MotionVerdict;

struct ReplayOptions {
    config: Option<PathBuf>,
    quiet: bool,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut config = None;
    let mut quiet = false;
    let mut csv_path: Option<PathBuf> = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--quiet" => quiet = true,
            "--config" => {
                config = Some(PathBuf::from(
                    args.next().ok_or_else(|| anyhow!("--config needs a path"))?,
                ));
            }
            _ => {
                if csv_path.is_some() {
                    bail!("Usage: replay_csv [--quiet] [--config <file.toml>] <trace.csv>");
                }
                csv_path = Some(PathBuf::from(arg));
            }
        }
    }

    let csv_path = csv_path.ok_or_else(|| anyhow!("A CSV trace is required"))?;
    Ok((csv_path, ReplayOptions { config, quiet }))
}

fn main() -> Result<()> {
    let (csv_path, opts) = parse_args()?;
    let config = match &opts.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    let classifier = config.controller_settings().classifier;

    println!("🎞️  Classifying trace {:?}", csv_path);
    let samples = load_samples_from_csv(&csv_path)?;

    let mut moving = 0usize;
    let mut postures: BTreeMap<&'static str, usize> = BTreeMap::new();

    for (idx, sample) in samples.iter().enumerate() {
        let verdict = classifier.classify(sample);
        let (pitch, roll, _) = sample.attitude_degrees();

        let label = match verdict {
            MotionVerdict::Moving => {
                moving += 1;
                "moving"
            }
            MotionVerdict::Stationary(posture) => {
                *postures.entry(posture.as_str()).or_insert(0) += 1;
                posture.as_str()
            }
        };

        if !opts.quiet {
            println!(
                "  {:>5}  max|a|={:>7.4}  pitch={:>7.2}°  roll={:>7.2}°  {}",
                idx,
                sample.max_abs_acceleration(),
                pitch,
                roll,
                label
            );
        }
    }

    println!("\n{} samples, {} moving", samples.len(), moving);
    for (label, count) in &postures {
        println!("  {:<16} {:>5}", label, count);
    }

    Ok(())
}
