/*
Posture monitor daemon.

Samples the accelerometer once per second. While the device is held still
it reports how the posture looks (desktop notification or log line); when
the device is picked up or carried, sampling pauses for a minute.

Run against the first IIO accelerometer:
    ./target/release/posture-monitor

With a config file and/or a recorded trace:
    ./target/release/posture-monitor --config posture.toml --replay trace.csv

Verbose logs:
    RUST_LOG=posture_monitor=debug ./target/release/posture-monitor
*/

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::unbounded;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use posture_monitor::alert::{spawn_dispatcher, ChannelDispatcher, DesktopNotifier, LogNotifier};
use posture_monitor::config::{MonitorConfig, NotifierKind, SensorKind};
use posture_monitor::controller::{
    ControlEvent, ControllerStats, MonitorHandle, SamplingController,
};
use posture_monitor::guard::TimedGuard;
use posture_monitor::iio::IioReader;
use posture_monitor::lifecycle::watch_screensaver;
use posture_monitor::replay::ReplayReader;
use posture_monitor::sensor::{PolledSensor, SampleReader};
use posture_monitor::timer::ThreadTimer;

const USAGE: &str = "Usage: posture-monitor [--config <file.toml>] [--replay <trace.csv>]";

struct Options {
    config: Option<PathBuf>,
    replay: Option<PathBuf>,
}

fn parse_args() -> Result<Options> {
    let mut config = None;
    let mut replay = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(PathBuf::from(
                    args.next().ok_or_else(|| anyhow!("--config needs a path\n{}", USAGE))?,
                ));
            }
            "--replay" => {
                replay = Some(PathBuf::from(
                    args.next().ok_or_else(|| anyhow!("--replay needs a path\n{}", USAGE))?,
                ));
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => bail!("Unknown argument {:?}\n{}", other, USAGE),
        }
    }

    Ok(Options { config, replay })
}

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(d) = "posture_monitor=info".parse() {
        filter = filter.add_directive(d);
    }
    fmt().with_env_filter(filter).init();
}

fn run_with_reader<R: SampleReader>(
    config: &MonitorConfig,
    reader: R,
    alerts: ChannelDispatcher,
) -> ControllerStats {
    let (tx, rx) = unbounded::<ControlEvent>();
    let handle = MonitorHandle::new(tx.clone());

    let controller = SamplingController::new(
        config.controller_settings(),
        PolledSensor::new(reader),
        TimedGuard::new(config.guard_max_active(), tx.clone()),
        alerts,
        ThreadTimer::new(tx.clone()),
        tx,
    );

    let watcher_handle = handle.clone();
    std::thread::spawn(move || {
        if let Err(e) = watch_screensaver(watcher_handle) {
            warn!("Screensaver watcher unavailable, monitoring stays on: {}", e);
        }
    });

    // The host is in the foreground at launch
    handle.start();
    controller.run(rx)
}

fn main() -> Result<()> {
    init_logging();
    info!("🧍 Posture monitor starting");

    let opts = parse_args()?;
    let mut config = match &opts.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(path) = opts.replay {
        config.sensor.kind = SensorKind::Replay;
        config.sensor.replay_path = Some(path);
    }
    config.validate()?;

    let alerts = match config.notifier {
        NotifierKind::Desktop => spawn_dispatcher(DesktopNotifier::new),
        NotifierKind::Log => spawn_dispatcher(|| Ok(LogNotifier::new())),
    };

    let stats = match config.sensor.kind {
        SensorKind::Iio => {
            info!("📡 IIO accelerometer at {:?}", config.sensor.device);
            let reader = IioReader::new(&config.sensor.device, config.sensor.gravity_alpha);
            run_with_reader(&config, reader, alerts)
        }
        SensorKind::Replay => {
            let path = config
                .sensor
                .replay_path
                .clone()
                .ok_or_else(|| anyhow!("sensor.replay_path is not set"))?;
            info!("🎞️  Replaying motion trace {:?}", path);
            let reader = ReplayReader::from_csv(&path)?;
            run_with_reader(&config, reader, alerts)
        }
    };

    info!(
        activations = stats.activations,
        classified = stats.samples_classified,
        alerts = stats.alerts_sent,
        "👋 Posture monitor stopped"
    );
    Ok(())
}
