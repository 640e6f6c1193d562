//! Duty-cycling control loop.
//!
//! Every input (sensor ticks, timer and guard expiry, outer start/stop
//! requests) arrives as a [`ControlEvent`] on one channel and is applied by
//! a single consumer, so state transitions never overlap.

use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::alert::AlertDispatcher;
use crate::classifier::MotionClassifier;
use crate::guard::{GuardError, LifecycleGuard, LifecycleToken};
use crate::sensor::{SampleSink, SensorError, SensorSource};
use crate::timer::ReactivationTimer;
use crate::types::{MonitoringState, MotionVerdict, Sample, REACTIVATION_DELAY, SAMPLE_INTERVAL};

#[derive(Debug)]
pub enum ControlEvent {
    Start,
    Stop,
    Shutdown,
    /// One sensor tick, tagged with the Active period that produced it
    Sample {
        session: u64,
        reading: Result<Sample, SensorError>,
    },
    TimerExpired {
        generation: u64,
    },
    GuardExpired {
        token: u64,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub sample_interval: Duration,
    pub reactivation_delay: Duration,
    /// Send the posture message on every stationary tick
    pub alert_on_stationary: bool,
    pub classifier: MotionClassifier,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            sample_interval: SAMPLE_INTERVAL,
            reactivation_delay: REACTIVATION_DELAY,
            alert_on_stationary: true,
            classifier: MotionClassifier::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub activations: u64,
    pub samples_classified: u64,
    pub ticks_skipped: u64,
    pub alerts_sent: u64,
    pub dispatch_failures: u64,
    pub reactivations_scheduled: u64,
    pub guard_expiries: u64,
}

pub struct SamplingController<S, G, A, T> {
    settings: ControllerSettings,
    sensor: S,
    guard: G,
    alerts: A,
    timer: T,
    events: Sender<ControlEvent>,

    /// Present exactly while Active
    token: Option<LifecycleToken>,
    session: u64,
    timer_generation: u64,
    stats: ControllerStats,
}

impl<S, G, A, T> SamplingController<S, G, A, T>
where
    S: SensorSource,
    G: LifecycleGuard,
    A: AlertDispatcher,
    T: ReactivationTimer,
{
    pub fn new(
        settings: ControllerSettings,
        sensor: S,
        guard: G,
        alerts: A,
        timer: T,
        events: Sender<ControlEvent>,
    ) -> Self {
        Self {
            settings,
            sensor,
            guard,
            alerts,
            timer,
            events,
            token: None,
            session: 0,
            timer_generation: 0,
            stats: ControllerStats::default(),
        }
    }

    pub fn state(&self) -> MonitoringState {
        if self.token.is_some() {
            MonitoringState::Active
        } else {
            MonitoringState::Idle
        }
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn start(&mut self) -> Result<(), GuardError> {
        if self.token.is_some() {
            debug!("start ignored: already active");
            return Ok(());
        }

        self.invalidate_timer();
        let token = self.guard.acquire()?;

        self.session += 1;
        self.sensor.start_updates(
            self.settings.sample_interval,
            SampleSink::new(self.session, self.events.clone()),
        );
        info!(session = self.session, token = token.id(), "▶️  monitoring active");

        self.token = Some(token);
        self.stats.activations += 1;
        Ok(())
    }

    /// Stops sampling. While Idle this only drops a pending reactivation.
    pub fn stop(&mut self) {
        self.invalidate_timer();
        if !self.deactivate() {
            debug!("stop ignored: already idle");
        }
    }

    pub fn on_sample(&mut self, session: u64, reading: Result<Sample, SensorError>) {
        if self.token.is_none() || session != self.session {
            debug!(session, current = self.session, "dropping sample from a finished period");
            return;
        }

        let sample = match reading {
            Ok(sample) => sample,
            Err(SensorError::Unavailable) => {
                self.stats.ticks_skipped += 1;
                debug!("no sample this tick");
                return;
            }
            Err(e) => {
                self.stats.ticks_skipped += 1;
                warn!("Skipping sensor tick: {}", e);
                return;
            }
        };

        self.stats.samples_classified += 1;
        match self.settings.classifier.classify(&sample) {
            MotionVerdict::Moving => {
                debug!(max_accel = sample.max_abs_acceleration(), "device moving");
                self.stop();
                self.schedule_reactivation();
            }
            MotionVerdict::Stationary(posture) => {
                let (pitch, roll, yaw) = sample.attitude_degrees();
                debug!(pitch, roll, yaw, verdict = posture.as_str(), "device stationary");
                if self.settings.alert_on_stationary {
                    match self.alerts.send(posture.message()) {
                        Ok(()) => self.stats.alerts_sent += 1,
                        Err(e) => {
                            self.stats.dispatch_failures += 1;
                            warn!("Alert dispatch failed: {}", e);
                        }
                    }
                }
            }
        }
    }

    pub fn on_timer_expired(&mut self, generation: u64) {
        if generation != self.timer_generation {
            debug!(generation, current = self.timer_generation, "stale reactivation ignored");
            return;
        }
        if self.token.is_some() {
            return;
        }

        info!("⏰ reactivation timer fired");
        if let Err(e) = self.start() {
            warn!("Could not resume monitoring: {}", e);
        }
    }

    /// Guard revoked out-of-band: same teardown as `stop`, no reactivation
    pub fn on_guard_expired(&mut self, token: u64) {
        let current = self.token.as_ref().map(LifecycleToken::id);
        if current != Some(token) {
            debug!(token, "expiry for a token that is no longer held");
            return;
        }

        warn!(token, "lifecycle guard expired, forcing idle");
        self.stats.guard_expiries += 1;
        self.invalidate_timer();
        self.deactivate();
    }

    /// Applies one event; returns false when the loop should end
    pub fn handle(&mut self, event: ControlEvent) -> bool {
        match event {
            ControlEvent::Start => {
                if let Err(e) = self.start() {
                    warn!("Could not start monitoring: {}", e);
                }
            }
            ControlEvent::Stop => self.stop(),
            ControlEvent::Shutdown => return false,
            ControlEvent::Sample { session, reading } => self.on_sample(session, reading),
            ControlEvent::TimerExpired { generation } => self.on_timer_expired(generation),
            ControlEvent::GuardExpired { token } => self.on_guard_expired(token),
        }
        true
    }

    /// Consumes events until `Shutdown`, then leaves every resource released.
    pub fn run(mut self, events: Receiver<ControlEvent>) -> ControllerStats {
        while let Ok(event) = events.recv() {
            if !self.handle(event) {
                break;
            }
        }
        self.stop();
        info!(stats = ?self.stats, "monitoring loop finished");
        self.stats
    }

    fn deactivate(&mut self) -> bool {
        let Some(token) = self.token.take() else {
            return false;
        };
        self.sensor.stop_updates();
        info!(session = self.session, token = token.id(), "⏸️  monitoring idle");
        self.guard.release(token);
        true
    }

    fn invalidate_timer(&mut self) {
        self.timer_generation += 1;
        self.timer.cancel();
    }

    fn schedule_reactivation(&mut self) {
        self.timer_generation += 1;
        self.timer
            .schedule(self.settings.reactivation_delay, self.timer_generation);
        self.stats.reactivations_scheduled += 1;
        info!(delay = ?self.settings.reactivation_delay, "🚶 movement detected, sampling paused");
    }
}

/// Cloneable entry point for whatever observes the host lifecycle.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: Sender<ControlEvent>,
}

impl MonitorHandle {
    pub fn new(tx: Sender<ControlEvent>) -> Self {
        Self { tx }
    }

    /// Returns false once the controller loop has ended
    pub fn start(&self) -> bool {
        self.tx.send(ControlEvent::Start).is_ok()
    }

    pub fn stop(&self) -> bool {
        self.tx.send(ControlEvent::Stop).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.tx.send(ControlEvent::Shutdown).is_ok()
    }
}
