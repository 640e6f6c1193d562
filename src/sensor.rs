use crossbeam_channel::{bounded, select, tick, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::controller::ControlEvent;
use crate::types::Sample;

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("No sample available this tick")]
    Unavailable,

    #[error("Sensor read failed: {0}")]
    Read(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces one reading on demand. Kept across Active periods.
pub trait SampleReader: Send + 'static {
    fn read(&mut self) -> Result<Sample, SensorError>;

    /// Drops any state carried over from an earlier Active period.
    /// Called before the first read of every period.
    fn reset(&mut self) {}
}

/// Delivery endpoint handed to a sensor source for one Active period.
#[derive(Clone)]
pub struct SampleSink {
    session: u64,
    events: Sender<ControlEvent>,
}

impl SampleSink {
    pub fn new(session: u64, events: Sender<ControlEvent>) -> Self {
        Self { session, events }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// Returns false once the controller loop has gone away
    pub fn deliver(&self, reading: Result<Sample, SensorError>) -> bool {
        self.events
            .send(ControlEvent::Sample {
                session: self.session,
                reading,
            })
            .is_ok()
    }
}

pub trait SensorSource {
    fn start_updates(&mut self, interval: Duration, sink: SampleSink);
    fn stop_updates(&mut self);
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Sensor source that polls a reader on its own thread at a fixed cadence.
pub struct PolledSensor<R: SampleReader> {
    reader: Arc<Mutex<R>>,
    worker: Option<Worker>,
}

impl<R: SampleReader> PolledSensor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Arc::new(Mutex::new(reader)),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl<R: SampleReader> SensorSource for PolledSensor<R> {
    fn start_updates(&mut self, interval: Duration, sink: SampleSink) {
        if self.worker.is_some() {
            self.stop_updates();
        }

        self.reader.lock().reset();

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let reader = Arc::clone(&self.reader);

        let handle = std::thread::spawn(move || {
            let ticker = tick(interval);
            debug!(session = sink.session(), ?interval, "sensor polling started");

            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        let reading = reader.lock().read();
                        if !sink.deliver(reading) {
                            warn!("Controller channel closed, stopping sensor polling");
                            break;
                        }
                    }
                }
            }

            debug!(session = sink.session(), "sensor polling stopped");
        });

        self.worker = Some(Worker { stop_tx, handle });
    }

    fn stop_updates(&mut self) {
        if let Some(worker) = self.worker.take() {
            drop(worker.stop_tx);
            if worker.handle.join().is_err() {
                warn!("Sensor polling thread panicked");
            }
        }
    }
}

impl<R: SampleReader> Drop for PolledSensor<R> {
    fn drop(&mut self) {
        self.stop_updates();
    }
}
