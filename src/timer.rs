use crossbeam_channel::{after, bounded, select, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::controller::ControlEvent;

/// Single-shot timer that posts one event into the controller channel
/// unless it is cancelled (or dropped) first.
pub struct OneShot {
    cancel_tx: Option<Sender<()>>,
    fired: Arc<AtomicBool>,
}

impl OneShot {
    pub fn schedule(delay: Duration, events: Sender<ControlEvent>, event: ControlEvent) -> Self {
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        std::thread::spawn(move || {
            select! {
                // Fires on explicit cancel and when the sender is dropped
                recv(cancel_rx) -> _ => {}
                recv(after(delay)) -> _ => {
                    flag.store(true, Ordering::SeqCst);
                    let _ = events.send(event);
                }
            }
        });

        Self {
            cancel_tx: Some(cancel_tx),
            fired,
        }
    }

    pub fn cancel(&mut self) {
        self.cancel_tx.take();
    }

    /// True until the event has been posted or the timer cancelled
    pub fn is_armed(&self) -> bool {
        self.cancel_tx.is_some() && !self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for OneShot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Cancelable timer that brings the controller back from Idle.
///
/// At most one timer is live: `schedule` cancels any pending one first.
/// The generation is echoed back in `ControlEvent::TimerExpired` so the
/// controller can drop an expiry that raced with a cancel.
pub trait ReactivationTimer {
    fn schedule(&mut self, delay: Duration, generation: u64);
    fn cancel(&mut self);
    fn is_pending(&self) -> bool;
}

/// Thread-backed reactivation timer
pub struct ThreadTimer {
    events: Sender<ControlEvent>,
    pending: Option<OneShot>,
}

impl ThreadTimer {
    pub fn new(events: Sender<ControlEvent>) -> Self {
        Self {
            events,
            pending: None,
        }
    }
}

impl ReactivationTimer for ThreadTimer {
    fn schedule(&mut self, delay: Duration, generation: u64) {
        self.cancel();
        debug!(?delay, generation, "reactivation timer armed");
        self.pending = Some(OneShot::schedule(
            delay,
            self.events.clone(),
            ControlEvent::TimerExpired { generation },
        ));
    }

    fn cancel(&mut self) {
        if let Some(mut timer) = self.pending.take() {
            timer.cancel();
            debug!("reactivation timer cancelled");
        }
    }

    fn is_pending(&self) -> bool {
        self.pending.as_ref().map(OneShot::is_armed).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn one_shot_fires_once_after_delay() {
        let (tx, rx) = unbounded();
        let _timer = OneShot::schedule(
            Duration::from_millis(20),
            tx,
            ControlEvent::TimerExpired { generation: 7 },
        );

        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(event, ControlEvent::TimerExpired { generation: 7 }));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn cancelled_one_shot_never_fires() {
        let (tx, rx) = unbounded();
        let mut timer = OneShot::schedule(
            Duration::from_millis(50),
            tx,
            ControlEvent::TimerExpired { generation: 1 },
        );
        timer.cancel();
        assert!(!timer.is_armed());
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn rescheduling_replaces_the_pending_timer() {
        let (tx, rx) = unbounded();
        let mut timer = ThreadTimer::new(tx);

        timer.schedule(Duration::from_millis(40), 1);
        timer.schedule(Duration::from_millis(40), 2);
        assert!(timer.is_pending());

        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(event, ControlEvent::TimerExpired { generation: 2 }));
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    }

    #[test]
    fn fired_timer_is_no_longer_pending() {
        let (tx, rx) = unbounded();
        let mut timer = ThreadTimer::new(tx);
        timer.schedule(Duration::from_millis(10), 9);

        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(event, ControlEvent::TimerExpired { generation: 9 }));
        assert!(!timer.is_pending());
    }

    #[test]
    fn cancel_clears_pending_state() {
        let (tx, rx) = unbounded();
        let mut timer = ThreadTimer::new(tx);
        timer.schedule(Duration::from_millis(30), 4);
        timer.cancel();
        assert!(!timer.is_pending());
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    }
}
