use crossbeam_channel::{unbounded, Sender};
use dbus::arg::PropMap;
use dbus::blocking::Connection;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

const APP_NAME: &str = "posture-monitor";
const SUMMARY: &str = "Posture";
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);
/// Notification display time in milliseconds (-1 = server default)
const EXPIRE_TIMEOUT_MS: i32 = -1;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Alert dispatcher is not running")]
    Closed,

    #[error("D-Bus error: {0}")]
    Dbus(#[from] dbus::Error),
}

/// Capability consumed by the controller: fire-and-forget delivery
/// of a user-facing message.
pub trait AlertDispatcher {
    fn send(&self, message: &str) -> Result<(), DispatchError>;
}

/// Concrete delivery mechanism, driven from the dispatcher thread.
pub trait Notifier {
    fn notify(&mut self, message: &str) -> Result<(), DispatchError>;
}

/// Desktop notifications through `org.freedesktop.Notifications`.
/// Each alert replaces the previous bubble instead of stacking.
pub struct DesktopNotifier {
    conn: Connection,
    last_id: u32,
}

impl DesktopNotifier {
    pub fn new() -> Result<Self, DispatchError> {
        let conn = Connection::new_session()?;
        Ok(Self { conn, last_id: 0 })
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&mut self, message: &str) -> Result<(), DispatchError> {
        let proxy = self.conn.with_proxy(
            "org.freedesktop.Notifications",
            "/org/freedesktop/Notifications",
            NOTIFY_TIMEOUT,
        );
        let actions: Vec<&str> = Vec::new();
        let hints = PropMap::new();

        let (id,): (u32,) = proxy.method_call(
            "org.freedesktop.Notifications",
            "Notify",
            (
                APP_NAME,
                self.last_id,
                "",
                SUMMARY,
                message,
                actions,
                hints,
                EXPIRE_TIMEOUT_MS,
            ),
        )?;
        self.last_id = id;
        Ok(())
    }
}

/// Writes alerts to the log; used when no notification daemon is wanted.
#[derive(Debug, Default)]
pub struct LogNotifier {
    delivered: u64,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl Notifier for LogNotifier {
    fn notify(&mut self, message: &str) -> Result<(), DispatchError> {
        self.delivered += 1;
        info!(target: "posture_monitor::alert", "🔔 {}", message);
        Ok(())
    }
}

/// Handle to the dispatcher thread
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: Sender<String>,
}

impl AlertDispatcher for ChannelDispatcher {
    fn send(&self, message: &str) -> Result<(), DispatchError> {
        self.tx
            .send(message.to_string())
            .map_err(|_| DispatchError::Closed)
    }
}

/// Runs a notifier on its own thread. The notifier is built inside the
/// thread; if that fails the thread exits and every later `send` returns
/// `DispatchError::Closed`.
pub fn spawn_dispatcher<N, F>(factory: F) -> ChannelDispatcher
where
    N: Notifier,
    F: FnOnce() -> Result<N, DispatchError> + Send + 'static,
{
    let (tx, rx) = unbounded::<String>();

    std::thread::spawn(move || {
        let mut notifier = match factory() {
            Ok(n) => n,
            Err(e) => {
                error!("Could not initialise notifier: {}", e);
                return;
            }
        };

        while let Ok(message) = rx.recv() {
            if let Err(e) = notifier.notify(&message) {
                warn!("Alert delivery failed: {}", e);
            }
        }
    });

    ChannelDispatcher { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Recording {
        seen: Arc<Mutex<Vec<String>>>,
        done: Sender<()>,
    }

    impl Notifier for Recording {
        fn notify(&mut self, message: &str) -> Result<(), DispatchError> {
            self.seen.lock().push(message.to_string());
            let _ = self.done.send(());
            Ok(())
        }
    }

    #[test]
    fn messages_reach_the_notifier_verbatim() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = unbounded();
        let seen_clone = Arc::clone(&seen);

        let dispatcher = spawn_dispatcher(move || {
            Ok(Recording {
                seen: seen_clone,
                done: done_tx,
            })
        });

        dispatcher.send("first").unwrap();
        dispatcher.send("second").unwrap();
        done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        done_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        assert_eq!(*seen.lock(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn failed_notifier_setup_closes_the_dispatcher() {
        let dispatcher = spawn_dispatcher(|| -> Result<LogNotifier, DispatchError> {
            Err(DispatchError::Closed)
        });

        // The thread drops its receiver once setup fails
        let mut result = Ok(());
        for _ in 0..100 {
            result = dispatcher.send("lost");
            if result.is_err() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(matches!(result, Err(DispatchError::Closed)));
    }

    #[test]
    fn log_notifier_counts_deliveries() {
        let mut notifier = LogNotifier::new();
        notifier.notify("hello").unwrap();
        assert_eq!(notifier.delivered(), 1);
    }
}
