use dbus::blocking::Connection;
use dbus::message::MatchRule;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::controller::MonitorHandle;

/// Screensaver interfaces that emit `ActiveChanged(bool)`
const SCREENSAVER_INTERFACES: [&str; 2] = ["org.freedesktop.ScreenSaver", "org.gnome.ScreenSaver"];

/// Host transitions that drive the duty cycle from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    ScreenOn,
    ScreenOff,
}

impl HostEvent {
    /// Screensaver active means the screen went off
    pub fn from_screensaver_active(active: bool) -> Self {
        if active {
            HostEvent::ScreenOff
        } else {
            HostEvent::ScreenOn
        }
    }
}

/// Forwards a host event; returns false once the controller loop is gone.
pub fn apply_host_event(handle: &MonitorHandle, event: HostEvent) -> bool {
    match event {
        HostEvent::ScreenOn => {
            info!("🔆 screen on");
            handle.start()
        }
        HostEvent::ScreenOff => {
            info!("🌑 screen off");
            handle.stop()
        }
    }
}

/// Follows screensaver activation on the session bus and starts/stops
/// monitoring accordingly. Blocks until the controller loop ends.
pub fn watch_screensaver(handle: MonitorHandle) -> Result<(), dbus::Error> {
    let conn = Connection::new_session()?;
    let running = Arc::new(AtomicBool::new(true));

    for interface in SCREENSAVER_INTERFACES {
        let handle = handle.clone();
        let running = Arc::clone(&running);
        let rule = MatchRule::new_signal(interface, "ActiveChanged");

        conn.add_match(rule, move |(active,): (bool,), _, _| {
            debug!(interface, active, "screensaver signal");
            if !apply_host_event(&handle, HostEvent::from_screensaver_active(active)) {
                running.store(false, Ordering::Relaxed);
                return false;
            }
            true
        })?;
    }

    info!("👀 watching screensaver state on the session bus");

    while running.load(Ordering::Relaxed) {
        conn.process(Duration::from_secs(1))?;
    }

    warn!("Controller gone, screensaver watcher exiting");
    Ok(())
}
