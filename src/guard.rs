use crossbeam_channel::Sender;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::controller::ControlEvent;
use crate::timer::OneShot;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Lifecycle guard already held (token {0})")]
    AlreadyHeld(u64),

    #[error("Lifecycle guard denied: {0}")]
    Denied(String),
}

/// Grant of extended execution time. Move-only: it can be released once.
#[derive(Debug, PartialEq, Eq)]
pub struct LifecycleToken {
    id: u64,
}

impl LifecycleToken {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Platform mechanism keeping the process alive while sampling.
///
/// Out-of-band revocation is reported as `ControlEvent::GuardExpired`
/// carrying the token id.
pub trait LifecycleGuard {
    fn acquire(&mut self) -> Result<LifecycleToken, GuardError>;
    fn release(&mut self, token: LifecycleToken);
}

/// Guard with an optional execution-time cap per grant.
pub struct TimedGuard {
    max_active: Option<Duration>,
    events: Sender<ControlEvent>,
    next_id: u64,
    held: Option<u64>,
    expiry: Option<OneShot>,
}

impl TimedGuard {
    pub fn new(max_active: Option<Duration>, events: Sender<ControlEvent>) -> Self {
        Self {
            max_active,
            events,
            next_id: 1,
            held: None,
            expiry: None,
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }
}

impl LifecycleGuard for TimedGuard {
    fn acquire(&mut self) -> Result<LifecycleToken, GuardError> {
        if let Some(id) = self.held {
            return Err(GuardError::AlreadyHeld(id));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.held = Some(id);

        if let Some(cap) = self.max_active {
            self.expiry = Some(OneShot::schedule(
                cap,
                self.events.clone(),
                ControlEvent::GuardExpired { token: id },
            ));
        }

        info!(token = id, cap = ?self.max_active, "lifecycle guard acquired");
        Ok(LifecycleToken::new(id))
    }

    fn release(&mut self, token: LifecycleToken) {
        if self.held != Some(token.id()) {
            debug!(token = token.id(), "release of a token that is no longer held");
            return;
        }
        self.held = None;
        if let Some(mut expiry) = self.expiry.take() {
            expiry.cancel();
        }
        info!(token = token.id(), "lifecycle guard released");
    }
}
