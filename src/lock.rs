//! Lock-state telemetry
//!
//! Infers lock/unlock transitions from the foreground-window probe: no
//! foreground window in the interactive session means locked. The counter
//! moves only on the transition into locked, not on every poll while
//! locked, and each unlock accumulates the locked duration. Polling is the
//! caller's cadence; reading statistics never polls.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::platform::SessionApi;

/// Snapshot of the lock counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockStats {
    pub lock_count: u64,
    pub currently_locked: bool,
    pub last_lock_at: Option<Instant>,
    pub total_locked: Duration,
}

#[derive(Default)]
struct Counters {
    lock_count: u64,
    currently_locked: bool,
    last_lock_at: Option<Instant>,
    total_locked: Duration,
}

pub struct LockTelemetry {
    session: Arc<dyn SessionApi>,
    counters: Mutex<Counters>,
}

impl LockTelemetry {
    pub fn new(session: Arc<dyn SessionApi>) -> Self {
        Self {
            session,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Query the session probe once and fold the result into the counters.
    /// Returns whether the session currently reads as locked.
    pub fn poll_lock_state(&self) -> bool {
        let locked = !self.session.foreground_window_present();
        let mut counters = self.counters.lock().unwrap();

        if locked && !counters.currently_locked {
            counters.lock_count += 1;
            counters.last_lock_at = Some(Instant::now());
            info!(lock_count = counters.lock_count, "session locked");
        } else if !locked && counters.currently_locked {
            if let Some(at) = counters.last_lock_at {
                let held = at.elapsed();
                counters.total_locked += held;
                info!(locked_for = ?held, "session unlocked");
            } else {
                debug!("unlock observed without a recorded lock time");
            }
        }

        counters.currently_locked = locked;
        locked
    }

    /// Cheap counter read; performs no polling.
    pub fn statistics(&self) -> LockStats {
        let counters = self.counters.lock().unwrap();
        LockStats {
            lock_count: counters.lock_count,
            currently_locked: counters.currently_locked,
            last_lock_at: counters.last_lock_at,
            total_locked: counters.total_locked,
        }
    }
}
