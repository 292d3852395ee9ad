//! Background pruning of the tracked-process set
//!
//! Runs only while the registrar is running. Each tick drops tracked
//! entries whose process is gone. Stopping does not clear the set; stale
//! entries persist until the next prune or count read, matching the
//! launcher's prune-on-read behavior.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::trace;

use crate::launcher::ProcessSet;
use crate::platform::ProcessApi;
use crate::task::RepeatingTask;

/// Prune cadence while running.
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(5);

pub struct ProcessMonitor {
    procs: Arc<dyn ProcessApi>,
    tracked: Arc<ProcessSet>,
    interval: Duration,
    task: Mutex<Option<RepeatingTask>>,
}

impl ProcessMonitor {
    pub fn new(procs: Arc<dyn ProcessApi>, tracked: Arc<ProcessSet>) -> Self {
        Self {
            procs,
            tracked,
            interval: MONITOR_INTERVAL,
            task: Mutex::new(None),
        }
    }

    /// Shorten the prune cadence. Test hook.
    #[cfg(test)]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start the prune loop. Idempotent; an already-running loop is kept.
    pub fn start(&self) {
        let mut slot = self.task.lock().unwrap();
        if slot.is_some() {
            return;
        }

        let procs = self.procs.clone();
        let tracked = self.tracked.clone();
        *slot = Some(RepeatingTask::spawn("process-monitor", self.interval, move || {
            let live = tracked.prune(&*procs);
            trace!(live, "pruned tracked processes");
        }));
    }

    /// Stop the prune loop. The tracked set is intentionally left as-is.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.cancel();
        }
    }

    #[allow(dead_code)] // Public API for the GUI collaborator
    pub fn is_running(&self) -> bool {
        self.task.lock().unwrap().is_some()
    }
}
