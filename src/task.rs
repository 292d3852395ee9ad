//! Cancellable repeating task
//!
//! Periodic work here (process pruning, wake refresh ticks) reschedules
//! itself after each run rather than using a fixed-rate scheduler, so drift
//! accumulates by the execution time of each tick. That is acceptable at
//! second granularity; what is NOT acceptable is a tick firing after its
//! owner stopped it. The active flag is checked before executing the tick
//! body and again before rescheduling, and dropping the handle cancels the
//! pending sleep.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

/// Handle to a self-rescheduling background tick. Dropping it cancels the
/// task: no tick body runs after the handle is gone.
pub struct RepeatingTask {
    name: &'static str,
    active: Arc<AtomicBool>,
    // Dropping the sender wakes the select below and ends the loop.
    _cancel_tx: oneshot::Sender<()>,
}

impl RepeatingTask {
    /// Spawn a task that runs `tick` every `interval`, starting one interval
    /// from now.
    pub fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let flag = active.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if !flag.load(Ordering::SeqCst) {
                            break;
                        }
                        tick();
                        if !flag.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    _ = &mut cancel_rx => break,
                }
            }
            debug!(task = name, "repeating task exited");
        });

        Self {
            name,
            active,
            _cancel_tx: cancel_tx,
        }
    }

    /// Stop the task. A tick already mid-execution may finish, but no tick
    /// starts or reschedules after this returns.
    pub fn cancel(self) {
        debug!(task = self.name, "cancelling repeating task");
        // Drop runs next and does the rest.
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
