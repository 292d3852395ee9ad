//! Deduplicated target launching
//!
//! Triggering a chord must never pile up duplicate processes: at most one
//! tracked instance exists per canonical executable path. URLs and folders
//! go straight to the system opener and are never tracked. For files the
//! order is: tracked set, then the OS-wide process table (adopting a match),
//! then an actual spawn followed by a short settle delay so the process
//! table has the new entry before it is recorded.
//!
//! `launch` never returns an error; every failure is logged and recovered
//! here. The absence of a tracked entry afterwards is the caller's signal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::platform::ProcessApi;
use crate::target::Target;

/// How long to wait after a spawn before checking the process table.
const SPAWN_SETTLE: Duration = Duration::from_millis(500);

/// A process this core is responsible for deduplicating launches against.
#[derive(Debug, Clone)]
pub struct TrackedProcess {
    pub pid: u32,
    pub exe: PathBuf,
    pub discovered_at: Instant,
}

/// Pid-keyed tracked-process set, shared between the launcher, the monitor
/// loop, and synchronous count reads. Every read-modify-write happens under
/// the mutex; pruning replaces the survivor set atomically.
#[derive(Default)]
pub struct ProcessSet {
    inner: Mutex<HashMap<u32, TrackedProcess>>,
}

impl ProcessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a process. Entries never share a pid; re-inserting one is a
    /// no-op for dedup purposes but refreshes the stored path.
    pub fn insert(&self, pid: u32, exe: PathBuf) {
        self.inner.lock().unwrap().insert(
            pid,
            TrackedProcess {
                pid,
                exe,
                discovered_at: Instant::now(),
            },
        );
    }

    /// A live tracked entry whose executable equals `exe`, if any. Dead
    /// entries encountered on the way are left for the next prune.
    pub fn live_entry_for(&self, procs: &dyn ProcessApi, exe: &Path) -> Option<TrackedProcess> {
        let inner = self.inner.lock().unwrap();
        inner
            .values()
            .find(|t| t.exe == exe && procs.is_alive(t.pid))
            .cloned()
    }

    /// Drop entries whose process is gone; returns the surviving count.
    pub fn prune(&self, procs: &dyn ProcessApi) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.retain(|pid, _| procs.is_alive(*pid));
        inner.len()
    }

    /// Raw entry count without a liveness check.
    #[allow(dead_code)] // Public API for the GUI collaborator
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    #[allow(dead_code)] // Public API for the GUI collaborator
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

/// Launches targets with per-path process deduplication.
pub struct Launcher {
    procs: Arc<dyn ProcessApi>,
    tracked: Arc<ProcessSet>,
    settle: Duration,
}

impl Launcher {
    pub fn new(procs: Arc<dyn ProcessApi>, tracked: Arc<ProcessSet>) -> Self {
        Self {
            procs,
            tracked,
            settle: SPAWN_SETTLE,
        }
    }

    /// Shorten the post-spawn settle delay. Test hook.
    #[cfg(test)]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Dispatch a target. Infallible by contract; failures are logged.
    pub async fn launch(&self, target: &Target) {
        match target {
            Target::Url(url) => match self.procs.open_url(url) {
                Ok(()) => info!(%url, "opened url"),
                Err(e) => error!(%url, error = %e, "failed to open url"),
            },
            Target::Dir(path) => match self.procs.open_dir(path) {
                Ok(()) => info!(path = %path.display(), "opened folder"),
                Err(e) => error!(path = %path.display(), error = %e, "failed to open folder"),
            },
            Target::File(path) => self.launch_file(path).await,
        }
    }

    async fn launch_file(&self, path: &Path) {
        let canonical = match self.procs.canonicalize(path) {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(path = %path.display(), error = %e, "target no longer resolvable");
                return;
            }
        };

        // Already tracked and alive: launching is a no-op.
        if let Some(entry) = self.tracked.live_entry_for(&*self.procs, &canonical) {
            info!(
                pid = entry.pid,
                tracked_for = ?entry.discovered_at.elapsed(),
                exe = %canonical.display(),
                "already running (tracked)"
            );
            return;
        }

        // Running outside our knowledge: adopt instead of spawning a twin.
        if let Some(pid) = self.procs.find_by_exe(&canonical) {
            info!(pid, exe = %canonical.display(), "already running, adopting");
            self.tracked.insert(pid, canonical);
            return;
        }

        let pid = match self.procs.spawn(&canonical) {
            Ok(pid) => pid,
            Err(e) => {
                error!(exe = %canonical.display(), error = %e, "spawn failed");
                return;
            }
        };
        debug!(pid, exe = %canonical.display(), "spawned, waiting for process table");

        // Let the OS populate process metadata before trusting the pid.
        tokio::time::sleep(self.settle).await;

        if self.procs.is_alive(pid) {
            info!(pid, exe = %canonical.display(), "launched");
            self.tracked.insert(pid, canonical);
        } else {
            error!(pid, exe = %canonical.display(), "process exited during settle");
        }
    }
}
