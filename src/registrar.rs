//! Hotkey registration lifecycle
//!
//! Owns the Idle → Starting → Running → Stopping → Idle state machine.
//! Starting installs one OS hook per binding and spawns the dispatch loop
//! that drains hook triggers into the launcher, plus the process monitor.
//! Individual hook failures are collected rather than fatal: the start
//! succeeds when at least one hook installed, and the failed chords are
//! reported so the caller can warn the user.
//!
//! Hooks are snapshotted at start; a binding added while running is not
//! hot-swapped in. Callers re-register with `stop()` then `start()`. This
//! is a known limitation, not an oversight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::bindings::BindingTable;
use crate::chord::Chord;
use crate::error::Error;
use crate::launcher::Launcher;
use crate::monitor::ProcessMonitor;
use crate::platform::{HookId, HotkeyHook};
use crate::target::Target;
use crate::task::RepeatingTask;

/// How often the dispatch loop drains pending hook triggers.
const DISPATCH_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrarState {
    Idle,
    Starting,
    Running,
    Stopping,
}

pub struct HotkeyRegistrar {
    hook: Arc<dyn HotkeyHook>,
    table: Arc<BindingTable>,
    launcher: Arc<Launcher>,
    monitor: Arc<ProcessMonitor>,
    state: Mutex<RegistrarState>,
    installed: Arc<Mutex<HashMap<HookId, (Chord, Target)>>>,
    dispatch: Mutex<Option<RepeatingTask>>,
}

impl HotkeyRegistrar {
    pub fn new(
        hook: Arc<dyn HotkeyHook>,
        table: Arc<BindingTable>,
        launcher: Arc<Launcher>,
        monitor: Arc<ProcessMonitor>,
    ) -> Self {
        Self {
            hook,
            table,
            launcher,
            monitor,
            state: Mutex::new(RegistrarState::Idle),
            installed: Arc::new(Mutex::new(HashMap::new())),
            dispatch: Mutex::new(None),
        }
    }

    pub fn state(&self) -> RegistrarState {
        *self.state.lock().unwrap()
    }

    /// Install hooks for every binding and begin dispatching triggers.
    ///
    /// Fails fast with `NoBindings` or `InsufficientPrivilege` (the latter
    /// is recoverable; retry after elevating). Per-hook install failures are
    /// collected: when every hook fails the start is abandoned, otherwise
    /// the registrar runs with what installed and `PartialRegistration`
    /// reports the rest. Calling this while running is a no-op.
    pub fn start(&self) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        if *state != RegistrarState::Idle {
            debug!(state = ?*state, "start ignored, not idle");
            return Ok(());
        }
        *state = RegistrarState::Starting;

        let bindings = self.table.snapshot();
        if bindings.is_empty() {
            *state = RegistrarState::Idle;
            return Err(Error::NoBindings);
        }

        if !self.hook.is_privileged() {
            *state = RegistrarState::Idle;
            error!("global hotkey hooks refused at current privilege level");
            return Err(Error::InsufficientPrivilege);
        }

        let mut installed = HashMap::new();
        let mut failed = Vec::new();
        for (chord, target) in bindings {
            match self.hook.install(&chord) {
                Ok(id) => {
                    info!(%chord, %target, "hotkey registered");
                    installed.insert(id, (chord, target));
                }
                Err(e) => {
                    error!(%chord, error = %e, "hotkey registration failed");
                    failed.push(chord.as_str().to_string());
                }
            }
        }

        if installed.is_empty() {
            *state = RegistrarState::Idle;
            failed.sort();
            return Err(Error::PartialRegistration { failed });
        }

        *self.installed.lock().unwrap() = installed;
        self.spawn_dispatch();
        self.monitor.start();
        *state = RegistrarState::Running;
        info!(hooks = self.installed.lock().unwrap().len(), "hotkey listening started");

        if failed.is_empty() {
            Ok(())
        } else {
            failed.sort();
            Err(Error::PartialRegistration { failed })
        }
    }

    /// Uninstall every hook and stop the dispatch and monitor loops.
    /// No-op when already idle. Per-hook uninstall errors are logged, never
    /// propagated; the tracked-process set is left for later prunes.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == RegistrarState::Idle {
            debug!("stop ignored, not running");
            return;
        }
        *state = RegistrarState::Stopping;

        if let Some(task) = self.dispatch.lock().unwrap().take() {
            task.cancel();
        }

        let hooks: Vec<(HookId, Chord)> = self
            .installed
            .lock()
            .unwrap()
            .drain()
            .map(|(id, (chord, _))| (id, chord))
            .collect();

        let mut removed = 0usize;
        for (id, chord) in hooks {
            match self.hook.uninstall(id) {
                Ok(()) => {
                    debug!(%chord, "hotkey unregistered");
                    removed += 1;
                }
                Err(e) => warn!(%chord, error = %e, "hotkey unregistration failed"),
            }
        }

        self.monitor.stop();
        *state = RegistrarState::Idle;
        info!(removed, "hotkey listening stopped");
    }

    fn spawn_dispatch(&self) {
        let hook = self.hook.clone();
        let installed = self.installed.clone();
        let launcher = self.launcher.clone();

        let task = RepeatingTask::spawn("hotkey-dispatch", DISPATCH_POLL, move || {
            while let Some(id) = hook.try_recv() {
                let Some((chord, target)) = installed.lock().unwrap().get(&id).cloned() else {
                    debug!(id, "trigger for unknown hook dropped");
                    continue;
                };
                info!(%chord, %target, "hotkey triggered");

                let launcher = launcher.clone();
                tokio::spawn(async move {
                    launcher.launch(&target).await;
                });
            }
        });
        *self.dispatch.lock().unwrap() = Some(task);
    }
}

impl Drop for HotkeyRegistrar {
    fn drop(&mut self) {
        if self.state() != RegistrarState::Idle {
            info!("registrar dropped while running, stopping listeners");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::ProcessSet;
    use crate::platform::mock::{MockHook, MockProcessApi};
    use assert2::assert;
    use std::path::Path;

    struct Fixture {
        registrar: HotkeyRegistrar,
        hook: Arc<MockHook>,
        procs: Arc<MockProcessApi>,
        tracked: Arc<ProcessSet>,
        table: Arc<BindingTable>,
        _dir: tempfile::TempDir,
        exe: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("app");
        std::fs::write(&exe, b"").unwrap();

        let hook = Arc::new(MockHook::new());
        let procs = Arc::new(MockProcessApi::new());
        let tracked = Arc::new(ProcessSet::new());
        let table = Arc::new(BindingTable::new());
        let launcher = Arc::new(
            Launcher::new(procs.clone(), tracked.clone())
                .with_settle(Duration::from_millis(1)),
        );
        let monitor = Arc::new(
            ProcessMonitor::new(procs.clone(), tracked.clone())
                .with_interval(Duration::from_millis(10)),
        );
        let registrar =
            HotkeyRegistrar::new(hook.clone(), table.clone(), launcher, monitor);

        Fixture {
            registrar,
            hook,
            procs,
            tracked,
            table,
            _dir: dir,
            exe,
        }
    }

    #[tokio::test]
    async fn test_start_without_bindings() {
        let f = fixture();
        let err = f.registrar.start().unwrap_err();
        assert!(matches!(err, Error::NoBindings));
        assert!(f.registrar.state() == RegistrarState::Idle);
    }

    #[tokio::test]
    async fn test_start_without_privilege() {
        let f = fixture();
        f.table.add("ctrl+alt+n", f.exe.to_str().unwrap()).unwrap();
        f.hook.set_privileged(false);

        let err = f.registrar.start().unwrap_err();
        assert!(matches!(err, Error::InsufficientPrivilege));
        assert!(f.registrar.state() == RegistrarState::Idle);
        assert!(f.hook.installed_chords().is_empty());
    }

    #[tokio::test]
    async fn test_start_registers_all_bindings() {
        let f = fixture();
        f.table.add("ctrl+alt+n", f.exe.to_str().unwrap()).unwrap();
        f.table.add("ctrl+alt+m", f.exe.to_str().unwrap()).unwrap();

        f.registrar.start().unwrap();
        assert!(f.registrar.state() == RegistrarState::Running);
        assert!(f.hook.installed_chords() == vec!["ctrl+alt+m", "ctrl+alt+n"]);
        f.registrar.stop();
    }

    #[tokio::test]
    async fn test_start_is_idempotent_while_running() {
        let f = fixture();
        f.table.add("ctrl+alt+n", f.exe.to_str().unwrap()).unwrap();

        f.registrar.start().unwrap();
        f.registrar.start().unwrap();
        assert!(f.hook.installed_chords().len() == 1);
        f.registrar.stop();
    }

    #[tokio::test]
    async fn test_partial_registration_keeps_running() {
        let f = fixture();
        f.table.add("ctrl+alt+n", f.exe.to_str().unwrap()).unwrap();
        f.table.add("ctrl+alt+m", f.exe.to_str().unwrap()).unwrap();
        f.hook.fail_chord("ctrl+alt+m");

        let err = f.registrar.start().unwrap_err();
        let Error::PartialRegistration { failed } = err else {
            panic!("expected PartialRegistration");
        };
        assert!(failed == vec!["ctrl+alt+m".to_string()]);
        // One hook made it in, so the registrar is running regardless.
        assert!(f.registrar.state() == RegistrarState::Running);
        f.registrar.stop();
    }

    #[tokio::test]
    async fn test_all_hooks_failing_aborts_start() {
        let f = fixture();
        f.table.add("ctrl+alt+n", f.exe.to_str().unwrap()).unwrap();
        f.hook.fail_chord("ctrl+alt+n");

        let err = f.registrar.start().unwrap_err();
        assert!(matches!(err, Error::PartialRegistration { .. }));
        assert!(f.registrar.state() == RegistrarState::Idle);
    }

    #[tokio::test]
    async fn test_stop_unregisters_everything() {
        let f = fixture();
        f.table.add("ctrl+alt+n", f.exe.to_str().unwrap()).unwrap();
        f.table.add("ctrl+alt+m", f.exe.to_str().unwrap()).unwrap();

        f.registrar.start().unwrap();
        f.registrar.stop();

        assert!(f.registrar.state() == RegistrarState::Idle);
        assert!(f.hook.installed_chords().is_empty());
        assert!(f.hook.uninstalled_chords().len() == 2);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let f = fixture();
        f.registrar.stop();
        assert!(f.registrar.state() == RegistrarState::Idle);
    }

    #[tokio::test]
    async fn test_trigger_launches_target() {
        let f = fixture();
        f.table.add("ctrl+alt+n", f.exe.to_str().unwrap()).unwrap();
        f.registrar.start().unwrap();

        f.hook.press("ctrl+alt+n");
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(f.procs.spawn_count() == 1);
        assert!(f.tracked.len() == 1);
        f.registrar.stop();
    }

    #[tokio::test]
    async fn test_double_trigger_spawns_once() {
        let f = fixture();
        f.table.add("ctrl+alt+n", f.exe.to_str().unwrap()).unwrap();
        f.registrar.start().unwrap();

        f.hook.press("ctrl+alt+n");
        f.hook.press("ctrl+alt+n");
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(f.procs.spawn_count() == 1);
        assert!(f.tracked.len() == 1);
        f.registrar.stop();
    }

    #[tokio::test]
    async fn test_killed_process_leaves_count_within_a_tick() {
        let f = fixture();
        f.table.add("ctrl+alt+n", f.exe.to_str().unwrap()).unwrap();
        f.registrar.start().unwrap();

        f.hook.press("ctrl+alt+n");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(f.tracked.len() == 1);

        let entry = f.tracked.live_entry_for(&*f.procs, &f.exe).unwrap();
        f.procs.kill(entry.pid);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(f.tracked.len() == 0);
        f.registrar.stop();
    }
}
