//! Recording fakes for the platform traits
//!
//! Each fake records calls instead of touching OS state, so tests can drive
//! hotkey triggers, process lifecycles, and mechanism failures without a
//! real hook, process table, or power API. Failure toggles let tests force
//! any primitive to error.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use anyhow::anyhow;

use super::{HookId, HotkeyHook, InputApi, PowerApi, ProcessApi, SessionApi};
use crate::chord::Chord;

/// Hook fake: installs succeed unless the chord was marked failing, and
/// triggers are queued by the test via `press`.
#[derive(Default)]
pub struct MockHook {
    privileged: AtomicBool,
    next_id: AtomicU32,
    failing: Mutex<HashSet<String>>,
    installed: Mutex<HashMap<HookId, String>>,
    uninstalled: Mutex<Vec<String>>,
    pending: Mutex<VecDeque<HookId>>,
}

impl MockHook {
    pub fn new() -> Self {
        let hook = Self::default();
        hook.privileged.store(true, Ordering::SeqCst);
        hook
    }

    pub fn set_privileged(&self, privileged: bool) {
        self.privileged.store(privileged, Ordering::SeqCst);
    }

    /// Make installs of this chord fail.
    pub fn fail_chord(&self, chord: &str) {
        self.failing.lock().unwrap().insert(chord.to_lowercase());
    }

    /// Queue a trigger for an installed chord. Panics if it is not installed.
    pub fn press(&self, chord: &str) {
        let installed = self.installed.lock().unwrap();
        let id = installed
            .iter()
            .find(|(_, c)| c.as_str() == chord)
            .map(|(id, _)| *id)
            .unwrap_or_else(|| panic!("chord '{chord}' is not installed: {installed:?}"));
        self.pending.lock().unwrap().push_back(id);
    }

    pub fn installed_chords(&self) -> Vec<String> {
        let mut chords: Vec<String> = self.installed.lock().unwrap().values().cloned().collect();
        chords.sort();
        chords
    }

    pub fn uninstalled_chords(&self) -> Vec<String> {
        self.uninstalled.lock().unwrap().clone()
    }
}

impl HotkeyHook for MockHook {
    fn is_privileged(&self) -> bool {
        self.privileged.load(Ordering::SeqCst)
    }

    fn install(&self, chord: &Chord) -> anyhow::Result<HookId> {
        if self.failing.lock().unwrap().contains(chord.as_str()) {
            return Err(anyhow!("install refused for '{chord}'"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.installed
            .lock()
            .unwrap()
            .insert(id, chord.as_str().to_string());
        Ok(id)
    }

    fn uninstall(&self, id: HookId) -> anyhow::Result<()> {
        match self.installed.lock().unwrap().remove(&id) {
            Some(chord) => {
                self.uninstalled.lock().unwrap().push(chord);
                Ok(())
            }
            None => Err(anyhow!("hook {id} was not installed")),
        }
    }

    fn try_recv(&self) -> Option<HookId> {
        self.pending.lock().unwrap().pop_front()
    }
}

/// Process-table fake with an explicit alive set and spawn counting.
#[derive(Default)]
pub struct MockProcessApi {
    next_pid: AtomicU32,
    fail_spawn: AtomicBool,
    alive: Mutex<HashMap<u32, PathBuf>>,
    spawn_count: AtomicUsize,
    opened_urls: Mutex<Vec<String>>,
    opened_dirs: Mutex<Vec<PathBuf>>,
}

impl MockProcessApi {
    pub fn new() -> Self {
        let procs = Self::default();
        procs.next_pid.store(100, Ordering::SeqCst);
        procs
    }

    pub fn set_fail_spawn(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Seed a pre-existing OS process, as if launched outside the core.
    pub fn preexisting(&self, exe: &Path) -> u32 {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.alive.lock().unwrap().insert(pid, exe.to_path_buf());
        pid
    }

    /// Terminate a fake process.
    pub fn kill(&self, pid: u32) {
        self.alive.lock().unwrap().remove(&pid);
    }

    pub fn spawn_count(&self) -> usize {
        self.spawn_count.load(Ordering::SeqCst)
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened_urls.lock().unwrap().clone()
    }

    pub fn opened_dirs(&self) -> Vec<PathBuf> {
        self.opened_dirs.lock().unwrap().clone()
    }
}

impl ProcessApi for MockProcessApi {
    fn is_alive(&self, pid: u32) -> bool {
        self.alive.lock().unwrap().contains_key(&pid)
    }

    fn find_by_exe(&self, exe: &Path) -> Option<u32> {
        self.alive
            .lock()
            .unwrap()
            .iter()
            .find(|(_, path)| path.as_path() == exe)
            .map(|(pid, _)| *pid)
    }

    fn spawn(&self, exe: &Path) -> anyhow::Result<u32> {
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(anyhow!("spawn refused for {}", exe.display()));
        }
        self.spawn_count.fetch_add(1, Ordering::SeqCst);
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.alive.lock().unwrap().insert(pid, exe.to_path_buf());
        Ok(pid)
    }

    fn open_url(&self, url: &str) -> anyhow::Result<()> {
        self.opened_urls.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn open_dir(&self, path: &Path) -> anyhow::Result<()> {
        self.opened_dirs.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
        // Paths in tests are used as-is; real resolution is exercised
        // against the native api.
        Ok(path.to_path_buf())
    }
}

/// Power-primitive fake with per-call counters and failure toggles.
#[derive(Default)]
pub struct MockPowerApi {
    pub fail_idle_reset: AtomicBool,
    pub fail_continuous: AtomicBool,
    pub fail_clear: AtomicBool,
    pub fail_request: AtomicBool,
    idle_resets: AtomicUsize,
    continuous_asserts: AtomicUsize,
    continuous_clears: AtomicUsize,
    requests_acquired: AtomicUsize,
    requests_released: AtomicUsize,
}

impl MockPowerApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_all(&self) {
        self.fail_idle_reset.store(true, Ordering::SeqCst);
        self.fail_continuous.store(true, Ordering::SeqCst);
        self.fail_clear.store(true, Ordering::SeqCst);
        self.fail_request.store(true, Ordering::SeqCst);
    }

    pub fn idle_resets(&self) -> usize {
        self.idle_resets.load(Ordering::SeqCst)
    }

    pub fn continuous_asserts(&self) -> usize {
        self.continuous_asserts.load(Ordering::SeqCst)
    }

    pub fn continuous_clears(&self) -> usize {
        self.continuous_clears.load(Ordering::SeqCst)
    }

    pub fn requests_acquired(&self) -> usize {
        self.requests_acquired.load(Ordering::SeqCst)
    }

    pub fn requests_released(&self) -> usize {
        self.requests_released.load(Ordering::SeqCst)
    }

    fn gated(&self, flag: &AtomicBool, counter: &AtomicUsize, what: &str) -> anyhow::Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(anyhow!("{what} refused"));
        }
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl PowerApi for MockPowerApi {
    fn reset_idle_timer(&self) -> anyhow::Result<()> {
        self.gated(&self.fail_idle_reset, &self.idle_resets, "idle reset")
    }

    fn assert_continuous(&self) -> anyhow::Result<()> {
        self.gated(&self.fail_continuous, &self.continuous_asserts, "continuous assert")
    }

    fn clear_continuous(&self) -> anyhow::Result<()> {
        self.gated(&self.fail_clear, &self.continuous_clears, "continuous clear")
    }

    fn acquire_power_request(&self) -> anyhow::Result<()> {
        self.gated(&self.fail_request, &self.requests_acquired, "power request set")
    }

    fn release_power_request(&self) -> anyhow::Result<()> {
        self.gated(&self.fail_request, &self.requests_released, "power request clear")
    }
}

/// Synthetic-input fake.
#[derive(Default)]
pub struct MockInputApi {
    pub fail_key: AtomicBool,
    pub fail_pointer: AtomicBool,
    key_taps: AtomicUsize,
    nudges: Mutex<Vec<i32>>,
}

impl MockInputApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_all(&self) {
        self.fail_key.store(true, Ordering::SeqCst);
        self.fail_pointer.store(true, Ordering::SeqCst);
    }

    pub fn key_taps(&self) -> usize {
        self.key_taps.load(Ordering::SeqCst)
    }

    pub fn nudges(&self) -> Vec<i32> {
        self.nudges.lock().unwrap().clone()
    }
}

impl InputApi for MockInputApi {
    fn send_wake_key(&self) -> anyhow::Result<()> {
        if self.fail_key.load(Ordering::SeqCst) {
            return Err(anyhow!("wake key refused"));
        }
        self.key_taps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn nudge_pointer(&self, delta_px: i32) -> anyhow::Result<()> {
        if self.fail_pointer.load(Ordering::SeqCst) {
            return Err(anyhow!("pointer nudge refused"));
        }
        self.nudges.lock().unwrap().push(delta_px);
        Ok(())
    }
}

/// Session-probe fake; tests flip the foreground-window flag to simulate
/// lock/unlock transitions.
pub struct MockSessionApi {
    present: AtomicBool,
}

impl MockSessionApi {
    pub fn new() -> Self {
        Self {
            present: AtomicBool::new(true),
        }
    }

    pub fn set_foreground_present(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }
}

impl SessionApi for MockSessionApi {
    fn foreground_window_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }
}
