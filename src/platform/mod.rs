//! Platform abstraction layer
//!
//! Narrow trait seams over everything the host OS provides:
//! - Global hotkey hook install/uninstall and trigger delivery
//! - Process table queries, spawning, URL/folder opening
//! - Power management primitives (idle reset, continuous assertion,
//!   power request object)
//! - Synthetic input injection
//! - Interactive-session probe (foreground window presence)
//!
//! Components hold these as `Arc<dyn Trait>` so tests can substitute the
//! recording fakes in `mock` without touching real OS state.

mod native;

#[cfg(windows)]
mod windows;

#[cfg(not(windows))]
mod fallback;

#[cfg(test)]
pub mod mock;

pub use native::{NativeHook, NativeProcessApi};

#[cfg(windows)]
pub use windows::{NativeInputApi, NativePowerApi, NativeSessionApi};

#[cfg(not(windows))]
pub use fallback::{NativeInputApi, NativePowerApi, NativeSessionApi};

use std::path::{Path, PathBuf};

/// Opaque identifier for one installed hotkey hook.
pub type HookId = u32;

/// Global hotkey hook facility.
///
/// `install` binds a chord at the OS level; triggers are drained with
/// `try_recv` from whatever thread the dispatch loop runs on.
pub trait HotkeyHook: Send + Sync {
    /// Whether the current process may install global hooks at all.
    fn is_privileged(&self) -> bool;

    /// Install a hook for the chord, returning its id.
    fn install(&self, chord: &crate::chord::Chord) -> anyhow::Result<HookId>;

    /// Remove a previously installed hook.
    fn uninstall(&self, id: HookId) -> anyhow::Result<()>;

    /// Drain one pending trigger, if any. Non-blocking.
    fn try_recv(&self) -> Option<HookId>;
}

/// Process table access and target dispatch.
pub trait ProcessApi: Send + Sync {
    /// Whether a process with this pid currently exists.
    fn is_alive(&self, pid: u32) -> bool;

    /// Scan the OS-wide process table for a process whose resolved
    /// executable path equals `exe`.
    fn find_by_exe(&self, exe: &Path) -> Option<u32>;

    /// Spawn a new process for the executable, returning its pid.
    fn spawn(&self, exe: &Path) -> anyhow::Result<u32>;

    /// Dispatch a URL to the system opener.
    fn open_url(&self, url: &str) -> anyhow::Result<()>;

    /// Dispatch a directory to the system file manager.
    fn open_dir(&self, path: &Path) -> anyhow::Result<()>;

    /// Resolve a path to canonical absolute form.
    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf>;
}

/// OS power management primitives.
///
/// These are process-wide singular resources; only the sleep-prevention
/// controller may call them.
pub trait PowerApi: Send + Sync {
    /// Reset the idle countdown without declaring an ongoing requirement
    /// (the non-continuous execution-state call).
    fn reset_idle_timer(&self) -> anyhow::Result<()>;

    /// Declare an ongoing system/display requirement (the continuous
    /// execution-state call).
    fn assert_continuous(&self) -> anyhow::Result<()>;

    /// Restore the plain continuous flag, dropping the requirement.
    fn clear_continuous(&self) -> anyhow::Result<()>;

    /// Create-and-set the OS power request object. Survives more robustly
    /// than the thread execution-state flag alone.
    fn acquire_power_request(&self) -> anyhow::Result<()>;

    /// Clear the power request object.
    fn release_power_request(&self) -> anyhow::Result<()>;
}

/// Synthetic input injection used to resemble genuine user activity.
pub trait InputApi: Send + Sync {
    /// Emit a harmless keypress (a key no foreground app reacts to).
    fn send_wake_key(&self) -> anyhow::Result<()>;

    /// Displace the pointer by `delta_px` and move it back.
    fn nudge_pointer(&self, delta_px: i32) -> anyhow::Result<()>;
}

/// Interactive-session probe.
pub trait SessionApi: Send + Sync {
    /// Whether a foreground window owned by the interactive session exists.
    /// Absence is interpreted as a locked session.
    fn foreground_window_present(&self) -> bool;
}
