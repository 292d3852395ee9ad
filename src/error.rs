//! Core error taxonomy
//!
//! Validation errors are returned synchronously to the caller of
//! `add_binding`/`start`. Launch and per-tick wake-mechanism failures are
//! recovered locally and logged; they never appear here. Total degradation of
//! the sleep-prevention stack is surfaced through
//! `SleepPreventionController`, not as an `Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The chord string is malformed (no modifier, or not `+`-joined).
    #[error("invalid chord '{0}': expected modifier[+modifier...]+key with at least one of ctrl/alt/shift/win")]
    InvalidFormat(String),

    /// The target is neither a URL nor an existing file or directory.
    #[error("invalid target '{0}': not a URL or an existing path")]
    InvalidTarget(String),

    /// `start()` was called with an empty binding table.
    #[error("no bindings to register")]
    NoBindings,

    /// The host refuses global hotkey hooks at the current privilege level.
    /// Recoverable: the caller may retry after elevating.
    #[error("insufficient privilege to install global hotkey hooks")]
    InsufficientPrivilege,

    /// One or more hooks failed to install. When at least one hook did
    /// install, the registrar is still running; the failed chords are listed
    /// so the caller can warn the user.
    #[error("failed to register {n} hotkey(s): {list}", n = .failed.len(), list = .failed.join(", "))]
    PartialRegistration { failed: Vec<String> },
}
