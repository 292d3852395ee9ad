//! Binding table and conflict detection
//!
//! The table owns the chord → target map. Adds validate both sides and
//! overwrite silently on a duplicate chord (last write wins); removes are
//! boolean, never errors. The table is touched from the caller's thread and
//! from the hook dispatch task, so all access goes through an internal mutex.
//!
//! Conflict checking is advisory: a reserved system combo or an
//! already-bound chord sets the flag and a message, and the caller decides
//! whether to proceed. The checker never blocks an add on its own.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::chord::Chord;
use crate::error::Error;
use crate::target::Target;

/// Combos the host OS claims for itself. Registering one is allowed but
/// unlikely to trigger reliably, so adds warn and conflict checks flag them.
pub const RESERVED_CHORDS: [&str; 15] = [
    "ctrl+alt+delete",
    "ctrl+alt+del",
    "ctrl+shift+esc",
    "win+l",
    "win+d",
    "win+e",
    "win+r",
    "win+tab",
    "win+i",
    "win+s",
    "win+a",
    "win+x",
    "alt+tab",
    "alt+f4",
    "ctrl+alt+tab",
];

/// Result of an advisory conflict check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub is_conflict: bool,
    pub message: String,
}

impl Conflict {
    fn none() -> Self {
        Self {
            is_conflict: false,
            message: String::new(),
        }
    }

    fn found(message: String) -> Self {
        Self {
            is_conflict: true,
            message,
        }
    }
}

/// Chord → target map with override-on-duplicate semantics.
pub struct BindingTable {
    inner: Mutex<HashMap<Chord, Target>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Validate and insert a binding. An existing entry for the same chord
    /// is replaced. Reserved combos are accepted with a warning.
    pub fn add(&self, chord: &str, target: &str) -> Result<(), Error> {
        let chord = Chord::parse(chord).inspect_err(|e| warn!(%e, "rejected binding"))?;
        let target = Target::classify(target).inspect_err(|e| warn!(%e, "rejected binding"))?;

        let conflict = self.check(chord.as_str());
        if conflict.is_conflict {
            warn!(chord = %chord, "{}", conflict.message);
        }

        let replaced = self
            .inner
            .lock()
            .unwrap()
            .insert(chord.clone(), target.clone());
        if replaced.is_some() {
            info!(%chord, %target, "binding replaced");
        } else {
            info!(%chord, %target, "binding added");
        }
        Ok(())
    }

    /// Remove a binding. Returns whether an entry existed.
    pub fn remove(&self, chord: &str) -> bool {
        let Ok(chord) = Chord::parse(chord) else {
            return false;
        };
        let removed = self.inner.lock().unwrap().remove(&chord).is_some();
        if removed {
            info!(%chord, "binding removed");
        }
        removed
    }

    /// Advisory conflict check against the reserved set and the current
    /// table. Reserved combos take precedence in the message; an existing
    /// binding is reported with its target. Never mutates state.
    pub fn check(&self, chord: &str) -> Conflict {
        let lowered = chord.to_lowercase();

        if RESERVED_CHORDS.contains(&lowered.as_str()) {
            return Conflict::found(format!(
                "'{chord}' is a reserved system combination and may not trigger reliably"
            ));
        }

        if let Ok(parsed) = Chord::parse(chord)
            && let Some(existing) = self.inner.lock().unwrap().get(&parsed)
        {
            return Conflict::found(format!("'{chord}' is already bound to: {existing}"));
        }

        Conflict::none()
    }

    /// Clone of the current chord → target map.
    pub fn snapshot(&self) -> HashMap<Chord, Target> {
        self.inner.lock().unwrap().clone()
    }

    #[allow(dead_code)] // Public API for the GUI collaborator
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    #[allow(dead_code)] // Public API for the GUI collaborator
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new()
    }
}
