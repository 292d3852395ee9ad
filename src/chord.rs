//! Keyboard chord representation and validation
//!
//! A chord is a `+`-joined combination like `ctrl+alt+n`. Chords are
//! canonicalized to lower case at construction, so equality and map lookups
//! are case-insensitive (`Ctrl+Alt+N` ≡ `ctrl+alt+n`). A chord is valid when
//! splitting on `+` yields at least two tokens and at least one of them is a
//! modifier. The trailing key token is deliberately not checked against a key
//! list; unknown tokens surface later as per-hook registration failures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Modifier token names accepted in a chord.
pub const MODIFIERS: [&str; 4] = ["ctrl", "alt", "shift", "win"];

/// A validated, canonical (lower-cased) hotkey combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Chord(String);

impl Chord {
    /// Parse and validate a raw chord string.
    ///
    /// Rules: non-empty; lower-cased split on `+` yields ≥2 tokens; at least
    /// one token is a modifier name. Anything else about the trailing token
    /// is accepted, including a second modifier word or an empty segment
    /// after a trailing `+`.
    pub fn parse(raw: &str) -> Result<Self, crate::error::Error> {
        let lowered = raw.to_lowercase();
        if lowered.is_empty() {
            return Err(crate::error::Error::InvalidFormat(raw.to_string()));
        }

        let tokens: Vec<&str> = lowered.split('+').collect();
        if tokens.len() < 2 {
            return Err(crate::error::Error::InvalidFormat(raw.to_string()));
        }

        let has_modifier = tokens.iter().any(|t| MODIFIERS.contains(t));
        if !has_modifier {
            return Err(crate::error::Error::InvalidFormat(raw.to_string()));
        }

        Ok(Self(lowered))
    }

    /// The canonical lower-cased form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate the `+`-separated tokens of the canonical form.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split('+')
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Chord {
    type Error = crate::error::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Chord::parse(&value)
    }
}

impl From<Chord> for String {
    fn from(chord: Chord) -> Self {
        chord.0
    }
}
