//! Launch target classification
//!
//! A target is the launchable entity bound to a chord: a URL, an existing
//! file, or an existing directory. Classification happens once, at add time;
//! a path that exists as neither file nor directory is rejected.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// URL prefixes recognized without touching the filesystem.
const URL_PREFIXES: [&str; 3] = ["http://", "https://", "www."];

/// A validated launch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Web address, dispatched to the system URL opener.
    Url(String),
    /// Existing regular file, launched as a process and deduplicated.
    File(PathBuf),
    /// Existing directory, dispatched to the system file manager.
    Dir(PathBuf),
}

impl Target {
    /// Classify a raw target string.
    ///
    /// URLs are recognized by prefix alone. Everything else must exist on
    /// disk as a file or directory to be accepted.
    pub fn classify(raw: &str) -> Result<Self, Error> {
        if raw.is_empty() {
            return Err(Error::InvalidTarget(raw.to_string()));
        }

        if URL_PREFIXES.iter().any(|p| raw.starts_with(p)) {
            return Ok(Self::Url(raw.to_string()));
        }

        let path = Path::new(raw);
        if path.is_dir() {
            return Ok(Self::Dir(path.to_path_buf()));
        }
        if path.is_file() {
            return Ok(Self::File(path.to_path_buf()));
        }

        Err(Error::InvalidTarget(raw.to_string()))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Url(url) => f.write_str(url),
            Target::File(path) | Target::Dir(path) => write!(f, "{}", path.display()),
        }
    }
}
