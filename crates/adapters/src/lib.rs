// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Out-of-process filesystem helper contract.
//!
//! `taskd-storage`'s metafile codec and atomic-save orchestrator never touch
//! `std::fs` directly -- every primitive they need (`mkdir`, `rename`,
//! `exists`, `cleanupdir`, `readLines`, `writeLines`, `fsyncPath`, `glob`) is
//! consumed through the [`FsHelper`] trait, so a caller can swap in
//! [`fake::FakeFsHelper`] to exercise crash-window behavior without touching
//! a real disk.

mod fake;
mod real;

pub use fake::FakeFsHelper;
pub use real::RealFsHelper;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by an [`FsHelper`] implementation.
#[derive(Debug, Error, Clone)]
pub enum FsError {
    #[error("io error at {path}: {message}")]
    Io { path: String, message: String },
}

impl FsError {
    pub fn at(path: impl AsRef<Path>, err: impl std::fmt::Display) -> Self {
        FsError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

/// The filesystem primitives `taskd-storage`'s persistence orchestrator
/// needs, named and scoped after its "Consumed from filesystem helper"
/// list -- this is deliberately not a general-purpose filesystem
/// abstraction.
pub trait FsHelper: Send + Sync {
    /// `os.path.exists`.
    fn exists(&self, path: &Path) -> bool;

    /// `os.mkdir` -- creates exactly one directory; the parent must already
    /// exist. Errors if `path` already exists.
    fn mkdir(&self, path: &Path) -> Result<(), FsError>;

    /// `os.rename` -- atomic within a single filesystem.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// `fileUtils.cleanupdir` -- recursively remove `path` if present; a
    /// missing `path` is not an error.
    fn cleanupdir(&self, path: &Path) -> Result<(), FsError>;

    /// `fileUtils.createdir` -- create `path` and any missing parents; a
    /// pre-existing directory is not an error.
    fn createdir(&self, path: &Path) -> Result<(), FsError>;

    /// `readLines` -- read `path` as UTF-8 text, one `String` per line
    /// (trailing newline stripped, no line endings included).
    fn read_lines(&self, path: &Path) -> Result<Vec<String>, FsError>;

    /// `writeLines` -- write `lines` to `path`, one per line, newline
    /// terminated.
    fn write_lines(&self, path: &Path, lines: &[String]) -> Result<(), FsError>;

    /// `fileUtils.fsyncPath` -- fsync `path` (and, for a directory, the
    /// directory entry itself) so a rename into `path` is durable.
    fn fsync_path(&self, path: &Path) -> Result<(), FsError>;

    /// `glob` -- list filesystem entries in `dir` matching `pattern`
    /// (a single path-component glob, e.g. `"*.resource"`). Returns an
    /// empty vector if `dir` does not exist.
    fn glob(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, FsError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::RecordedCall;
