// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory [`FsHelper`] for unit tests that need to assert on exactly
//! which filesystem calls were made, or to simulate a crash between two
//! calls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::{FsError, FsHelper};

/// One filesystem call recorded by [`FakeFsHelper`], for assertions in tests
/// that care about *which* primitives were invoked and in what order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Mkdir(PathBuf),
    Rename(PathBuf, PathBuf),
    Cleanupdir(PathBuf),
    Createdir(PathBuf),
    ReadLines(PathBuf),
    WriteLines(PathBuf),
    FsyncPath(PathBuf),
    Glob(PathBuf, String),
}

#[derive(Default)]
struct State {
    // A "directory" is any key present with `None`; a "file" carries `Some(lines)`.
    entries: HashMap<PathBuf, Option<Vec<String>>>,
    calls: Vec<RecordedCall>,
}

/// In-memory filesystem rooted at nothing in particular -- paths are just
/// map keys, not resolved against a real root. Good enough for exercising
/// `taskd-storage`'s directory-swap logic without touching disk.
#[derive(Default)]
pub struct FakeFsHelper {
    state: Mutex<State>,
}

impl FakeFsHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a directory (e.g. the store root) as already existing.
    pub fn seed_dir(&self, path: impl Into<PathBuf>) {
        self.state.lock().entries.insert(path.into(), None);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    fn record(&self, call: RecordedCall) {
        self.state.lock().calls.push(call);
    }
}

impl FsHelper for FakeFsHelper {
    fn exists(&self, path: &Path) -> bool {
        self.state.lock().entries.contains_key(path)
    }

    fn mkdir(&self, path: &Path) -> Result<(), FsError> {
        self.record(RecordedCall::Mkdir(path.to_path_buf()));
        let mut state = self.state.lock();
        if state.entries.contains_key(path) {
            return Err(FsError::at(path, "already exists"));
        }
        state.entries.insert(path.to_path_buf(), None);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.record(RecordedCall::Rename(from.to_path_buf(), to.to_path_buf()));
        let mut state = self.state.lock();
        let moved: Vec<(PathBuf, Option<Vec<String>>)> = state
            .entries
            .iter()
            .filter(|(k, _)| *k == from || k.starts_with(from))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if moved.is_empty() {
            return Err(FsError::at(from, "no such file or directory"));
        }
        for (k, v) in moved {
            state.entries.remove(&k);
            let rebased = to.join(k.strip_prefix(from).unwrap_or(&k));
            let rebased = if k == from { to.to_path_buf() } else { rebased };
            state.entries.insert(rebased, v);
        }
        Ok(())
    }

    fn cleanupdir(&self, path: &Path) -> Result<(), FsError> {
        self.record(RecordedCall::Cleanupdir(path.to_path_buf()));
        let mut state = self.state.lock();
        state.entries.retain(|k, _| k != path && !k.starts_with(path));
        Ok(())
    }

    fn createdir(&self, path: &Path) -> Result<(), FsError> {
        self.record(RecordedCall::Createdir(path.to_path_buf()));
        self.state.lock().entries.entry(path.to_path_buf()).or_insert(None);
        Ok(())
    }

    fn read_lines(&self, path: &Path) -> Result<Vec<String>, FsError> {
        self.record(RecordedCall::ReadLines(path.to_path_buf()));
        match self.state.lock().entries.get(path) {
            Some(Some(lines)) => Ok(lines.clone()),
            Some(None) => Err(FsError::at(path, "is a directory")),
            None => Err(FsError::at(path, "no such file")),
        }
    }

    fn write_lines(&self, path: &Path, lines: &[String]) -> Result<(), FsError> {
        self.record(RecordedCall::WriteLines(path.to_path_buf()));
        self.state.lock().entries.insert(path.to_path_buf(), Some(lines.to_vec()));
        Ok(())
    }

    fn fsync_path(&self, path: &Path) -> Result<(), FsError> {
        self.record(RecordedCall::FsyncPath(path.to_path_buf()));
        Ok(())
    }

    fn glob(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, FsError> {
        self.record(RecordedCall::Glob(dir.to_path_buf(), pattern.to_string()));
        let suffix = pattern.trim_start_matches('*');
        let state = self.state.lock();
        let mut matches: Vec<PathBuf> = state
            .entries
            .keys()
            .filter(|k| k.parent() == Some(dir) && k.to_string_lossy().ends_with(suffix))
            .cloned()
            .collect();
        matches.sort();
        Ok(matches)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
