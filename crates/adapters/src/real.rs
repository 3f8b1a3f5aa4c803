// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The production [`FsHelper`]: thin wrappers over `std::fs` plus `glob`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::{FsError, FsHelper};

/// Production filesystem helper. Stateless; safe to share across threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFsHelper;

impl RealFsHelper {
    pub fn new() -> Self {
        Self
    }
}

impl FsHelper for RealFsHelper {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn mkdir(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir(path).map_err(|e| FsError::at(path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(from, to).map_err(|e| FsError::at(from, e))
    }

    fn cleanupdir(&self, path: &Path) -> Result<(), FsError> {
        if !path.exists() {
            return Ok(());
        }
        fs::remove_dir_all(path).map_err(|e| FsError::at(path, e))
    }

    fn createdir(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path).map_err(|e| FsError::at(path, e))
    }

    fn read_lines(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let file = File::open(path).map_err(|e| FsError::at(path, e))?;
        BufReader::new(file)
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| FsError::at(path, e))
    }

    fn write_lines(&self, path: &Path, lines: &[String]) -> Result<(), FsError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| FsError::at(path, e))?;
        for line in lines {
            writeln!(file, "{line}").map_err(|e| FsError::at(path, e))?;
        }
        file.sync_all().map_err(|e| FsError::at(path, e))
    }

    fn fsync_path(&self, path: &Path) -> Result<(), FsError> {
        let file = if path.is_dir() {
            File::open(path)
        } else {
            OpenOptions::new().write(true).open(path)
        }
        .map_err(|e| FsError::at(path, e))?;
        file.sync_all().map_err(|e| FsError::at(path, e))?;
        // Directories are named by their parent's entry; that entry must be
        // fsynced too so a sibling rename survives a crash.
        if let Some(parent) = path.parent() {
            if let Ok(parent_file) = File::open(parent) {
                let _ = parent_file.sync_all();
            }
        }
        Ok(())
    }

    fn glob(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, FsError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let full_pattern = dir.join(pattern);
        let full_pattern = full_pattern.to_string_lossy().into_owned();
        glob::glob(&full_pattern)
            .map_err(|e| FsError::at(dir, e))?
            .filter_map(|entry| entry.ok())
            .map(Ok)
            .collect()
    }
}
