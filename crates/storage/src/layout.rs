// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk path layout: file extensions, separators, and directory-swap
//! path names are part of the on-disk contract and must not drift between
//! reader and writer.

use std::path::{Path, PathBuf};

use taskd_core::TaskId;

/// `store/<id>/`.
pub fn task_dir(store: &Path, id: &TaskId) -> PathBuf {
    store.join(id.as_str())
}

/// `store/<id>.temp/` -- staging directory for an in-progress atomic save.
pub fn temp_dir(store: &Path, id: &TaskId) -> PathBuf {
    store.join(format!("{id}.temp"))
}

/// `store/<id>.backup/` -- the previous generation, kept until the swap
/// completes.
pub fn backup_dir(store: &Path, id: &TaskId) -> PathBuf {
    store.join(format!("{id}.backup"))
}

/// `<id>.task` inside a task/temp/backup directory.
pub fn task_file(dir: &Path, id: &TaskId) -> PathBuf {
    dir.join(format!("{id}.task"))
}

/// `<id>.job.<n>`.
pub fn job_file(dir: &Path, id: &TaskId, n: usize) -> PathBuf {
    dir.join(format!("{id}.job.{n}"))
}

/// `<id>.recover.<n>`.
pub fn recover_file(dir: &Path, id: &TaskId, n: usize) -> PathBuf {
    dir.join(format!("{id}.recover.{n}"))
}

/// `<id>.result` -- only written when the task's state is `finished`.
pub fn result_file(dir: &Path, id: &TaskId) -> PathBuf {
    dir.join(format!("{id}.result"))
}

/// Glob pattern for discovering persisted resource requests inside a task
/// directory.
pub const RESOURCE_GLOB: &str = "*.resource";
