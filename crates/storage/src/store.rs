// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `TaskStore`: the persistence orchestrator. Implements
//! `taskd_core`'s [`TaskPersistence`] trait for `Task::set_persistence` /
//! `Task::persist` / `Task::clean`, plus the free-standing `load`/
//! `load_resources`/`scan_ids` operations `loadTask` and the daemon's
//! crash-resume scan need -- those aren't part of the trait because they
//! run *before* a `Task` exists, not through one.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use taskd_adapters::FsHelper;
use taskd_core::task::{TaskPersistence, TaskSnapshot};
use taskd_core::task_resource::TaskResource;
use taskd_core::{State, TaskError, TaskId};

use crate::codec;
use crate::error::StorageError;
use crate::layout;
use crate::metafile::MetaFile;

/// Crash-safe on-disk persistence of task metadata, rooted at a single
/// directory (`store`). One [`TaskStore`] is shared by every task a process
/// manages.
pub struct TaskStore {
    fs: Arc<dyn FsHelper>,
    root: PathBuf,
}

impl TaskStore {
    pub fn new(fs: Arc<dyn FsHelper>, root: impl Into<PathBuf>) -> Self {
        Self { fs, root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the live directory for `id`, preferring `<id>`, then
    /// `<id>.temp`, then `<id>.backup`: after a crash the loader accepts
    /// directories named in that preference order.
    fn resolve_dir(&self, id: &TaskId) -> Result<PathBuf, StorageError> {
        for dir in [
            layout::task_dir(&self.root, id),
            layout::temp_dir(&self.root, id),
            layout::backup_dir(&self.root, id),
        ] {
            if self.fs.exists(&dir) {
                return Ok(dir);
            }
        }
        Err(StorageError::TaskDirError(format!("no task directory found for {id}")))
    }

    fn read_metafile(&self, path: &Path) -> Result<MetaFile, StorageError> {
        let lines = self
            .fs
            .read_lines(path)
            .map_err(|e| StorageError::TaskMetaDataLoadError(path.display().to_string(), e.to_string()))?;
        Ok(MetaFile::parse(&lines))
    }

    /// `_load`: read the task metafile, verify the id matches, conditionally
    /// read `.result`, then read `njobs`/`nrecoveries` job/recovery
    /// metafiles in order.
    pub fn load(&self, id: &TaskId) -> Result<TaskSnapshot, StorageError> {
        let dir = self.resolve_dir(id)?;
        let meta = self.read_metafile(&layout::task_file(&dir, id))?;
        let fields = codec::metafile_to_task_fields(&meta)
            .map_err(|e| StorageError::TaskMetaDataLoadError(dir.display().to_string(), e.to_string()))?;
        if fields.id != *id {
            return Err(StorageError::TaskMetaDataLoadError(
                dir.display().to_string(),
                format!("id mismatch: expected {id}, found {}", fields.id),
            ));
        }

        let result = if fields.state == State::Finished {
            Some(codec::metafile_to_task_result(&self.read_metafile(&layout::result_file(&dir, id))?)?)
        } else {
            None
        };

        let mut jobs = Vec::with_capacity(fields.njobs);
        for n in 0..fields.njobs {
            let meta = self.read_metafile(&layout::job_file(&dir, id, n))?;
            jobs.push(codec::metafile_to_job_record(&meta)?);
        }

        let mut recoveries = Vec::with_capacity(fields.nrecoveries);
        for n in 0..fields.nrecoveries {
            let meta = self.read_metafile(&layout::recover_file(&dir, id, n))?;
            recoveries.push(codec::metafile_to_recovery_record(&meta)?);
        }

        Ok(TaskSnapshot {
            id: fields.id,
            name: fields.name,
            tag: fields.tag,
            priority: fields.priority,
            persist_policy: fields.persist_policy,
            clean_policy: fields.clean_policy,
            recovery_policy: fields.recovery_policy,
            state: fields.state,
            njobs: fields.njobs,
            nrecoveries: fields.nrecoveries,
            metadata_version: fields.metadata_version,
            jobs,
            recoveries,
            result,
        })
    }

    /// Discover persisted resource requests by globbing `*.resource` inside
    /// the task directory. These are optional reads -- a task with none is
    /// not an error.
    pub fn load_resources(&self, id: &TaskId) -> Result<Vec<TaskResource>, StorageError> {
        let dir = self.resolve_dir(id)?;
        self.fs
            .glob(&dir, layout::RESOURCE_GLOB)?
            .iter()
            .map(|path| {
                let meta = self.read_metafile(path)?;
                codec::metafile_to_task_resource(&meta)
            })
            .collect()
    }

    /// Every task id with *some* directory under `store` -- `<id>`,
    /// `<id>.temp`, or `<id>.backup` -- for the daemon's crash-resume scan.
    /// An id is never itself `.`-bearing, so the basename up to the first
    /// `.` is always the id regardless of which variant is present.
    pub fn scan_ids(&self) -> Result<Vec<TaskId>, StorageError> {
        let entries = self.fs.glob(&self.root, "*")?;
        let mut ids = BTreeSet::new();
        for entry in entries {
            if let Some(name) = entry.file_name().and_then(|n| n.to_str()) {
                let id = name.split('.').next().unwrap_or(name);
                ids.insert(id.to_string());
            }
        }
        Ok(ids.into_iter().map(TaskId::new).collect())
    }

    fn write_all_metafiles(&self, dir: &Path, snapshot: &TaskSnapshot) -> Result<(), StorageError> {
        let id = &snapshot.id;
        let task_meta = codec::task_snapshot_to_metafile(snapshot);
        self.fs.write_lines(&layout::task_file(dir, id), &task_meta.to_lines())?;

        for (n, job) in snapshot.jobs.iter().enumerate() {
            let meta = codec::job_record_to_metafile(job);
            self.fs.write_lines(&layout::job_file(dir, id, n), &meta.to_lines())?;
        }
        for (n, recovery) in snapshot.recoveries.iter().enumerate() {
            let meta = codec::recovery_record_to_metafile(recovery);
            self.fs.write_lines(&layout::recover_file(dir, id, n), &meta.to_lines())?;
        }
        if let Some(result) = &snapshot.result {
            let meta = codec::task_result_to_metafile(result);
            self.fs.write_lines(&layout::result_file(dir, id), &meta.to_lines())?;
        }
        Ok(())
    }

    /// `_save`: atomic directory swap -- write into a fresh `<id>.temp`,
    /// demote the live directory to `<id>.backup`, promote `<id>.temp` to
    /// `<id>`, then drop the old backup.
    fn save_snapshot(&self, snapshot: TaskSnapshot) -> Result<(), StorageError> {
        let id = snapshot.id.clone();
        let dir = layout::task_dir(&self.root, &id);
        if !self.fs.exists(&dir) {
            return Err(StorageError::TaskDirError(format!("{} does not exist", dir.display())));
        }

        let temp = layout::temp_dir(&self.root, &id);
        let backup = layout::backup_dir(&self.root, &id);

        self.fs.cleanupdir(&temp)?;
        self.fs.createdir(&temp)?;

        if let Err(e) = self.write_all_metafiles(&temp, &snapshot) {
            let _ = self.fs.cleanupdir(&temp);
            return Err(StorageError::TaskPersistError(format!("{}: {}", temp.display(), e)));
        }

        self.fs.cleanupdir(&backup)?;
        self.fs
            .rename(&dir, &backup)
            .map_err(|e| StorageError::TaskPersistError(e.to_string()))?;
        self.fs
            .rename(&temp, &dir)
            .map_err(|e| StorageError::TaskPersistError(e.to_string()))?;
        self.fs.cleanupdir(&backup)?;
        self.fs.fsync_path(&dir)?;
        Ok(())
    }
}

impl TaskPersistence for TaskStore {
    fn create_task_dir(&self, id: &TaskId) -> Result<(), TaskError> {
        self.fs
            .createdir(&self.root)
            .map_err(|e| TaskError::from(StorageError::from(e)))?;
        let dir = layout::task_dir(&self.root, id);
        if self.fs.exists(&dir) {
            return Ok(());
        }
        self.fs
            .mkdir(&dir)
            .map_err(|e| TaskError::from(StorageError::TaskDirError(e.to_string())))
    }

    fn save(&self, snapshot: TaskSnapshot) -> Result<(), TaskError> {
        self.save_snapshot(snapshot).map_err(Into::into)
    }

    fn clean(&self, id: &TaskId) -> Result<(), TaskError> {
        let dir = layout::task_dir(&self.root, id);
        self.fs
            .cleanupdir(&dir)
            .map_err(|e| TaskError::from(StorageError::from(e)))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
