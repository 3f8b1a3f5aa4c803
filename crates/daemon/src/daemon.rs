// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Daemon`]: wires the concrete collaborators (`taskd-storage`'s
//! [`TaskStore`], `taskd-engine`'s [`ResourceManager`]/[`TaskManager`]) to
//! `taskd-core`'s [`Task`] state machine, and implements the two operations
//! that only make sense with all of them in hand: submitting new work and
//! resuming after a crash.

use std::path::PathBuf;
use std::sync::Arc;

use taskd_adapters::RealFsHelper;
use taskd_core::id::UuidIdGen;
use taskd_core::task::Task;
use taskd_core::{
    RecoveryRegistry, TaskCleanPolicy, TaskError, TaskId, TaskPersistPolicy, TaskPriority, TaskRecoveryPolicy,
};
use taskd_engine::{ResourceManager, TaskManager};
use taskd_storage::TaskStore;

use crate::error::DaemonError;

/// Owns every long-lived collaborator a running task needs: the lock
/// manager, the worker pool, the on-disk store, and the recovery lookup
/// table. One per process.
pub struct Daemon {
    store: Arc<TaskStore>,
    resource_manager: Arc<ResourceManager>,
    task_manager: Arc<TaskManager>,
    recovery_registry: Arc<RecoveryRegistry>,
    id_gen: UuidIdGen,
}

impl Daemon {
    pub fn new(state_dir: PathBuf) -> Arc<Self> {
        Self::with_recovery_registry(state_dir, RecoveryRegistry::new())
    }

    /// As [`Daemon::new`], but with a recovery registry the caller has
    /// already populated. The registry can't be added to after a task has
    /// been bound to it, so it must be complete before any task is created.
    pub fn with_recovery_registry(state_dir: PathBuf, recovery_registry: RecoveryRegistry) -> Arc<Self> {
        let fs = Arc::new(RealFsHelper::new());
        let store = Arc::new(TaskStore::new(fs, state_dir));
        Arc::new(Self {
            store,
            resource_manager: ResourceManager::new(),
            task_manager: TaskManager::new(taskd_engine::config::worker_pool_size()),
            recovery_registry: Arc::new(recovery_registry),
            id_gen: UuidIdGen,
        })
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Build, persist, and run a new task (`submitTask`). `func` runs
    /// synchronously during `prepare`, with the opportunity to register
    /// jobs/recoveries/resource requests before returning; everything after
    /// that (resource grants, job execution, persistence) happens off the
    /// worker pool.
    pub fn submit<F>(
        self: &Arc<Self>,
        name: impl Into<String>,
        tag: impl Into<String>,
        recovery_policy: TaskRecoveryPolicy,
        priority: TaskPriority,
        func: Option<F>,
    ) -> Result<Arc<Task>, TaskError>
    where
        F: FnOnce() -> Result<Option<String>, TaskError>,
    {
        let owner = self.resource_manager.new_owner();
        let task = Task::with_generated_id(&self.id_gen, name, tag, recovery_policy, priority, owner.clone())?;
        owner.bind(&task);
        task.set_manager(self.task_manager.clone());
        task.set_recovery_registry(self.recovery_registry.clone());
        task.set_persistence(self.store.clone(), TaskPersistPolicy::Auto, TaskCleanPolicy::Auto)?;
        task.prepare(func)?;
        Ok(task)
    }

    /// Rehydrate a persisted task and wire it back up to this daemon's
    /// collaborators, without driving its state machine. Used by
    /// [`Daemon::scan_and_recover`] and by callers (`taskctl`) that need a
    /// live `Task` handle for `status`/`rollback`/`clean`.
    pub fn load_task(self: &Arc<Self>, id: &TaskId) -> Result<Arc<Task>, DaemonError> {
        let snapshot = self.store.load(id)?;
        let owner = self.resource_manager.new_owner();
        let task = Task::from_snapshot(snapshot, owner.clone())?;
        owner.bind(&task);
        task.set_manager(self.task_manager.clone());
        task.set_recovery_registry(self.recovery_registry.clone());
        task.set_persistence(self.store.clone(), TaskPersistPolicy::Auto, TaskCleanPolicy::Auto)?;
        Ok(task)
    }

    /// Crash-resume scan: reload every task directory
    /// under the store root, skip ones that already reached a terminal
    /// state, and call `Task::recover` on the rest so they re-enter the
    /// state machine from wherever they were left.
    pub fn scan_and_recover(self: &Arc<Self>) -> Result<Vec<TaskId>, DaemonError> {
        let mut resumed = Vec::new();
        for id in self.store.scan_ids()? {
            let state = match self.store.load(&id) {
                Ok(snapshot) => snapshot.state,
                Err(e) => {
                    tracing::warn!(task = %id, error = %e, "scan_and_recover: failed to load task, skipping");
                    continue;
                }
            };
            if state.is_done() {
                continue;
            }
            let task = match self.load_task(&id) {
                Ok(task) => task,
                Err(e) => {
                    tracing::warn!(task = %id, error = %e, "scan_and_recover: failed to rehydrate task, skipping");
                    continue;
                }
            };
            tracing::info!(task = %id, %state, "scan_and_recover: resuming task");
            task.recover();
            resumed.push(id);
        }
        Ok(resumed)
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
