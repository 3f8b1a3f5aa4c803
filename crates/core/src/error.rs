// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the task engine.

use thiserror::Error;

/// Errors raised by the [`crate::Task`] state machine and its value objects.
#[derive(Debug, Error, Clone)]
pub enum TaskError {
    /// A constructor argument failed validation (bad id, bad tag, bad
    /// recovery/job name).
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: String, value: String },

    /// `addJob` was called on a task with no manager set.
    #[error("task {0} is not managed by a TaskManager")]
    UnmanagedTask(String),

    /// An operation is not legal for the task's current state (distinct
    /// from a rejected `moveto`, e.g. `persist()` while `init`).
    #[error("task state error: {0}")]
    TaskStateError(String),

    /// `State::moveto` rejected an edge and `force` was not set.
    #[error("invalid state transition: from {from} to {to}")]
    TaskStateTransitionError { from: String, to: String },

    /// Metafile directory load failed (I/O, missing fields, bad id match).
    #[error("failed to load task metadata from {0}")]
    TaskMetaDataLoadError(String),

    /// Metafile directory save failed.
    #[error("failed to save task metadata to {0}")]
    TaskMetaDataSaveError(String),

    /// The expected task directory does not exist.
    #[error("task directory error: {0}")]
    TaskDirError(String),

    /// The atomic directory swap (`_save`) failed.
    #[error("task persist error: {0}")]
    TaskPersistError(String),

    /// A [`crate::Job`] has no owning task, or a duplicate/empty name.
    #[error("invalid job: {0}")]
    InvalidJob(String),

    /// A [`crate::Recovery`] has no owning task, or a duplicate/empty/malformed name.
    #[error("invalid recovery: {0}")]
    InvalidRecovery(String),

    /// A domain error raised from inside a job or recovery body.
    #[error("storage exception ({code}): {message}")]
    StorageException { code: i32, message: String },

    /// The uniform wrapper `_run` raises once a job/recovery body fails;
    /// carries the `(message, code)` that become the task's result.
    #[error("task aborted: {message}")]
    TaskAborted { message: String, code: i32 },

    /// `_doRecover`/`rollback` guard: another reference is still active.
    #[error("task {0} still has active references")]
    TaskHasRefs(String),

    /// `rollback()` was called on a task that has not reached a terminal state.
    #[error("task {0} is not finished")]
    TaskNotFinished(String),
}

impl TaskError {
    /// The numeric code carried by this error, for results/metafiles.
    /// Mirrors `vdsm`'s convention: unclassified errors carry code 100.
    pub fn code(&self) -> i32 {
        match self {
            TaskError::StorageException { code, .. } => *code,
            TaskError::TaskAborted { code, .. } => *code,
            _ => 100,
        }
    }

    /// Construct the uniform "aborted" wrapper from an arbitrary error,
    /// the way `Task::_run` converts any exception into `TaskAborted`.
    pub fn into_aborted(self) -> TaskError {
        match self {
            TaskError::TaskAborted { .. } => self,
            TaskError::StorageException { code, message } => TaskError::TaskAborted { message, code },
            other => {
                let code = other.code();
                TaskError::TaskAborted {
                    message: other.to_string(),
                    code,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
