// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage-layer error taxonomy. Richer than `taskd_core::TaskError`'s
//! persistence variants -- this crate is where I/O actually happens, so it
//! keeps the underlying cause around for diagnostics before collapsing to
//! the coarser `TaskError` the `Task` state machine consumes.

use taskd_adapters::FsError;
use taskd_core::TaskError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("failed to load task metadata from {0}: {1}")]
    TaskMetaDataLoadError(String, String),

    #[error("failed to save task metadata to {0}: {1}")]
    TaskMetaDataSaveError(String, String),

    #[error("task directory error: {0}")]
    TaskDirError(String),

    #[error("task persist error: {0}")]
    TaskPersistError(String),

    #[error("metafile line is malformed: {0:?}")]
    MalformedLine(String),

    #[error("metafile is missing required field {0}")]
    MissingField(&'static str),

    #[error("metafile field {field} has invalid value {value:?}: {reason}")]
    InvalidField { field: &'static str, value: String, reason: String },

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl From<StorageError> for TaskError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TaskMetaDataLoadError(path, reason) => {
                TaskError::TaskMetaDataLoadError(format!("{path}: {reason}"))
            }
            StorageError::TaskMetaDataSaveError(path, reason) => {
                TaskError::TaskMetaDataSaveError(format!("{path}: {reason}"))
            }
            StorageError::TaskDirError(msg) => TaskError::TaskDirError(msg),
            StorageError::TaskPersistError(msg) => TaskError::TaskPersistError(msg),
            other @ (StorageError::MalformedLine(_)
            | StorageError::MissingField(_)
            | StorageError::InvalidField { .. }) => TaskError::TaskMetaDataLoadError(other.to_string()),
            StorageError::Fs(e) => TaskError::TaskPersistError(e.to_string()),
        }
    }
}
