// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the daemon process: wiring, crash-resume, and
//! submission errors that don't belong to the state machine itself.

use thiserror::Error;

use taskd_core::TaskError;
use taskd_storage::StorageError;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
