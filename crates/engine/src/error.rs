// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the resource manager and worker pool.

use thiserror::Error;

use taskd_core::TaskError;

#[derive(Debug, Error, Clone)]
pub enum ResourceError {
    /// `acquire`'s request was not granted before its deadline elapsed.
    #[error("timed out waiting for {lock_type} lock on {namespace}.{name}")]
    Timeout {
        namespace: String,
        name: String,
        lock_type: String,
    },

    /// The worker pool's queue has already been shut down.
    #[error("task queue is shut down")]
    QueueClosed,
}

impl From<ResourceError> for TaskError {
    fn from(e: ResourceError) -> Self {
        TaskError::TaskAborted {
            message: e.to_string(),
            code: 100,
        }
    }
}
