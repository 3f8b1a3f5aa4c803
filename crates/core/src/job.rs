// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Job`: a callable scheduled for execution by a [`crate::Task`] on its
//! worker thread.
//!
//! The original carried a function pointer plus `*args`/`**kwargs`; here the
//! closure captures whatever it needs directly, which is the idiomatic
//! replacement. `runcmd` is kept purely as the printable description stored
//! in the task's metadata.

use std::fmt;
use std::sync::Arc;

use crate::error::TaskError;

crate::define_id! {
    /// Identifies a [`Job`] within its owning task (currently just its name).
    pub struct JobId;
}

/// Output of a job's body, carried through to the task's result.
pub type JobOutput = String;

/// A job's callable. Consumed on first (and only) run.
pub type JobFn = Box<dyn FnOnce() -> Result<Option<JobOutput>, TaskError> + Send>;

/// A hook invoked just before a job runs, mirroring the original's
/// `Job.setCallback` (called with the job itself, before `cmd`).
pub type JobCallback = Arc<dyn Fn(&Job) + Send + Sync>;

/// A unit of asynchronous work belonging to exactly one [`crate::Task`].
pub struct Job {
    name: String,
    runcmd: String,
    cmd: Option<JobFn>,
    callback: Option<JobCallback>,
    bound: bool,
}

impl Job {
    /// Build a job with a runnable body. `runcmd` should be a printable
    /// description (the original built it from `repr(cmd)` plus its args;
    /// here the caller supplies it directly since closures aren't
    /// introspectable).
    pub fn new(name: impl Into<String>, runcmd: impl Into<String>, cmd: JobFn) -> Self {
        Self {
            name: name.into(),
            runcmd: runcmd.into(),
            cmd: Some(cmd),
            callback: None,
            bound: false,
        }
    }

    /// Build a placeholder job produced by [`crate::task::Task::from_snapshot`]
    /// on reload: inspection/recovery only, its `cmd` is unset, running it
    /// is an error.
    pub fn placeholder(name: impl Into<String>, runcmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runcmd: runcmd.into(),
            cmd: None,
            callback: None,
            bound: false,
        }
    }

    pub fn set_callback(&mut self, callback: impl Fn(&Job) + Send + Sync + 'static) {
        self.callback = Some(Arc::new(callback));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runcmd(&self) -> &str {
        &self.runcmd
    }

    /// Persistable view of this job (`name`, `runcmd`); `cmd` never persists.
    pub fn record(&self) -> JobRecord {
        JobRecord {
            name: self.name.clone(),
            runcmd: self.runcmd.clone(),
        }
    }

    pub(crate) fn bind(&mut self) {
        self.bound = true;
    }

    /// Run the job's body through its callback hook. Consumes `cmd`; a
    /// second call (or a call on a reloaded placeholder) fails with
    /// `InvalidJob`, matching the original's "no parent task" guard applied
    /// to the "no command to run" case.
    pub(crate) fn run(&mut self) -> Result<Option<JobOutput>, TaskError> {
        if !self.bound {
            return Err(TaskError::InvalidJob(format!("{}: no parent task", self.name)));
        }
        if let Some(callback) = self.callback.clone() {
            callback(self);
        }
        let cmd = self
            .cmd
            .take()
            .ok_or_else(|| TaskError::InvalidJob(format!("{}: no command to run", self.name)))?;
        cmd()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("runcmd", &self.runcmd)
            .field("bound", &self.bound)
            .finish()
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.runcmd)
    }
}

/// The persisted fields of a [`Job`]; one `<id>.job.<n>` metafile per job.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JobRecord {
    pub name: String,
    pub runcmd: String,
}

impl JobRecord {
    /// Materialize a placeholder [`Job`] for reload/inspection.
    pub fn into_placeholder(self) -> Job {
        Job::placeholder(self.name, self.runcmd)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
