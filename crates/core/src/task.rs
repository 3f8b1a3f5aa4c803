// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Task` state machine: prepare -> run jobs -> finish, or
//! abort -> recover. See `state.rs` for the authoritative transition
//! tables this module implements.
//!
//! Two independent locks guard mutable state, following a
//! `lock`/`callbackLock` split:
//!
//! - `refs` (structural): `ref` count and the `_aborting`/`_forceAbort`
//!   flags. Held only for short critical sections, never across a call into
//!   `ResourceOwner`, `TaskScheduler`, or `TaskPersistence`.
//! - `callback_lock`: serializes [`Task::resource_registered`] and
//!   [`Task::resource_acquired`] so callbacks from the resource manager's
//!   (possibly foreign) thread cannot interleave their state transitions.
//!
//! A third lock, `inner`, is a Rust-only addition: the original relied on the
//! GIL to make reads/writes of `state`/`jobs`/`recoveries` atomic with
//! respect to other threads without a dedicated lock. Rust has no GIL, so
//! those fields need real synchronization; `inner` plays that role and is
//! never held across an external call either (job bodies, recovery bodies,
//! and `TaskPersistence::save` all run with `inner` unlocked -- see
//! `run_jobs`/`recover`).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::TaskError;
use crate::id::IdGen;
use crate::job::{Job, JobRecord};
use crate::policy::{TaskCleanPolicy, TaskPersistPolicy, TaskPriority, TaskRecoveryPolicy};
use crate::recovery::{Recovery, RecoveryRecord, RecoveryRegistry};
use crate::state::{deprecated_result_label, deprecated_state_label, State};
use crate::task_resource::LockType;
use crate::task_result::TaskResult;
use crate::TaskId;

/// Per-task handle into the namespaced external lock manager. Implemented by
/// `taskd-engine`; `Task` only ever calls through this trait.
pub trait ResourceOwner: Send + Sync {
    fn acquire(&self, namespace: &str, name: &str, lock_type: LockType, timeout: Duration) -> Result<(), TaskError>;
    fn cancel_all(&self);
    fn release_all(&self);
    /// True iff every request registered through `acquire` has been granted.
    fn requests_granted(&self) -> bool;
}

/// External worker-pool scheduler: `queue(task)`. Implemented by `taskd-engine`.
pub trait TaskScheduler: Send + Sync {
    fn queue(&self, task: Arc<Task>) -> Result<(), TaskError>;
}

/// Crash-safe on-disk persistence of a task's metadata. Implemented by
/// `taskd-storage`; `Task` hands over an owned [`TaskSnapshot`] rather than
/// touching the filesystem itself.
pub trait TaskPersistence: Send + Sync {
    /// Create (or verify) `store/<id>/`, per `setPersistence`.
    fn create_task_dir(&self, id: &TaskId) -> Result<(), TaskError>;
    fn save(&self, snapshot: TaskSnapshot) -> Result<(), TaskError>;
    fn clean(&self, id: &TaskId) -> Result<(), TaskError>;
}

/// Everything about a [`Task`] that gets written to or read from disk.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub tag: String,
    pub priority: TaskPriority,
    pub persist_policy: TaskPersistPolicy,
    pub clean_policy: TaskCleanPolicy,
    pub recovery_policy: TaskRecoveryPolicy,
    pub state: State,
    pub njobs: usize,
    pub nrecoveries: usize,
    pub metadata_version: u32,
    pub jobs: Vec<JobRecord>,
    pub recoveries: Vec<RecoveryRecord>,
    /// Only present once `state` reaches `Finished`.
    pub result: Option<TaskResult>,
}

/// `{state:{code,message}, task:{id,state}, result}` -- `Task::getStatus`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TaskStatus {
    pub state: StatusCode,
    pub task: TaskIdentity,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StatusCode {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TaskIdentity {
    pub id: TaskId,
    pub state: String,
}

/// `Task::deprecated_getStatus`'s legacy mapping, preserved byte-for-byte
/// : compressed state/result labels, not the real ones.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeprecatedTaskStatus {
    pub task_id: TaskId,
    pub task_state: &'static str,
    pub task_result: &'static str,
    pub code: i32,
    pub message: String,
}

/// `Task::getInfo`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
}

/// Outcome of [`Task::prepare`]: either the task finished synchronously, or
/// jobs were registered and it has moved on to acquiring resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    Queued { uuid: TaskId },
    Finished { result: Option<String> },
}

/// The `lock`-guarded fields: `ref` plus the abort-request flags.
struct RefGuard {
    count: i64,
    aborting: bool,
    force_abort: bool,
}

/// The GIL-substitute lock guarding everything else mutable about a task.
struct Inner {
    name: String,
    tag: String,
    state: State,
    result: TaskResult,
    error: TaskError,
    jobs: Vec<Job>,
    recoveries: Vec<Recovery>,
    njobs: usize,
    nrecoveries: usize,
    persist_policy: TaskPersistPolicy,
    clean_policy: TaskCleanPolicy,
    recovery_policy: TaskRecoveryPolicy,
    manager: Option<Arc<dyn TaskScheduler>>,
    persistence: Option<Arc<dyn TaskPersistence>>,
    recovery_registry: Option<Arc<RecoveryRegistry>>,
    /// Non-`None` only as informational bookkeeping for `setPersistence`'s
    /// "store is set" invariant -- the actual path lives inside
    /// whatever implements [`TaskPersistence`].
    store_root: Option<PathBuf>,
}

/// A single administrative operation against a storage subsystem.
///
/// See the module doc for the locking discipline. Operations that may need
/// to hand a live reference to an external collaborator (`queue(task)`) take
/// `self: &Arc<Task>`; read-only accessors and simple mutations take `&self`.
pub struct Task {
    id: TaskId,
    priority: TaskPriority,
    metadata_version: u32,
    resource_owner: Arc<dyn ResourceOwner>,
    refs: Mutex<RefGuard>,
    callback_lock: Mutex<()>,
    inner: Mutex<Inner>,
}

/// RAII mirror of the original's `try/finally: self._decref(force)`.
struct DecrefGuard<'a> {
    task: &'a Arc<Task>,
    force: bool,
}

impl Drop for DecrefGuard<'_> {
    fn drop(&mut self) {
        self.task.decref(self.force);
    }
}

impl Task {
    fn validate_id(id: &str) -> Result<(), TaskError> {
        if id.is_empty() || id.contains('.') {
            return Err(TaskError::InvalidParameter {
                name: "id".to_string(),
                value: id.to_string(),
            });
        }
        Ok(())
    }

    /// Construct a new task in state `init`. `id` must be non-empty and
    /// `.`-free (the on-disk layout uses `.` as the job/recovery/variant
    /// suffix separator).
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        tag: impl Into<String>,
        recovery_policy: TaskRecoveryPolicy,
        priority: TaskPriority,
        resource_owner: Arc<dyn ResourceOwner>,
    ) -> Result<Arc<Self>, TaskError> {
        let id = id.into();
        Self::validate_id(&id)?;
        Ok(Arc::new(Self {
            id: TaskId::new(id),
            priority,
            metadata_version: crate::TASK_METADATA_VERSION,
            resource_owner,
            refs: Mutex::new(RefGuard {
                count: 0,
                aborting: false,
                force_abort: false,
            }),
            callback_lock: Mutex::new(()),
            inner: Mutex::new(Inner {
                name: name.into(),
                tag: tag.into(),
                state: State::Init,
                result: TaskResult::default(),
                error: TaskError::TaskAborted {
                    message: "Unknown error encountered".to_string(),
                    code: 100,
                },
                jobs: Vec::new(),
                recoveries: Vec::new(),
                njobs: 0,
                nrecoveries: 0,
                persist_policy: TaskPersistPolicy::None,
                clean_policy: TaskCleanPolicy::Auto,
                recovery_policy,
                manager: None,
                persistence: None,
                recovery_registry: None,
                store_root: None,
            }),
        }))
    }

    /// Like [`Task::new`], but generates the id via `id_gen` (matches the
    /// original's `if not id: id = uuid.uuid4()`).
    pub fn with_generated_id(
        id_gen: &dyn IdGen,
        name: impl Into<String>,
        tag: impl Into<String>,
        recovery_policy: TaskRecoveryPolicy,
        priority: TaskPriority,
        resource_owner: Arc<dyn ResourceOwner>,
    ) -> Result<Arc<Self>, TaskError> {
        Self::new(id_gen.next(), name, tag, recovery_policy, priority, resource_owner)
    }

    /// Rehydrate a task from a loaded [`TaskSnapshot`] (`loadTask`'s
    /// in-memory half; `taskd-storage` does the file reading). Produces
    /// placeholder jobs -- this is for inspection/recovery, not
    /// re-execution of job bodies.
    pub fn from_snapshot(snapshot: TaskSnapshot, resource_owner: Arc<dyn ResourceOwner>) -> Result<Arc<Self>, TaskError> {
        Self::validate_id(snapshot.id.as_str())?;
        let mut jobs: Vec<Job> = snapshot.jobs.into_iter().map(JobRecord::into_placeholder).collect();
        for job in &mut jobs {
            job.bind();
        }
        let mut recoveries = Vec::with_capacity(snapshot.recoveries.len());
        for record in snapshot.recoveries {
            let mut recovery = record.into_recovery()?;
            recovery.bind();
            recoveries.push(recovery);
        }
        let njobs = jobs.len();
        let nrecoveries = recoveries.len();
        Ok(Arc::new(Self {
            id: snapshot.id,
            priority: snapshot.priority,
            metadata_version: snapshot.metadata_version,
            resource_owner,
            refs: Mutex::new(RefGuard {
                count: 0,
                aborting: false,
                force_abort: false,
            }),
            callback_lock: Mutex::new(()),
            inner: Mutex::new(Inner {
                name: snapshot.name,
                tag: snapshot.tag,
                state: snapshot.state,
                result: snapshot.result.unwrap_or_default(),
                error: TaskError::TaskAborted {
                    message: "Unknown error encountered".to_string(),
                    code: 100,
                },
                jobs,
                recoveries,
                njobs,
                nrecoveries,
                persist_policy: snapshot.persist_policy,
                clean_policy: snapshot.clean_policy,
                recovery_policy: snapshot.recovery_policy,
                manager: None,
                persistence: None,
                recovery_registry: None,
                store_root: None,
            }),
        }))
    }

    // -- trivial accessors ----------------------------------------------------

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    pub fn name(&self) -> String {
        self.inner.lock().name.clone()
    }

    pub fn get_tags(&self) -> String {
        self.inner.lock().tag.clone()
    }

    pub fn set_tag(&self, tag: impl Into<String>) -> Result<(), TaskError> {
        let tag = tag.into();
        if tag.contains(crate::KEY_SEPARATOR) {
            return Err(TaskError::InvalidParameter {
                name: "tag".to_string(),
                value: tag,
            });
        }
        self.inner.lock().tag = tag;
        Ok(())
    }

    pub fn get_info(&self) -> TaskInfo {
        let inner = self.inner.lock();
        TaskInfo {
            id: self.id.clone(),
            name: inner.name.clone(),
        }
    }

    pub fn get_state(&self) -> String {
        self.state().to_string()
    }

    pub fn is_done(&self) -> bool {
        self.state().is_done()
    }

    /// `_aborting || state in {aborting, raborting}`.
    pub fn aborting(&self) -> bool {
        let refs = self.refs.lock();
        refs.aborting || matches!(self.state(), State::Aborting | State::Raborting)
    }

    pub fn persist_policy(&self) -> TaskPersistPolicy {
        self.inner.lock().persist_policy
    }

    pub fn clean_policy(&self) -> TaskCleanPolicy {
        self.inner.lock().clean_policy
    }

    pub fn recovery_policy(&self) -> TaskRecoveryPolicy {
        self.inner.lock().recovery_policy
    }

    /// `None` until [`Task::set_persistence`] has been called.
    pub fn store_root(&self) -> Option<PathBuf> {
        self.inner.lock().store_root.clone()
    }

    pub fn set_clean_policy(&self, policy: TaskCleanPolicy) {
        self.inner.lock().clean_policy = policy;
    }

    pub fn set_recovery_policy(&self, policy: TaskRecoveryPolicy) {
        self.inner.lock().recovery_policy = policy;
    }

    pub fn set_manager(&self, manager: Arc<dyn TaskScheduler>) {
        self.inner.lock().manager = Some(manager);
    }

    pub fn set_recovery_registry(&self, registry: Arc<RecoveryRegistry>) {
        self.inner.lock().recovery_registry = Some(registry);
    }

    /// `getStatus`.
    pub fn get_status(&self) -> TaskStatus {
        let inner = self.inner.lock();
        TaskStatus {
            state: StatusCode {
                code: inner.result.code,
                message: inner.result.message.clone(),
            },
            task: TaskIdentity {
                id: self.id.clone(),
                state: inner.state.to_string(),
            },
            result: inner.result.result.clone(),
        }
    }

    /// `deprecated_getStatus`, preserved byte-for-byte.
    pub fn deprecated_get_status(&self) -> DeprecatedTaskStatus {
        let inner = self.inner.lock();
        DeprecatedTaskStatus {
            task_id: self.id.clone(),
            task_state: deprecated_state_label(inner.state),
            task_result: deprecated_result_label(inner.state),
            code: inner.result.code,
            message: inner.result.message.clone(),
        }
    }

    /// `dumpTask`: a human-readable diagnostic dump, never persisted.
    pub fn dump(&self) -> String {
        let inner = self.inner.lock();
        let mut out = format!(
            "Task: {{id={}, name={}, tag={}, state={}}}",
            self.id, inner.name, inner.tag, inner.state
        );
        for (i, recovery) in inner.recoveries.iter().enumerate() {
            out.push_str(&format!(" Recovery{i}: {recovery}"));
        }
        for (i, job) in inner.jobs.iter().enumerate() {
            out.push_str(&format!(" Job{i}: {job}"));
        }
        out
    }

    // -- lock convenience wrappers ---------------------------------------------

    pub fn acquire_exclusive(&self, namespace: &str, name: &str, timeout: Duration) -> Result<(), TaskError> {
        self.resource_owner.acquire(namespace, name, LockType::Exclusive, timeout)
    }

    pub fn acquire_shared(&self, namespace: &str, name: &str, timeout: Duration) -> Result<(), TaskError> {
        self.resource_owner.acquire(namespace, name, LockType::Shared, timeout)
    }

    // -- job / recovery stack mutation ---------------------------------------

    /// Only legal while `preparing`, with a manager set and a unique,
    /// non-empty name.
    pub fn add_job(&self, mut job: Job) -> Result<(), TaskError> {
        let mut inner = self.inner.lock();
        if inner.manager.is_none() {
            return Err(TaskError::UnmanagedTask(self.id.to_string()));
        }
        if inner.state != State::Preparing {
            return Err(TaskError::TaskStateError(format!(
                "can't add job in non preparing state ({})",
                inner.state
            )));
        }
        if job.name().is_empty() {
            return Err(TaskError::InvalidJob("name is required".to_string()));
        }
        if inner.jobs.iter().any(|j| j.name() == job.name()) {
            return Err(TaskError::InvalidJob(format!("name '{}' must be unique", job.name())));
        }
        job.bind();
        inner.jobs.push(job);
        inner.njobs = inner.jobs.len();
        Ok(())
    }

    /// Appends to the recovery stack and persists it.
    pub fn push_recovery(&self, mut recovery: Recovery) -> Result<(), TaskError> {
        {
            let mut inner = self.inner.lock();
            if recovery.name().is_empty() {
                return Err(TaskError::InvalidRecovery("name is required".to_string()));
            }
            if inner.recoveries.iter().any(|r| r.name() == recovery.name()) {
                return Err(TaskError::InvalidRecovery(format!(
                    "name '{}' must be unique",
                    recovery.name()
                )));
            }
            recovery.bind();
            inner.recoveries.push(recovery);
            inner.nrecoveries = inner.recoveries.len();
        }
        self.persist()
    }

    /// Replaces the entire recovery stack with a single entry and persists.
    pub fn replace_recoveries(&self, mut recovery: Recovery) -> Result<(), TaskError> {
        if recovery.name().is_empty() {
            return Err(TaskError::InvalidRecovery("name is required".to_string()));
        }
        recovery.bind();
        {
            let mut inner = self.inner.lock();
            inner.recoveries = vec![recovery];
            inner.nrecoveries = 1;
        }
        self.persist()
    }

    pub fn pop_recovery(&self) -> Option<Recovery> {
        let mut inner = self.inner.lock();
        let popped = inner.recoveries.pop();
        inner.nrecoveries = inner.recoveries.len();
        popped
    }

    pub fn remove_recovery(&self, name: &str) {
        let mut inner = self.inner.lock();
        inner.recoveries.retain(|r| r.name() != name);
        inner.nrecoveries = inner.recoveries.len();
    }

    pub fn clear_recoveries(&self) {
        let mut inner = self.inner.lock();
        inner.recoveries.clear();
        inner.nrecoveries = 0;
    }

    fn has_jobs(&self) -> bool {
        !self.inner.lock().jobs.is_empty()
    }

    // -- persistence ----------------------------------------------------------

    /// Creates the task directory (via `persistence`) and, if `auto` and
    /// already past `init`, persists immediately.
    pub fn set_persistence(
        &self,
        persistence: Arc<dyn TaskPersistence>,
        persist_policy: TaskPersistPolicy,
        clean_policy: TaskCleanPolicy,
    ) -> Result<(), TaskError> {
        persistence.create_task_dir(&self.id)?;
        let needs_immediate_persist = {
            let mut inner = self.inner.lock();
            inner.persist_policy = persist_policy;
            inner.clean_policy = clean_policy;
            inner.store_root = Some(PathBuf::from(self.id.as_str()));
            inner.persistence = Some(persistence);
            persist_policy == TaskPersistPolicy::Auto && inner.state != State::Init
        };
        if needs_immediate_persist {
            self.persist()?;
        }
        Ok(())
    }

    /// A self-contained, persistable snapshot of this task's current fields.
    pub fn snapshot(&self) -> TaskSnapshot {
        let mut inner = self.inner.lock();
        inner.njobs = inner.jobs.len();
        inner.nrecoveries = inner.recoveries.len();
        TaskSnapshot {
            id: self.id.clone(),
            name: inner.name.clone(),
            tag: inner.tag.clone(),
            priority: self.priority,
            persist_policy: inner.persist_policy,
            clean_policy: inner.clean_policy,
            recovery_policy: inner.recovery_policy,
            state: inner.state,
            njobs: inner.njobs,
            nrecoveries: inner.nrecoveries,
            metadata_version: self.metadata_version,
            jobs: inner.jobs.iter().map(Job::record).collect(),
            recoveries: inner.recoveries.iter().map(Recovery::record).collect(),
            result: (inner.state == State::Finished).then(|| inner.result.clone()),
        }
    }

    /// Save the task's current metadata. No-op when `persist_policy` is
    /// `None` -- a non-persistent standalone task has no store and nothing
    /// to save, and callers like [`Task::push_recovery`] call this
    /// unconditionally regardless of policy. Otherwise requires a store to
    /// have been set via [`Task::set_persistence`].
    pub fn persist(&self) -> Result<(), TaskError> {
        let (persist_policy, persistence) = {
            let inner = self.inner.lock();
            (inner.persist_policy, inner.persistence.clone())
        };
        if persist_policy == TaskPersistPolicy::None {
            return Ok(());
        }
        let persistence = persistence.ok_or_else(|| TaskError::TaskPersistError("no store defined".to_string()))?;
        if self.state() == State::Init {
            return Err(TaskError::TaskStateError(format!("can't persist in state {}", self.state())));
        }
        persistence.save(self.snapshot())
    }

    /// Only legal once the task is done; no-op if persistence was never set.
    pub fn clean(&self) -> Result<(), TaskError> {
        let persistence = self.inner.lock().persistence.clone();
        let persistence = match persistence {
            Some(p) => p,
            None => return Ok(()),
        };
        if !self.is_done() {
            return Err(TaskError::TaskStateError(format!("can't clean in state {}", self.state())));
        }
        persistence.clean(&self.id)
    }

    /// Only legal once done and `recoveryPolicy != none`.
    pub fn rollback(self: &Arc<Self>) -> Result<(), TaskError> {
        if self.recovery_policy() == TaskRecoveryPolicy::None {
            return Ok(());
        }
        if !self.is_done() {
            return Err(TaskError::TaskNotFinished(self.id.to_string()));
        }
        self.do_recover()
    }

    // -- error bookkeeping ------------------------------------------------------

    fn set_error(&self, error: TaskError) {
        self.inner.lock().error = error;
    }

    fn current_error(&self) -> TaskError {
        self.inner.lock().error.clone()
    }

    fn update_result(&self, code: i32, message: impl Into<String>, result: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.result = TaskResult::new(code, message, result);
    }

    /// `_run`: uniformly wrap any failure from `f` as `TaskAborted`, record
    /// it as the tasks error, and `stop()` the task.
    fn run<F>(self: &Arc<Self>, f: F) -> Result<Option<String>, TaskError>
    where
        F: FnOnce() -> Result<Option<String>, TaskError>,
    {
        match f() {
            Ok(value) => Ok(value),
            Err(err) => {
                let aborted = err.into_aborted();
                self.set_error(aborted.clone());
                tracing::debug!(task = %self.id, error = %aborted, "_run: failed, stopping task");
                self.stop(false);
                Err(aborted)
            }
        }
    }

    // -- public entry points -----------------------------------------------------

    /// Increments `ref`, transitions to `preparing`, runs `func` through
    /// `_run`. If still aborting afterward, fails with the stored error. If
    /// jobs were registered, advances to `acquiring`; otherwise finishes
    /// synchronously when a task has no jobs to run.
    pub fn prepare<F>(self: &Arc<Self>, func: Option<F>) -> Result<PrepareOutcome, TaskError>
    where
        F: FnOnce() -> Result<Option<String>, TaskError>,
    {
        if self.incref(false).is_err() {
            self.do_abort(false);
            return Err(self.current_error());
        }
        let _guard = DecrefGuard { task: self, force: false };

        self.advance(State::Preparing);

        let mut code = 100;
        let mut message = self.current_error().to_string();
        let mut result = None;
        if let Some(func) = func {
            match self.run(func) {
                Ok(value) => result = value,
                Err(TaskError::TaskAborted { message: m, code: c }) => {
                    tracing::info!(task = %self.id, error = %m, "prepare: aborting");
                    message = m;
                    code = c;
                }
                Err(other) => return Err(other),
            }
        }

        if self.aborting() {
            self.update_result(code, format!("Task prepare failed: {message}"), "");
            return Err(self.current_error());
        }

        if self.has_jobs() {
            self.advance(State::Acquiring);
            return Ok(PrepareOutcome::Queued { uuid: self.id.clone() });
        }

        self.update_result(0, "OK", result.clone().unwrap_or_default());
        self.advance(State::Finished);
        Ok(PrepareOutcome::Finished { result })
    }

    /// Sets the thread-local "current task" (owned by `taskd-engine`'s
    /// worker pool, not this crate), increments `ref`, transitions to
    /// `running`.
    pub fn commit(self: &Arc<Self>) {
        if self.incref(false).is_err() {
            self.do_abort(false);
            return;
        }
        let _guard = DecrefGuard { task: self, force: false };
        self.advance(State::Running);
    }

    /// Sets `_aborting` (and `_forceAbort` if `force`); the next decref to
    /// zero triggers the abort path.
    pub fn stop(self: &Arc<Self>, force: bool) {
        if self.incref(force).is_err() {
            // Matches the original: if incref itself raises, the matching
            // decref never runs either -- there is nothing to undo.
            return;
        }
        let _guard = DecrefGuard { task: self, force };
        if self.is_done() {
            tracing::debug!(task = %self.id, state = %self.state(), "stop: already stopped, ignoring");
            return;
        }
        let mut refs = self.refs.lock();
        refs.aborting = true;
        refs.force_abort = force;
    }

    /// Restart point after a daemon crash. Never call on an actively running
    /// task.
    pub fn recover(self: &Arc<Self>) {
        if self.incref(true).is_err() {
            self.do_abort(true);
            return;
        }
        let _guard = DecrefGuard { task: self, force: true };
        if self.is_done() {
            return;
        }
        let state = self.state();
        if state.can_abort() {
            self.stop(false);
        } else if state == State::Waitrecover {
            // keep waiting
        } else if matches!(state, State::Racquiring | State::Recovering) {
            if let Err(e) = self.update_state(State::Racquiring, true) {
                tracing::error!(task = %self.id, error = %e, "recover: forced re-entry to racquiring failed");
            }
        } else {
            self.stop(true);
        }
    }

    // -- resource-owner callback surface ---------------------------------------

    /// A request was queued but not yet granted.
    pub fn resource_registered(self: &Arc<Self>, namespace: &str, name: &str, lock_type: LockType) -> Result<(), TaskError> {
        self.incref(false)?;
        let _guard = DecrefGuard { task: self, force: false };
        let _cb = self.callback_lock.lock();
        tracing::debug!(task = %self.id, %namespace, %name, ?lock_type, "resource_registered");
        if self.state() == State::Preparing {
            self.advance(State::Blocked);
        }
        Ok(())
    }

    /// A request has been granted.
    pub fn resource_acquired(self: &Arc<Self>, namespace: &str, name: &str, lock_type: LockType) -> Result<(), TaskError> {
        self.incref(false)?;
        let _guard = DecrefGuard { task: self, force: false };
        let _cb = self.callback_lock.lock();
        tracing::debug!(task = %self.id, %namespace, %name, ?lock_type, "resource_acquired");
        match self.state() {
            State::Preparing => {}
            State::Acquiring => self.advance(State::Acquiring),
            State::Racquiring => self.advance(State::Racquiring),
            State::Blocked => self.advance(State::Preparing),
            State::Aborting | State::Raborting => {
                tracing::debug!(task = %self.id, state = %self.state(), "resource acquired while aborting");
            }
            other => {
                return Err(TaskError::TaskStateError(format!("acquire is not allowed in state {other}")));
            }
        }
        Ok(())
    }

    // -- state machine core -------------------------------------------------------

    /// `_updateState`: apply the abort overlay, validate+perform the
    /// transition, auto-persist, then dispatch the entry action.
    fn update_state(self: &Arc<Self>, requested: State, force: bool) -> Result<(), TaskError> {
        let actual = {
            let mut refs = self.refs.lock();
            let current = self.state();
            let mut next = requested;
            if refs.aborting {
                if current.can_abort() {
                    next = State::Aborting;
                } else if current.can_abort_recovery() && requested != State::Recovered {
                    next = State::Raborting;
                }
            }
            refs.aborting = false;
            next
        };

        let from = self.state();
        {
            let mut inner = self.inner.lock();
            inner.state.moveto(actual, force)?;
        }
        if actual == requested {
            tracing::debug!(task = %self.id, %from, to = %actual, "moving state");
        } else {
            tracing::debug!(task = %self.id, %from, to = %actual, requested = %requested, "abort overlay redirected state");
        }

        if self.persist_policy() == TaskPersistPolicy::Auto {
            if let Err(e) = self.persist() {
                tracing::warn!(task = %self.id, error = %e, "auto-persist failed after state transition");
            }
        }

        self.dispatch_entry_action(actual);
        Ok(())
    }

    /// Drive `update_state`, forcing the task to `failed` as a last resort
    /// if the transition itself fails.
    fn advance(self: &Arc<Self>, state: State) {
        if let Err(e) = self.update_state(state, false) {
            tracing::error!(task = %self.id, target = %state, error = %e, "state transition failed; forcing failed");
            if let Err(e) = self.update_state(State::Failed, true) {
                tracing::error!(task = %self.id, error = %e, "failed to force-fail task");
            }
        }
    }

    fn dispatch_entry_action(self: &Arc<Self>, state: State) {
        match state {
            State::Acquiring => {
                if self.resource_owner.requests_granted() {
                    self.advance(State::Queued);
                }
            }
            State::Queued => {
                let manager = self.inner.lock().manager.clone();
                if let Some(manager) = manager {
                    if let Err(e) = manager.queue(Arc::clone(self)) {
                        self.set_error(e.clone());
                        self.stop(false);
                    }
                }
            }
            State::Running => self.run_jobs(),
            State::Finished => self.done(),
            State::Aborting => {
                if self.ref_count() > 1 {
                    return;
                }
                match self.recovery_policy() {
                    TaskRecoveryPolicy::Auto => self.advance(State::Racquiring),
                    TaskRecoveryPolicy::None => self.advance(State::Failed),
                    TaskRecoveryPolicy::Manual => self.advance(State::Waitrecover),
                }
            }
            State::Racquiring => {
                if self.resource_owner.requests_granted() {
                    self.advance(State::Recovering);
                }
            }
            State::Recovering => self.do_recovery_loop(),
            State::Raborting => {
                if self.ref_count() == 1 {
                    self.advance(State::Failed);
                } else {
                    tracing::warn!(task = %self.id, "state changed to raborting when ref was not 1");
                }
            }
            State::Recovered | State::Failed => self.done(),
            State::Blocked | State::Preparing | State::Waitrecover => {}
            State::Unknown | State::Init => {}
        }
    }

    fn done(&self) {
        self.resource_owner.release_all();
        if self.clean_policy() == TaskCleanPolicy::Auto {
            if let Err(e) = self.clean() {
                tracing::warn!(task = %self.id, error = %e, "auto-clean failed");
            }
        }
    }

    fn ref_count(&self) -> i64 {
        self.refs.lock().count
    }

    // -- job execution ----------------------------------------------------------

    fn run_jobs(self: &Arc<Self>) {
        let mut jobs = {
            let mut inner = self.inner.lock();
            std::mem::take(&mut inner.jobs)
        };

        let outcome = (|| -> Result<(usize, Option<String>), TaskError> {
            if self.aborting() {
                return Err(TaskError::TaskAborted {
                    message: "shutting down".to_string(),
                    code: 100,
                });
            }
            if self.state() != State::Running {
                return Err(TaskError::TaskStateError(format!(
                    "{}: can't run jobs in state {}",
                    self.id,
                    self.state()
                )));
            }
            let mut n = 0;
            let mut result = None;
            for job in jobs.iter_mut() {
                if self.aborting() {
                    return Err(TaskError::TaskAborted {
                        message: "shutting down".to_string(),
                        code: 100,
                    });
                }
                tracing::debug!(task = %self.id, job = %job, "running job");
                result = self.run(|| job.run())?;
                n += 1;
            }
            Ok((n, result))
        })();

        self.inner.lock().jobs = jobs;

        match outcome {
            Ok((n, result)) => {
                self.update_result(0, format!("{n} jobs completed successfuly"), result.unwrap_or_default());
                self.advance(State::Finished);
            }
            Err(TaskError::TaskAborted { message, code }) => {
                self.update_result(code, message, "");
            }
            Err(_) => unreachable!("_run only ever yields TaskAborted"),
        }
    }

    // -- recovery ----------------------------------------------------------------

    fn do_recovery_loop(self: &Arc<Self>) {
        if self.state() != State::Recovering {
            tracing::error!(task = %self.id, state = %self.state(), "_recover called outside recovering state");
            return;
        }
        let registry = self.inner.lock().recovery_registry.clone().unwrap_or_default();
        let outcome: Result<(), TaskError> = (|| {
            loop {
                if self.state() != State::Recovering {
                    break;
                }
                let recovery = match self.pop_recovery() {
                    Some(r) => r,
                    None => break,
                };
                tracing::debug!(task = %self.id, recovery = %recovery, "running recovery");
                self.run(|| recovery.run(self, &registry))?;
            }
            Ok(())
        })();
        if outcome.is_err() && self.state() == State::Recovering {
            if let Err(e) = self.update_state(State::Raborting, false) {
                tracing::debug!(task = %self.id, error = %e, "recover: transition to raborting rejected (race)");
            }
        }
        self.recover_done();
    }

    /// `_recoverDone`: finalize `recovering -> recovered` / `raborting ->
    /// failed`, retrying if a racing transition rejects us.
    fn recover_done(self: &Arc<Self>) {
        loop {
            let target = match self.state() {
                State::Recovering => State::Recovered,
                State::Raborting => State::Failed,
                _ => return,
            };
            match self.update_state(target, false) {
                Ok(()) => return,
                Err(TaskError::TaskStateTransitionError { .. }) => continue,
                Err(e) => {
                    tracing::error!(task = %self.id, error = %e, "recover_done: unexpected error");
                    return;
                }
            }
        }
    }

    // -- refcounting -------------------------------------------------------------

    fn incref(&self, force: bool) -> Result<i64, TaskError> {
        let mut refs = self.refs.lock();
        if refs.aborting && (refs.force_abort || !force) {
            return Err(TaskError::TaskAborted {
                message: self.id.to_string(),
                code: 100,
            });
        }
        refs.count += 1;
        Ok(refs.count)
    }

    fn decref(self: &Arc<Self>, force: bool) -> i64 {
        let (count, aborting) = {
            let mut refs = self.refs.lock();
            refs.count -= 1;
            (refs.count, refs.aborting)
        };
        tracing::debug!(task = %self.id, ref = count, aborting, "decref");
        if count == 0 && aborting {
            self.do_abort(force);
        }
        // Without this, a raborting task that drops
        // to ref == 0 without a further state event would be stuck forever.
        if count == 0 && self.state() == State::Raborting {
            self.advance(State::Failed);
        }
        count
    }

    fn do_abort(self: &Arc<Self>, force: bool) {
        {
            let mut refs = self.refs.lock();
            if refs.count != 0 {
                return;
            }
            refs.count += 1;
        }
        let result: Result<(), TaskError> = (|| {
            let state = self.state();
            if !state.can_abort() && (force && !state.can_abort_recovery()) {
                tracing::warn!(task = %self.id, %state, "do_abort: ignoring, state doesn't support abort");
                return Ok(());
            }
            self.resource_owner.cancel_all();
            if state.can_abort() {
                self.update_state(State::Aborting, false)
            } else {
                self.update_state(State::Raborting, false)
            }
        })();
        if result.is_err() {
            let _ = self.update_state(State::Failed, true);
        }
        {
            let mut refs = self.refs.lock();
            refs.count -= 1;
        }
        if !self.is_done() {
            tracing::warn!(task = %self.id, "task exited in non-terminal state; forcing failed");
            let _ = self.update_state(State::Failed, true);
        }
    }

    /// `_doRecover`: force-enter `racquiring`, guarded by `ref == 0`.
    fn do_recover(self: &Arc<Self>) -> Result<(), TaskError> {
        {
            let mut refs = self.refs.lock();
            if refs.count != 0 {
                return Err(TaskError::TaskHasRefs(self.id.to_string()));
            }
            refs.count += 1;
        }
        let result = self.update_state(State::Racquiring, true);
        {
            let mut refs = self.refs.lock();
            refs.count -= 1;
        }
        result
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Test-only fakes shared across this crate's and downstream crates' tests
/// (gated behind the `test-support` feature for downstream use).
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// A [`ResourceOwner`] that grants every request immediately.
    #[derive(Default)]
    pub struct FakeResourceOwner {
        granted: AtomicBool,
        cancelled: AtomicBool,
        released: AtomicBool,
    }

    impl FakeResourceOwner {
        pub fn new(granted: bool) -> Arc<Self> {
            Arc::new(Self {
                granted: AtomicBool::new(granted),
                cancelled: AtomicBool::new(false),
                released: AtomicBool::new(false),
            })
        }

        pub fn grant(&self) {
            self.granted.store(true, Ordering::SeqCst);
        }

        pub fn was_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }

        pub fn was_released(&self) -> bool {
            self.released.load(Ordering::SeqCst)
        }
    }

    impl ResourceOwner for FakeResourceOwner {
        fn acquire(&self, _namespace: &str, _name: &str, _lock_type: LockType, _timeout: Duration) -> Result<(), TaskError> {
            Ok(())
        }

        fn cancel_all(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }

        fn release_all(&self) {
            self.released.store(true, Ordering::SeqCst);
        }

        fn requests_granted(&self) -> bool {
            self.granted.load(Ordering::SeqCst)
        }
    }

    pub fn fake_resource_owner() -> Arc<dyn ResourceOwner> {
        FakeResourceOwner::new(true)
    }

    /// A [`TaskScheduler`] that runs `commit`+its queued task inline on the
    /// calling thread -- good enough for single-threaded unit tests.
    pub struct InlineScheduler;

    impl TaskScheduler for InlineScheduler {
        fn queue(&self, task: Arc<Task>) -> Result<(), TaskError> {
            task.commit();
            Ok(())
        }
    }

    /// A [`TaskPersistence`] that records snapshots in memory.
    #[derive(Default)]
    pub struct FakePersistence {
        pub saved: Mutex<Vec<TaskSnapshot>>,
    }

    impl FakePersistence {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }
    }

    impl TaskPersistence for FakePersistence {
        fn create_task_dir(&self, _id: &TaskId) -> Result<(), TaskError> {
            Ok(())
        }

        fn save(&self, snapshot: TaskSnapshot) -> Result<(), TaskError> {
            self.saved.lock().push(snapshot);
            Ok(())
        }

        fn clean(&self, _id: &TaskId) -> Result<(), TaskError> {
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
