// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Recovery`: a named rollback action pushed onto a task's LIFO recovery
//! stack.
//!
//! The original looked up `storage.<moduleName>.<object>.<function>` with
//! `__import__`/`getattr` at recovery time -- runtime code loading with no
//! audit trail. [`RecoveryRegistry`] replaces that with an explicit
//! registration table: callables register themselves under their
//! `(moduleName, object, function)` string key at startup, and `Recovery::run`
//! only ever looks a key up.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::TaskError;
use crate::param_list::ParamList;
use crate::task::Task;

/// A registered recovery callable. Takes the owning task (read-only access
/// to its id/state/accessors -- recoveries must not re-enter the task's
/// structural locks) plus the string params that were passed to
/// [`Recovery::new`].
pub type RecoveryFn = Arc<dyn Fn(&Task, &[String]) -> Result<Option<String>, TaskError> + Send + Sync>;

/// Hook invoked just before a recovery runs, mirroring `Recovery.setCallback`.
pub type RecoveryCallback = Arc<dyn Fn(&Recovery) + Send + Sync>;

/// Lookup table from `(moduleName, object, function)` to a registered
/// [`RecoveryFn`]. Built once at process startup by whichever crate owns the
/// recovery implementations (`taskd-engine` in this workspace); `Recovery::run`
/// only ever reads it.
#[derive(Default, Clone)]
pub struct RecoveryRegistry {
    entries: HashMap<(String, String, String), RecoveryFn>,
}

impl RecoveryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        module_name: impl Into<String>,
        object: impl Into<String>,
        function: impl Into<String>,
        f: RecoveryFn,
    ) {
        self.entries.insert((module_name.into(), object.into(), function.into()), f);
    }

    pub fn lookup(&self, module_name: &str, object: &str, function: &str) -> Option<RecoveryFn> {
        self.entries
            .get(&(module_name.to_string(), object.to_string(), function.to_string()))
            .cloned()
    }
}

/// Validate a recovery dispatch name: non-empty and, once underscores are
/// stripped, alphanumeric. Matches the original's `validateName`.
fn validate_name(field: &str, name: &str) -> Result<(), TaskError> {
    let stripped: String = name.chars().filter(|&c| c != '_').collect();
    if name.is_empty() || !stripped.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TaskError::InvalidRecovery(format!(
            "{field} '{name}' must be alphanumeric/underscore"
        )));
    }
    Ok(())
}

/// A registered rollback action: `storage.<module_name>.<object>.<function>(task, *params)`.
pub struct Recovery {
    name: String,
    module_name: String,
    object: String,
    function: String,
    params: ParamList,
    callback: Option<RecoveryCallback>,
    bound: bool,
}

impl Recovery {
    pub fn new(
        name: impl Into<String>,
        module_name: impl Into<String>,
        object: impl Into<String>,
        function: impl Into<String>,
        params: Vec<String>,
    ) -> Result<Self, TaskError> {
        let name = name.into();
        let module_name = module_name.into();
        let object = object.into();
        let function = function.into();
        validate_name("name", &name)?;
        validate_name("moduleName", &module_name)?;
        validate_name("object", &object)?;
        validate_name("function", &function)?;
        Ok(Self {
            name,
            module_name,
            object,
            function,
            params: ParamList::new(params)?,
            callback: None,
            bound: false,
        })
    }

    pub fn set_callback(&mut self, callback: impl Fn(&Recovery) + Send + Sync + 'static) {
        self.callback = Some(Arc::new(callback));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn bind(&mut self) {
        self.bound = true;
    }

    /// Persistable view (`<id>.recover.<n>`); `callback` never persists.
    pub fn record(&self) -> RecoveryRecord {
        RecoveryRecord {
            name: self.name.clone(),
            module_name: self.module_name.clone(),
            object: self.object.clone(),
            function: self.function.clone(),
            params: self.params.clone(),
        }
    }

    /// Re-validate the dispatch name, run the callback hook, then dispatch
    /// through `registry`. Re-validating `object`/`function` here mirrors the
    /// original calling `validateName` again inside `run`.
    pub(crate) fn run(&self, task: &Task, registry: &RecoveryRegistry) -> Result<Option<String>, TaskError> {
        if !self.bound {
            return Err(TaskError::InvalidRecovery(format!("{}: no parent task", self.name)));
        }
        validate_name("object", &self.object)?;
        validate_name("function", &self.function)?;
        if let Some(callback) = self.callback.clone() {
            callback(self);
        }
        let f = registry.lookup(&self.module_name, &self.object, &self.function).ok_or_else(|| {
            TaskError::InvalidRecovery(format!(
                "no recovery registered for {}.{}.{}",
                self.module_name, self.object, self.function
            ))
        })?;
        f(task, &self.params.get_list())
    }
}

impl fmt::Debug for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery")
            .field("name", &self.name)
            .field("module_name", &self.module_name)
            .field("object", &self.object)
            .field("function", &self.function)
            .field("bound", &self.bound)
            .finish()
    }
}

impl fmt::Display for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}->{}({})", self.name, self.object, self.function, self.params)
    }
}

/// The persisted fields of a [`Recovery`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecoveryRecord {
    pub name: String,
    pub module_name: String,
    pub object: String,
    pub function: String,
    pub params: ParamList,
}

impl RecoveryRecord {
    /// Materialize a bindable [`Recovery`] for reload/inspection. Reloaded
    /// recoveries carry no callback (never persisted) but do carry a real
    /// dispatch target, so unlike a reloaded [`crate::Job`] they can still run.
    pub fn into_recovery(self) -> Result<Recovery, TaskError> {
        Recovery::new(self.name, self.module_name, self.object, self.function, self.params.get_list())
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
