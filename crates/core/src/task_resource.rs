// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `TaskResource`: a namespaced handle into the external resource-lock manager.

use std::fmt;

use crate::error::TaskError;

/// Separator between a resource's namespace and name in its string key.
pub const RESOURCE_SEPARATOR: char = '!';

/// Shared or exclusive lock on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LockType {
    Shared,
    Exclusive,
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockType::Shared => write!(f, "shared"),
            LockType::Exclusive => write!(f, "exclusive"),
        }
    }
}

impl std::str::FromStr for LockType {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared" => Ok(LockType::Shared),
            "exclusive" => Ok(LockType::Exclusive),
            other => Err(TaskError::InvalidParameter {
                name: "LockType".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// `{namespace, name, lockType}`; the string key is `"<namespace>!<name>"`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TaskResource {
    pub namespace: String,
    pub name: String,
    pub lock_type: LockType,
}

impl TaskResource {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, lock_type: LockType) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            lock_type,
        }
    }

    /// The string key used to discover persisted resource requests
    /// (`*.resource` files), `"<namespace>!<name>"`.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.namespace, RESOURCE_SEPARATOR, self.name)
    }
}

impl fmt::Display for TaskResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} - {}", self.namespace, self.name, self.lock_type)
    }
}

#[cfg(test)]
#[path = "task_resource_tests.rs"]
mod tests;
