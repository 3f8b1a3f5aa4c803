// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The result a [`crate::Task`] carries: a code/message pair plus the free-form
//! result string of whichever operation last updated it.

use std::fmt;

/// `{code, message, result}`. Default matches the original's
/// `TaskResult(0, "Task is initializing", "")`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TaskResult {
    pub code: i32,
    pub message: String,
    pub result: String,
}

impl TaskResult {
    pub fn new(code: i32, message: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            result: result.into(),
        }
    }
}

impl Default for TaskResult {
    fn default() -> Self {
        Self::new(0, "Task is initializing", "")
    }
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task result: {} - {}: {}", self.code, self.message, self.result)
    }
}

#[cfg(test)]
#[path = "task_result_tests.rs"]
mod tests;
