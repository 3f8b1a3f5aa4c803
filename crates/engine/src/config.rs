// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration, read from environment variables with the same
//! env-override-then-XDG-then-hardcoded-default layering the daemon uses
//! everywhere else.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_RESOURCE_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_WORKER_COUNT: usize = 4;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// How long a resource acquisition may sit unresolved before the engine
/// aborts the task waiting on it. `TASKD_RESOURCE_TIMEOUT_MS`, default 30s.
pub fn task_resource_default_timeout() -> Duration {
    let ms = env_var("TASKD_RESOURCE_TIMEOUT_MS")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RESOURCE_TIMEOUT_MS);
    Duration::from_millis(ms)
}

/// Root directory for on-disk task state. `TASKD_STATE_DIR`, then
/// `$XDG_STATE_HOME/taskd` (via `dirs::state_dir`), then `~/.local/state/taskd`.
pub fn state_dir() -> PathBuf {
    if let Some(dir) = env_var("TASKD_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(base) = dirs::state_dir() {
        return base.join("taskd");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("state")
        .join("taskd")
}

/// Number of OS threads in the task worker pool. `TASKD_WORKERS`, default 4.
pub fn worker_pool_size() -> usize {
    env_var("TASKD_WORKERS")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_WORKER_COUNT)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
