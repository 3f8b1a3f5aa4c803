// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! taskctl - thin administrative CLI over `taskd-daemon`'s in-process API.
//!
//! Each invocation opens the task store at `state_dir()`, performs one
//! operation, and exits -- there is no RPC surface, so
//! `taskctl` never talks to a running `taskd` process. A task submitted here
//! that schedules jobs keeps running on its own worker threads until this
//! process exits; `taskd` is what keeps tasks alive across a crash, not
//! `taskctl`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use taskd_core::{TaskId, TaskPriority, TaskRecoveryPolicy};
use taskd_daemon::Daemon;

#[derive(Parser)]
#[command(name = "taskctl", version, about = "Administrative CLI for the task engine")]
struct Cli {
    /// Task store root (defaults to TASKD_STATE_DIR / XDG_STATE_HOME / ~/.local/state/taskd)
    #[arg(long, global = true, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new, job-less administrative task and wait for it to finish
    Submit {
        /// Human-readable task name (e.g. "create-volume")
        name: String,
        /// Owning tag (e.g. a user or namespace)
        #[arg(long, default_value = "admin")]
        tag: String,
        /// Priority: low, medium, or high
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Recovery policy: none, manual, or auto
        #[arg(long = "recovery", default_value = "none")]
        recovery_policy: String,
    },
    /// Print a task's persisted status
    Status {
        id: String,
    },
    /// Roll back a finished task's recovery stack
    Rollback {
        id: String,
    },
    /// Remove a done task's on-disk directory
    Clean {
        id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let state_dir = cli.state_dir.unwrap_or_else(taskd_engine::config::state_dir);
    let daemon = Daemon::new(state_dir);
    println!("{}", run_command(&daemon, cli.command)?);
    Ok(())
}

/// Executes one subcommand against `daemon` and returns the line(s) that
/// would be printed to stdout. Split out from `main` so command logic can be
/// exercised directly against a temporary store, without going through
/// process spawning.
fn run_command(daemon: &std::sync::Arc<Daemon>, command: Commands) -> Result<String> {
    match command {
        Commands::Submit {
            name,
            tag,
            priority,
            recovery_policy,
        } => {
            let priority: TaskPriority = priority.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            let recovery_policy: TaskRecoveryPolicy = recovery_policy.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            let task = daemon
                .submit(name, tag, recovery_policy, priority, Some(|| Ok(None)))
                .context("submit failed")?;
            let status = task.get_status();
            Ok(format!("{} {} {}", status.task.id, status.task.state, status.result))
        }
        Commands::Status { id } => {
            let snapshot = daemon.store().load(&TaskId::new(id)).context("load failed")?;
            let mut out = format!("{} {}", snapshot.id, snapshot.state);
            if let Some(result) = snapshot.result {
                out.push('\n');
                out.push_str(&result.to_string());
            }
            Ok(out)
        }
        Commands::Rollback { id } => {
            let task = daemon.load_task(&TaskId::new(id)).context("load failed")?;
            task.rollback().context("rollback failed")?;
            Ok(format!("{} {}", task.id(), task.state()))
        }
        Commands::Clean { id } => {
            let task = daemon.load_task(&TaskId::new(id)).context("load failed")?;
            if !task.state().is_done() {
                bail!("task {} is not done (state {})", task.id(), task.state());
            }
            task.clean().context("clean failed")?;
            Ok(format!("{} cleaned", task.id()))
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
