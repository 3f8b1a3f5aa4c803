//! Test helpers for the black-box `taskctl`/`taskd` specifications.
//!
//! Every spec here drives the real compiled binaries end to end: no
//! in-process `Daemon` construction, no mocked `FsHelper`. Those lower-level
//! behaviors are covered by each crate's own `#[cfg(test)]` modules; this
//! suite only asserts on what a user of the binaries would actually see.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::Output;

use assert_cmd::Command as AssertCommand;

/// A fresh, empty task store directory, torn down when dropped.
pub fn temp_store() -> tempfile::TempDir {
    tempfile::tempdir().expect("create temp state dir")
}

fn taskctl_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("taskctl").expect("taskctl binary should be built by the workspace")
}

pub fn taskd_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("taskd").expect("taskd binary should be built by the workspace")
}

/// Create a `taskctl` CLI builder for fluent test assertions.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level builder over a single `taskctl` invocation.
pub struct CliBuilder {
    args: Vec<String>,
    state_dir: Option<PathBuf>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            state_dir: None,
        }
    }

    /// Add CLI arguments.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Point `--state-dir` at an existing directory (usually a [`temp_store`]).
    pub fn state_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.state_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn command(self) -> AssertCommand {
        let mut cmd = taskctl_cmd();
        if let Some(dir) = &self.state_dir {
            cmd.arg("--state-dir").arg(dir);
        }
        cmd.args(&self.args);
        cmd
    }

    /// Run and expect success (exit code 0).
    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("taskctl should run");
        assert!(
            output.status.success(),
            "expected taskctl to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code).
    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("taskctl should run");
        assert!(
            !output.status.success(),
            "expected taskctl to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run, for chained assertions on stdout/stderr.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Assert stdout equals `expected` exactly, with a diff on mismatch.
    pub fn stdout_eq(self, expected: &str) -> Self {
        let stdout = self.stdout();
        similar_asserts::assert_eq!(stdout, expected);
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{expected}'\nstdout: {stdout}");
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr does not contain '{expected}'\nstderr: {stderr}");
        self
    }

    /// The first whitespace-separated token of stdout -- every `taskctl`
    /// subcommand prints the task id first, so this extracts it for
    /// chaining into a follow-up invocation.
    pub fn first_word(&self) -> String {
        self.stdout().split_whitespace().next().expect("non-empty stdout").to_string()
    }
}
