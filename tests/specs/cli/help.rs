//! `taskctl` help and usage output.

use crate::prelude::*;

#[test]
fn taskctl_no_args_is_an_error() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn taskctl_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn taskctl_submit_help_mentions_priority_and_recovery() {
    cli()
        .args(&["submit", "--help"])
        .passes()
        .stdout_has("priority")
        .stdout_has("recovery");
}

#[test]
fn taskctl_version_shows_a_version() {
    cli().args(&["--version"]).passes().stdout_has("taskctl");
}
