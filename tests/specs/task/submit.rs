//! End-to-end lifecycle of a job-less administrative task, driven entirely
//! through `taskctl`: submit, inspect, and clean up the happy path where a
//! task has no jobs and finishes synchronously.

use crate::prelude::*;

#[test]
fn submit_finishes_synchronously_and_reports_ok() {
    let store = temp_store();

    cli()
        .state_dir(store.path())
        .args(&["submit", "create-volume", "--tag", "admin", "--priority", "high"])
        .passes()
        .stdout_has("finished");
}

#[test]
fn status_reflects_the_persisted_finished_task() {
    let store = temp_store();

    let submitted = cli()
        .state_dir(store.path())
        .args(&["submit", "create-volume"])
        .passes();
    let id = submitted.first_word();

    cli()
        .state_dir(store.path())
        .args(&["status", &id])
        .passes()
        .stdout_has("finished");
}

#[test]
fn clean_removes_a_finished_tasks_directory() {
    let store = temp_store();

    let submitted = cli()
        .state_dir(store.path())
        .args(&["submit", "create-volume"])
        .passes();
    let id = submitted.first_word();

    cli()
        .state_dir(store.path())
        .args(&["clean", &id])
        .passes()
        .stdout_has("cleaned");

    // The task directory is gone, so a follow-up status lookup fails.
    cli().state_dir(store.path()).args(&["status", &id]).fails();
}

#[test]
fn each_submission_gets_a_distinct_id() {
    let store = temp_store();

    let first = cli().state_dir(store.path()).args(&["submit", "create-volume"]).passes().first_word();
    let second = cli().state_dir(store.path()).args(&["submit", "create-volume"]).passes().first_word();

    assert_ne!(first, second, "two submissions should not collide on the same task id");
}
