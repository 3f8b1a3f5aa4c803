//! Rejections and failure paths surfaced through `taskctl`.

use crate::prelude::*;

#[test]
fn submit_rejects_an_unknown_priority() {
    let store = temp_store();

    cli()
        .state_dir(store.path())
        .args(&["submit", "create-volume", "--priority", "urgent"])
        .fails()
        .stderr_has("urgent");
}

#[test]
fn submit_rejects_an_unknown_recovery_policy() {
    let store = temp_store();

    cli()
        .state_dir(store.path())
        .args(&["submit", "create-volume", "--recovery", "sometimes"])
        .fails()
        .stderr_has("sometimes");
}

#[test]
fn status_on_an_unknown_id_is_an_error() {
    let store = temp_store();

    cli()
        .state_dir(store.path())
        .args(&["status", "no-such-task"])
        .fails()
        .stderr_has("load failed");
}

#[test]
fn rollback_on_a_none_recovery_policy_task_is_a_no_op() {
    let store = temp_store();

    // recoveryPolicy=none (the taskctl default), so rollback must succeed
    // without actually re-entering the state machine -- `none` is the one
    // policy where rollback is defined as a no-op rather than a state error.
    let submitted = cli().state_dir(store.path()).args(&["submit", "create-volume"]).passes();
    let id = submitted.first_word();

    cli()
        .state_dir(store.path())
        .args(&["rollback", &id])
        .passes()
        .stdout_has("finished");
}

#[test]
fn clean_on_an_unknown_id_is_an_error() {
    let store = temp_store();

    cli().state_dir(store.path()).args(&["clean", "no-such-task"]).fails();
}
