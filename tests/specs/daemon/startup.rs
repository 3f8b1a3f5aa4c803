//! `taskd`'s crash-resume scan at process startup.

use crate::prelude::*;

#[test]
fn taskd_exits_cleanly_against_an_empty_store() {
    let store = temp_store();

    let output = taskd_cmd()
        .env("TASKD_STATE_DIR", store.path())
        .output()
        .expect("taskd should run");

    assert!(
        output.status.success(),
        "expected taskd to exit 0 against an empty store, got {:?}\nstderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn taskd_resumes_a_task_left_mid_prepare_by_a_crash() {
    let store = temp_store();

    // Hand-write a task directory in `preparing` -- the state a task sits in
    // if the process died between `prepare()` starting and its first
    // persisted transition. `taskd`'s startup scan must pick this up and
    // drive it to a terminal state.
    let id = "stale-task";
    let dir = store.path().join(id);
    std::fs::create_dir_all(&dir).expect("create task dir");
    std::fs::write(
        dir.join(format!("{id}.task")),
        format!(
            "id = {id}\nname = create-volume\ntag = admin\npriority = medium\n\
             persistPolicy = auto\ncleanPolicy = manual\nrecoveryPolicy = none\n\
             state = preparing\nnjobs = 0\nnrecoveries = 0\nmetadataVersion = 1\n"
        ),
    )
    .expect("write task metafile");

    let output = taskd_cmd()
        .env("TASKD_STATE_DIR", store.path())
        .output()
        .expect("taskd should run");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let task_file = std::fs::read_to_string(dir.join(format!("{id}.task"))).expect("task metafile should survive");
    assert!(
        task_file.contains("state = failed") || task_file.contains("state = finished") || task_file.contains("state = recovered"),
        "expected a terminal state to be persisted, got:\n{task_file}"
    );
}
