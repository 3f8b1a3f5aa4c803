// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn into_aborted_is_idempotent_on_task_aborted() {
    let err = TaskError::TaskAborted {
        message: "boom".to_string(),
        code: 7,
    };
    let aborted = err.clone().into_aborted();
    assert!(matches!(aborted, TaskError::TaskAborted { message, code } if message == "boom" && code == 7));
}

#[test]
fn into_aborted_carries_the_raw_storage_exception_message_without_a_prefix() {
    let err = TaskError::StorageException {
        code: 7,
        message: "boom".to_string(),
    };
    let aborted = err.into_aborted();
    match aborted {
        TaskError::TaskAborted { message, code } => {
            assert_eq!(message, "boom");
            assert_eq!(code, 7);
        }
        other => panic!("expected TaskAborted, got {other:?}"),
    }
}

#[test]
fn into_aborted_falls_back_to_display_for_other_variants() {
    let err = TaskError::UnmanagedTask("t1".to_string());
    let aborted = err.into_aborted();
    match aborted {
        TaskError::TaskAborted { message, code } => {
            assert_eq!(message, "task t1 is not managed by a TaskManager");
            assert_eq!(code, 100);
        }
        other => panic!("expected TaskAborted, got {other:?}"),
    }
}
