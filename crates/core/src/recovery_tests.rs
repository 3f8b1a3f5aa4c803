// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::*;
use crate::policy::TaskPriority;
use crate::task::test_support::fake_resource_owner;

fn make_task(id: &str) -> Arc<Task> {
    Task::new(id, "", "", crate::policy::TaskRecoveryPolicy::None, TaskPriority::Low, fake_resource_owner()).unwrap()
}

#[test]
fn rejects_non_alphanumeric_names() {
    let err = Recovery::new("r1", "mod-ule", "Obj", "fn", vec![]).unwrap_err();
    assert!(matches!(err, TaskError::InvalidRecovery(_)));
}

#[test]
fn underscore_is_allowed_in_names() {
    Recovery::new("r_1", "my_mod", "My_Obj", "do_it", vec![]).unwrap();
}

#[test]
fn unbound_recovery_refuses_to_run() {
    let task = make_task("t1");
    let rec = Recovery::new("r1", "m", "C", "f", vec![]).unwrap();
    let registry = RecoveryRegistry::new();
    let err = rec.run(&task, &registry).unwrap_err();
    assert!(matches!(err, TaskError::InvalidRecovery(_)));
}

#[test]
fn run_dispatches_through_registry_with_params() {
    let task = make_task("t1");
    let mut rec = Recovery::new("r1", "m", "C", "f", vec!["a".into(), "b".into()]).unwrap();
    rec.bind();
    let mut registry = RecoveryRegistry::new();
    registry.register(
        "m",
        "C",
        "f",
        Arc::new(|_task, params| Ok(Some(params.join("-")))),
    );
    assert_eq!(rec.run(&task, &registry).unwrap(), Some("a-b".to_string()));
}

#[test]
fn run_fails_when_nothing_registered() {
    let task = make_task("t1");
    let mut rec = Recovery::new("r1", "m", "C", "missing", vec![]).unwrap();
    rec.bind();
    let registry = RecoveryRegistry::new();
    let err = rec.run(&task, &registry).unwrap_err();
    assert!(matches!(err, TaskError::InvalidRecovery(_)));
}

#[test]
fn callback_runs_before_dispatch() {
    let task = make_task("t1");
    let called = Arc::new(AtomicBool::new(false));
    let called2 = called.clone();
    let mut rec = Recovery::new("r1", "m", "C", "f", vec![]).unwrap();
    rec.set_callback(move |_| called2.store(true, Ordering::SeqCst));
    rec.bind();
    let mut registry = RecoveryRegistry::new();
    registry.register(
        "m",
        "C",
        "f",
        Arc::new({
            let called = called.clone();
            move |_, _| {
                assert!(called.load(Ordering::SeqCst), "callback must run before dispatch");
                Ok(None)
            }
        }),
    );
    rec.run(&task, &registry).unwrap();
}

#[test]
fn record_round_trips_through_into_recovery() {
    let rec = Recovery::new("r1", "m", "C", "f", vec!["x".into()]).unwrap();
    let record = rec.record();
    assert_eq!(record.name, "r1");
    let rebuilt = record.into_recovery().unwrap();
    assert_eq!(rebuilt.name(), "r1");
}
