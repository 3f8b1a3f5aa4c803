// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn persist_policy_round_trips_through_display_and_from_str() {
    for p in [
        TaskPersistPolicy::None,
        TaskPersistPolicy::Manual,
        TaskPersistPolicy::Auto,
    ] {
        let s = p.to_string();
        let parsed: TaskPersistPolicy = s.parse().unwrap();
        assert_eq!(p, parsed);
    }
}

#[test]
fn priority_round_trips() {
    for p in [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High] {
        let parsed: TaskPriority = p.to_string().parse().unwrap();
        assert_eq!(p, parsed);
    }
}

#[test]
fn unknown_value_is_rejected() {
    let err = "bogus".parse::<TaskRecoveryPolicy>().unwrap_err();
    assert!(matches!(err, TaskError::InvalidParameter { .. }));
}

#[test]
fn defaults_match_original_task_constructor() {
    // vdsm's Task() defaults persistPolicy=none, cleanPolicy=auto, recoveryPolicy=none.
    assert_eq!(TaskPersistPolicy::default(), TaskPersistPolicy::None);
    assert_eq!(TaskCleanPolicy::default(), TaskCleanPolicy::Auto);
    assert_eq!(TaskRecoveryPolicy::default(), TaskRecoveryPolicy::None);
    assert_eq!(TaskPriority::default(), TaskPriority::Low);
}

#[test]
fn equality_is_exact_tag_comparison_not_isinstance() {
    // Regression test for the EnumType.__eq__ bug in the original: equality
    // must not hold across different policy enums or between instances that
    // merely share a type.
    assert_eq!(TaskPersistPolicy::Auto, TaskPersistPolicy::Auto);
    assert_ne!(TaskPersistPolicy::Auto, TaskPersistPolicy::None);
}
