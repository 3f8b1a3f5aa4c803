// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use taskd_core::task::Task;
use taskd_core::{TaskPriority, TaskRecoveryPolicy};

use super::*;

/// A resource's `Owner` needs a real `Task` to upgrade its `Weak<Task>`
/// against when dispatching callbacks, but these tests exercise the lock
/// table itself -- not the state machine -- so a freshly constructed,
/// never-`prepare`d task (state `init`) is enough backing.
fn spawn_task(id: &str, owner: Arc<Owner>) -> Arc<Task> {
    let task = Task::new(id, "create-volume", "admin", TaskRecoveryPolicy::None, TaskPriority::Medium, owner.clone())
        .expect("valid task constructor args");
    owner.bind(&task);
    task
}

#[test]
fn exclusive_lock_is_granted_immediately_when_free() {
    let manager = ResourceManager::new();
    let owner = manager.new_owner();
    let _task = spawn_task("t1", owner.clone());

    owner.acquire("storage", "vg0", LockType::Exclusive, Duration::from_secs(1)).unwrap();
    assert!(owner.requests_granted());
}

#[test]
fn second_exclusive_request_on_the_same_resource_is_queued() {
    let manager = ResourceManager::new();
    let first_owner = manager.new_owner();
    let _first_task = spawn_task("t1", first_owner.clone());
    first_owner.acquire("storage", "vg0", LockType::Exclusive, Duration::from_secs(5)).unwrap();

    let second_owner = manager.new_owner();
    let _second_task = spawn_task("t2", second_owner.clone());
    second_owner
        .acquire("storage", "vg0", LockType::Exclusive, Duration::from_secs(5))
        .unwrap();

    assert!(!second_owner.requests_granted());
}

#[test]
fn release_grants_the_next_compatible_waiter() {
    let manager = ResourceManager::new();
    let first_owner = manager.new_owner();
    let _first_task = spawn_task("t1", first_owner.clone());
    first_owner.acquire("storage", "vg0", LockType::Exclusive, Duration::from_secs(5)).unwrap();

    let second_owner = manager.new_owner();
    let _second_task = spawn_task("t2", second_owner.clone());
    second_owner
        .acquire("storage", "vg0", LockType::Exclusive, Duration::from_secs(5))
        .unwrap();
    assert!(!second_owner.requests_granted());

    first_owner.release_all();

    assert!(second_owner.requests_granted());
}

#[test]
fn two_shared_locks_are_both_granted_immediately() {
    let manager = ResourceManager::new();
    let owner_a = manager.new_owner();
    let _task_a = spawn_task("t1", owner_a.clone());
    owner_a.acquire("storage", "vg0", LockType::Shared, Duration::from_secs(1)).unwrap();

    let owner_b = manager.new_owner();
    let _task_b = spawn_task("t2", owner_b.clone());
    owner_b.acquire("storage", "vg0", LockType::Shared, Duration::from_secs(1)).unwrap();

    assert!(owner_a.requests_granted());
    assert!(owner_b.requests_granted());
}

#[test]
fn shared_request_is_queued_behind_an_exclusive_holder() {
    let manager = ResourceManager::new();
    let exclusive_owner = manager.new_owner();
    let _exclusive_task = spawn_task("t1", exclusive_owner.clone());
    exclusive_owner
        .acquire("storage", "vg0", LockType::Exclusive, Duration::from_secs(5))
        .unwrap();

    let shared_owner = manager.new_owner();
    let _shared_task = spawn_task("t2", shared_owner.clone());
    shared_owner.acquire("storage", "vg0", LockType::Shared, Duration::from_secs(5)).unwrap();

    assert!(!shared_owner.requests_granted());
}

#[test]
fn cancel_all_drops_the_pending_registration_so_it_is_never_granted() {
    let manager = ResourceManager::new();
    let first_owner = manager.new_owner();
    let _first_task = spawn_task("t1", first_owner.clone());
    first_owner.acquire("storage", "vg0", LockType::Exclusive, Duration::from_secs(5)).unwrap();

    let second_owner = manager.new_owner();
    let _second_task = spawn_task("t2", second_owner.clone());
    second_owner
        .acquire("storage", "vg0", LockType::Exclusive, Duration::from_secs(5))
        .unwrap();

    second_owner.cancel_all();
    first_owner.release_all();

    assert!(!second_owner.requests_granted());
}

#[test]
fn expired_waiter_is_reaped_so_a_later_release_skips_it() {
    let manager = ResourceManager::new();
    let first_owner = manager.new_owner();
    let _first_task = spawn_task("t1", first_owner.clone());
    first_owner.acquire("storage", "vg0", LockType::Exclusive, Duration::from_secs(5)).unwrap();

    let timing_out_owner = manager.new_owner();
    let _timing_out_task = spawn_task("t2", timing_out_owner.clone());
    timing_out_owner
        .acquire("storage", "vg0", LockType::Exclusive, Duration::from_millis(10))
        .unwrap();

    std::thread::sleep(REAP_INTERVAL + Duration::from_millis(200));

    let third_owner = manager.new_owner();
    let _third_task = spawn_task("t3", third_owner.clone());
    third_owner
        .acquire("storage", "vg0", LockType::Exclusive, Duration::from_secs(5))
        .unwrap();
    assert!(!third_owner.requests_granted());

    first_owner.release_all();

    assert!(!timing_out_owner.requests_granted());
    assert!(third_owner.requests_granted());
}
