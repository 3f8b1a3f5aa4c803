// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A namespaced shared/exclusive lock manager, and the per-task [`Owner`]
//! handle that adapts it to `taskd_core::task::ResourceOwner`.
//!
//! Resource grants use the same getProxy/weakref discipline as jobs and
//! recoveries: a task's `Owner` never outlives the task it backs, but the
//! manager's wait queues must be able to reference a pending owner without
//! keeping it (or its task) alive past the task's own lifetime. We follow
//! the same rule here: [`Owner`] holds a `Weak<Task>`, and the manager's wait queue holds
//! a `Weak<Owner>`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use taskd_core::task::{ResourceOwner, Task};
use taskd_core::{LockType, TaskError};

type OwnerId = u64;

/// How often the background reaper thread scans for expired waiters.
const REAP_INTERVAL: Duration = Duration::from_millis(100);

fn lock_key(namespace: &str, name: &str) -> String {
    format!("{namespace}{}{name}", taskd_core::task_resource::RESOURCE_SEPARATOR)
}

struct Waiter {
    owner: Weak<Owner>,
    namespace: String,
    name: String,
    lock_type: LockType,
    deadline: Instant,
}

#[derive(Default)]
struct LockState {
    holders: Vec<(OwnerId, LockType)>,
    waiters: VecDeque<Waiter>,
}

impl LockState {
    fn compatible(&self, lock_type: LockType) -> bool {
        match lock_type {
            LockType::Exclusive => self.holders.is_empty(),
            LockType::Shared => self.holders.iter().all(|(_, lt)| *lt == LockType::Shared),
        }
    }
}

struct Shared {
    locks: Mutex<HashMap<String, LockState>>,
}

/// Namespaced shared/exclusive lock table shared by every task an engine
/// manages. One [`ResourceManager`] per process; each task gets its own
/// [`Owner`] handle onto it via [`ResourceManager::new_owner`].
pub struct ResourceManager {
    shared: Arc<Shared>,
    next_id: AtomicU64,
    reap_shutdown: Arc<AtomicBool>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl ResourceManager {
    pub fn new() -> Arc<Self> {
        let shared = Arc::new(Shared {
            locks: Mutex::new(HashMap::new()),
        });
        let reap_shutdown = Arc::new(AtomicBool::new(false));

        let reaper_shared = shared.clone();
        let reaper_shutdown = reap_shutdown.clone();
        let reaper = std::thread::Builder::new()
            .name("resource-reaper".to_string())
            .spawn(move || Self::reap_loop(reaper_shared, reaper_shutdown))
            .ok();

        Arc::new(Self {
            shared,
            next_id: AtomicU64::new(1),
            reap_shutdown,
            reaper: Mutex::new(reaper),
        })
    }

    fn reap_loop(shared: Arc<Shared>, shutdown: Arc<AtomicBool>) {
        while !shutdown.load(Ordering::SeqCst) {
            std::thread::sleep(REAP_INTERVAL);
            Self::reap_expired(&shared);
        }
    }

    fn reap_expired(shared: &Arc<Shared>) {
        let now = Instant::now();
        let mut expired: Vec<Weak<Owner>> = Vec::new();
        {
            let mut locks = shared.locks.lock();
            for state in locks.values_mut() {
                let mut remaining = VecDeque::with_capacity(state.waiters.len());
                while let Some(w) = state.waiters.pop_front() {
                    if w.deadline <= now {
                        expired.push(w.owner);
                    } else {
                        remaining.push_back(w);
                    }
                }
                state.waiters = remaining;
            }
        }
        for owner in expired.into_iter().filter_map(|w| w.upgrade()) {
            if let Some(task) = owner.task.upgrade() {
                tracing::warn!(task = %task.id(), "resource acquisition timed out, aborting task");
                task.stop(false);
            }
        }
    }

    /// Build a fresh [`Owner`] for one task. Call once per `Task`, before
    /// `Task::new`/`Task::from_snapshot` (the `Owner` is handed in as the
    /// `Arc<dyn ResourceOwner>`), then call [`Owner::bind`] once the `Arc<Task>`
    /// exists.
    pub fn new_owner(self: &Arc<Self>) -> Arc<Owner> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let owner = Arc::new(Owner {
            id,
            task: Mutex::new(Weak::new()),
            self_weak: Mutex::new(Weak::new()),
            manager: self.clone(),
            requests: Mutex::new(HashMap::new()),
        });
        *owner.self_weak.lock() = Arc::downgrade(&owner);
        owner
    }

    fn register(&self, owner_id: OwnerId, owner_weak: Weak<Owner>, namespace: &str, name: &str, lock_type: LockType, timeout: Duration) -> bool {
        let key = lock_key(namespace, name);
        let mut locks = self.shared.locks.lock();
        let state = locks.entry(key).or_default();
        if state.compatible(lock_type) {
            state.holders.push((owner_id, lock_type));
            true
        } else {
            state.waiters.push_back(Waiter {
                owner: owner_weak,
                namespace: namespace.to_string(),
                name: name.to_string(),
                lock_type,
                deadline: Instant::now() + timeout,
            });
            false
        }
    }

    fn cancel(&self, owner_id: OwnerId, namespace: &str, name: &str) {
        let key = lock_key(namespace, name);
        let mut locks = self.shared.locks.lock();
        if let Some(state) = locks.get_mut(&key) {
            state.holders.retain(|(id, _)| *id != owner_id);
            state.waiters.retain(|w| w.owner.upgrade().map(|o| o.id) != Some(owner_id));
        }
    }

    fn release(&self, owner_id: OwnerId, namespace: &str, name: &str) {
        let key = lock_key(namespace, name);
        let mut granted = Vec::new();
        {
            let mut locks = self.shared.locks.lock();
            if let Some(state) = locks.get_mut(&key) {
                state.holders.retain(|(id, _)| *id != owner_id);
                while let Some(front) = state.waiters.front() {
                    if state.compatible(front.lock_type) {
                        let w = state.waiters.pop_front().expect("front just matched Some");
                        state.holders.push((w.owner.upgrade().map(|o| o.id).unwrap_or(0), w.lock_type));
                        granted.push(w);
                    } else {
                        break;
                    }
                }
            }
        }
        for w in granted {
            let Some(owner) = w.owner.upgrade() else { continue };
            owner.mark_granted(&w.namespace, &w.name);
            if let Some(task) = owner.task.lock().upgrade() {
                if let Err(e) = task.resource_acquired(&w.namespace, &w.name, w.lock_type) {
                    tracing::warn!(task = %task.id(), error = %e, "resource_acquired callback failed");
                }
            }
        }
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.reap_shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reaper.lock().take() {
            let _ = handle.join();
        }
    }
}

/// A task's handle into the [`ResourceManager`] -- `taskd_core`'s
/// `ResourceOwner` trait object. Constructed via
/// [`ResourceManager::new_owner`] before the owning `Task` exists, then
/// [`bind`](Owner::bind)-ed to it immediately after.
pub struct Owner {
    id: OwnerId,
    task: Mutex<Weak<Task>>,
    self_weak: Mutex<Weak<Owner>>,
    manager: Arc<ResourceManager>,
    requests: Mutex<HashMap<String, bool>>,
}

impl Owner {
    /// Attach the owning task, once constructed. `Task::new`/`from_snapshot`
    /// require a fully-formed `Arc<dyn ResourceOwner>` up front, so this is
    /// unavoidably a two-step construction.
    pub fn bind(&self, task: &Arc<Task>) {
        *self.task.lock() = Arc::downgrade(task);
    }

    fn mark_granted(&self, namespace: &str, name: &str) {
        if let Some(v) = self.requests.lock().get_mut(&lock_key(namespace, name)) {
            *v = true;
        }
    }
}

impl ResourceOwner for Owner {
    fn acquire(&self, namespace: &str, name: &str, lock_type: LockType, timeout: Duration) -> Result<(), TaskError> {
        let key = lock_key(namespace, name);
        let owner_weak = self.self_weak.lock().clone();
        let granted = self.manager.register(self.id, owner_weak, namespace, name, lock_type, timeout);
        self.requests.lock().insert(key, granted);
        if !granted {
            if let Some(task) = self.task.lock().upgrade() {
                task.resource_registered(namespace, name, lock_type)?;
            }
        }
        Ok(())
    }

    fn cancel_all(&self) {
        let keys: Vec<String> = self.requests.lock().keys().cloned().collect();
        for key in keys {
            if let Some((namespace, name)) = key.split_once(taskd_core::task_resource::RESOURCE_SEPARATOR) {
                self.manager.cancel(self.id, namespace, name);
            }
        }
        self.requests.lock().clear();
    }

    fn release_all(&self) {
        let keys: Vec<String> = self.requests.lock().keys().cloned().collect();
        for key in keys {
            if let Some((namespace, name)) = key.split_once(taskd_core::task_resource::RESOURCE_SEPARATOR) {
                self.manager.release(self.id, namespace, name);
            }
        }
        self.requests.lock().clear();
    }

    fn requests_granted(&self) -> bool {
        self.requests.lock().values().all(|granted| *granted)
    }
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
