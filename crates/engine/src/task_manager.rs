// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`TaskManager`]: the external worker pool `taskd_core::task::TaskScheduler`
//! dispatches queued tasks onto.
//!
//! The concurrency model here is explicit OS threads racing on a task's
//! structural lock, not an event loop, so this is a small fixed pool of
//! `std::thread` workers pulling off a shared queue -- no async runtime
//! involved. `queue(task)` only ever needs to get `task.commit()` running on
//! some thread; the state machine (`dispatch_entry_action` / `run_jobs`)
//! drives everything from there.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use taskd_core::task::{Task, TaskScheduler};
use taskd_core::TaskError;

use crate::error::ResourceError;

pub struct TaskManager {
    sender: Mutex<Option<mpsc::Sender<Arc<Task>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskManager {
    /// Spawn `worker_count` OS threads (at least one), each looping on
    /// `recv` and running `task.commit()` for whatever it's handed.
    pub fn new(worker_count: usize) -> Arc<Self> {
        let (tx, rx) = mpsc::channel::<Arc<Task>>();
        let rx = Arc::new(Mutex::new(rx));
        let mut workers = Vec::with_capacity(worker_count.max(1));
        for idx in 0..worker_count.max(1) {
            let rx = rx.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("taskd-worker-{idx}"))
                .spawn(move || Self::worker_loop(&rx));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::error!(worker = idx, error = %e, "failed to spawn worker thread"),
            }
        }
        Arc::new(Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        })
    }

    fn worker_loop(rx: &Arc<Mutex<mpsc::Receiver<Arc<Task>>>>) {
        loop {
            let received = rx.lock().recv();
            match received {
                Ok(task) => task.commit(),
                Err(_) => return,
            }
        }
    }
}

impl TaskScheduler for TaskManager {
    fn queue(&self, task: Arc<Task>) -> Result<(), TaskError> {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(tx) => tx.send(task).map_err(|_| TaskError::from(ResourceError::QueueClosed)),
            None => Err(TaskError::from(ResourceError::QueueClosed)),
        }
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.sender.lock().take();
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
#[path = "task_manager_tests.rs"]
mod tests;
