// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taskd`: runs the crash-resume scan against the configured task store,
//! then blocks until every task it resumed has reached a terminal state.
//! There is no RPC surface -- `taskctl` talks to the same on-disk store
//! directly, not to this process.

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use taskd_daemon::Daemon;
use taskd_engine::config;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state_dir = config::state_dir();
    tracing::info!(state_dir = %state_dir.display(), "taskd starting");

    let daemon = Daemon::new(state_dir);
    let resumed = match daemon.scan_and_recover() {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "crash-resume scan failed");
            std::process::exit(1);
        }
    };
    tracing::info!(count = resumed.len(), "crash-resume scan complete");

    for id in &resumed {
        loop {
            let Ok(snapshot) = daemon.store().load(id) else { break };
            if snapshot.state.is_done() {
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    tracing::info!("taskd exiting");
}
