// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Crash-safe on-disk persistence for the task engine.
//!
//! [`MetaFile`] is the `"name = value"` line codec; [`TaskStore`] is the
//! persistence orchestrator that implements `taskd_core::task::TaskPersistence`
//! and additionally exposes `load`/`load_resources`/`scan_ids` for the
//! daemon's crash-resume scan. This crate never touches `std::fs` directly --
//! every I/O primitive goes through `taskd_adapters::FsHelper`.

pub mod codec;
pub mod error;
pub mod layout;
pub mod metafile;
pub mod store;

pub use error::StorageError;
pub use metafile::MetaFile;
pub use store::TaskStore;
