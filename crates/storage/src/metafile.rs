// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key=value line codec: `"<name> = <value>"`, one field per
//! line. Lines without `=` are skipped. A line with more than two
//! `=`-separated parts, or an unknown field name, is logged and skipped --
//! this keeps forward-compatibility across metadata versions: an older
//! reader simply ignores fields it doesn't know about.
//!
//! Neither field names nor values may themselves contain `=`; callers are
//! responsible for picking field names that satisfy this (trivial, since
//! they're compile-time constants) and for rejecting values that don't (see
//! `taskd_core::Task::set_tag`, which validates this before a tag ever
//! reaches this codec).

use std::str::FromStr;

use taskd_core::KEY_SEPARATOR;

use crate::error::StorageError;

/// An ordered set of `name = value` fields, as read from or about to be
/// written to a single metafile.
#[derive(Debug, Default, Clone)]
pub struct MetaFile {
    fields: Vec<(String, String)>,
}

impl MetaFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`'s rendered form. Overwrites a prior `set` for
    /// the same key rather than appending a duplicate line.
    pub fn set(&mut self, key: &str, value: impl std::fmt::Display) {
        let rendered = value.to_string();
        if let Some(existing) = self.fields.iter_mut().find(|(k, _)| k == key) {
            existing.1 = rendered;
        } else {
            self.fields.push((key.to_string(), rendered));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Fetch and parse a required field via `T::from_str`.
    pub fn get_required<T: FromStr>(&self, key: &'static str) -> Result<T, StorageError>
    where
        T::Err: std::fmt::Display,
    {
        let raw = self.get(key).ok_or(StorageError::MissingField(key))?;
        raw.trim().parse().map_err(|e: T::Err| StorageError::InvalidField {
            field: key,
            value: raw.to_string(),
            reason: e.to_string(),
        })
    }

    /// Parse `"name = value"` lines into a [`MetaFile`]. Lines with no `=`,
    /// or with more than two `=`-delimited parts, are skipped (logged at
    /// warn). Whitespace around both name and value is trimmed.
    pub fn parse(lines: &[String]) -> Self {
        let mut fields = Vec::with_capacity(lines.len());
        for line in lines {
            let parts: Vec<&str> = line.splitn(3, KEY_SEPARATOR).collect();
            match parts.as_slice() {
                [name, value] => fields.push((name.trim().to_string(), value.trim().to_string())),
                [_single] => {
                    // No '=' at all: skip silently, matches blank/comment lines.
                }
                _ => {
                    tracing::warn!(line = %line, "metafile line has more than one '='; skipping");
                }
            }
        }
        Self { fields }
    }

    /// Render to `"name = value"` lines, in insertion order.
    pub fn to_lines(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(k, v)| format!("{k} {KEY_SEPARATOR} {v}"))
            .collect()
    }
}

#[cfg(test)]
#[path = "metafile_tests.rs"]
mod tests;
