// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed, separator-safe string list used in persisted [`crate::Recovery`] fields.

use std::fmt;

use crate::error::TaskError;

/// Separator used both between `ParamList` elements in memory and when the
/// list is flattened to a single metafile line.
pub const FIELD_SEPARATOR: char = ',';

/// A list of strings, none of which may contain the separator, serialized
/// to and from a single comma-joined line.
///
/// An empty string explicitly yields an empty list rather than a
/// single-element list containing the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ParamList {
    params: Vec<String>,
}

impl ParamList {
    /// Build a `ParamList` from an explicit vector of items, rejecting any
    /// item that contains the separator.
    pub fn new(items: Vec<String>) -> Result<Self, TaskError> {
        for item in &items {
            if item.contains(FIELD_SEPARATOR) {
                return Err(TaskError::InvalidParameter {
                    name: "ParamList item".to_string(),
                    value: item.clone(),
                });
            }
        }
        Ok(Self { params: items })
    }

    /// Parse from a single comma-separated line. An empty string yields an
    /// empty list, not a list containing one empty element.
    pub fn parse(line: &str) -> Self {
        if line.is_empty() {
            return Self { params: Vec::new() };
        }
        Self {
            params: line.split(FIELD_SEPARATOR).map(|s| s.trim().to_string()).collect(),
        }
    }

    /// Returns a copy of the underlying list.
    pub fn get_list(&self) -> Vec<String> {
        self.params.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for ParamList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.params.join(&FIELD_SEPARATOR.to_string()))
    }
}

impl From<Vec<String>> for ParamList {
    /// Infallible conversion for call sites that already know their items
    /// are separator-free (e.g. generated identifiers). Prefer [`ParamList::new`]
    /// when items come from an untrusted source.
    fn from(items: Vec<String>) -> Self {
        Self { params: items }
    }
}

#[cfg(test)]
#[path = "param_list_tests.rs"]
mod tests;
