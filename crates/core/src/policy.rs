// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task policy enums.
//!
//! These are plain tagged enums: equality and parsing are both exact,
//! unlike a loose instance-vs-type comparison.

use std::fmt;
use std::str::FromStr;

use crate::error::TaskError;

macro_rules! policy_enum {
    ($name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($name::$variant => write!(f, $str)),+
                }
            }
        }

        impl FromStr for $name {
            type Err = TaskError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($str => Ok($name::$variant),)+
                    other => Err(TaskError::InvalidParameter {
                        name: stringify!($name).to_string(),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

policy_enum!(TaskPersistPolicy {
    None => "none",
    Manual => "manual",
    Auto => "auto",
});

policy_enum!(TaskCleanPolicy {
    None => "none",
    Manual => "manual",
    Auto => "auto",
});

policy_enum!(TaskRecoveryPolicy {
    None => "none",
    Manual => "manual",
    Auto => "auto",
});

policy_enum!(TaskPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

impl Default for TaskPersistPolicy {
    fn default() -> Self {
        TaskPersistPolicy::None
    }
}

impl Default for TaskCleanPolicy {
    fn default() -> Self {
        TaskCleanPolicy::Auto
    }
}

impl Default for TaskRecoveryPolicy {
    fn default() -> Self {
        TaskRecoveryPolicy::None
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Low
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
