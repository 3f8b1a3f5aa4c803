// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validated task state-transition table.
//!
//! `State` is a closed set of states plus the directed edges `moveto`
//! allows between them. The edges below are the contract between the
//! engine, the resource-owner callbacks, and the recovery logic -- they
//! must not be changed casually.

use std::fmt;

use crate::error::TaskError;

/// A task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Unknown,
    Init,
    Preparing,
    Blocked,
    Acquiring,
    Queued,
    Running,
    Finished,
    Aborting,
    Waitrecover,
    Recovering,
    Racquiring,
    Raborting,
    Recovered,
    Failed,
}

impl State {
    /// Every legal destination, paired with the states it may be entered from.
    const EDGES: &'static [(State, &'static [State])] = &[
        (State::Unknown, &[]),
        (State::Init, &[]),
        (State::Preparing, &[State::Init, State::Blocked]),
        (State::Blocked, &[State::Preparing]),
        (State::Acquiring, &[State::Preparing, State::Acquiring]),
        (State::Queued, &[State::Acquiring, State::Running]),
        (State::Running, &[State::Queued]),
        (State::Finished, &[State::Running, State::Preparing]),
        (
            State::Aborting,
            &[
                State::Preparing,
                State::Blocked,
                State::Acquiring,
                State::Queued,
                State::Running,
            ],
        ),
        (State::Waitrecover, &[State::Aborting]),
        (
            State::Racquiring,
            &[
                State::Aborting,
                State::Finished,
                State::Racquiring,
                State::Waitrecover,
            ],
        ),
        (State::Recovering, &[State::Racquiring]),
        (
            State::Raborting,
            &[State::Racquiring, State::Recovering, State::Waitrecover],
        ),
        (State::Recovered, &[State::Recovering]),
        (
            State::Failed,
            &[State::Recovering, State::Aborting, State::Raborting],
        ),
    ];

    const TERMINAL: &'static [State] = &[State::Finished, State::Recovered, State::Failed];

    fn allowed_from(self) -> &'static [State] {
        Self::EDGES
            .iter()
            .find(|(s, _)| *s == self)
            .map(|(_, from)| *from)
            .unwrap_or(&[])
    }

    /// True once the task has reached `finished`, `recovered`, or `failed`.
    pub fn is_done(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// True iff `self` is a legal source state for `aborting`.
    pub fn can_abort(self) -> bool {
        State::Aborting.allowed_from().contains(&self)
    }

    /// True iff `self` is a legal source state for `raborting`.
    pub fn can_abort_recovery(self) -> bool {
        State::Raborting.allowed_from().contains(&self)
    }

    /// Validate and perform `self -> next`. Rejects edges not in
    /// [`State::EDGES`] unless `force` is set, in which case any
    /// (non-`Unknown`/`Init`-destination) move succeeds.
    pub fn moveto(&mut self, next: State, force: bool) -> Result<(), TaskError> {
        if !force && !next.allowed_from().contains(self) {
            return Err(TaskError::TaskStateTransitionError {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Unknown => "unknown",
            State::Init => "init",
            State::Preparing => "preparing",
            State::Blocked => "blocked",
            State::Acquiring => "acquiring",
            State::Queued => "queued",
            State::Running => "running",
            State::Finished => "finished",
            State::Aborting => "aborting",
            State::Waitrecover => "waitrecover",
            State::Recovering => "recovering",
            State::Racquiring => "racquiring",
            State::Raborting => "raborting",
            State::Recovered => "recovered",
            State::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for State {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "unknown" => State::Unknown,
            "init" => State::Init,
            "preparing" => State::Preparing,
            "blocked" => State::Blocked,
            "acquiring" => State::Acquiring,
            "queued" => State::Queued,
            "running" => State::Running,
            "finished" => State::Finished,
            "aborting" => State::Aborting,
            "waitrecover" => State::Waitrecover,
            "recovering" => State::Recovering,
            "racquiring" => State::Racquiring,
            "raborting" => State::Raborting,
            "recovered" => State::Recovered,
            "failed" => State::Failed,
            other => {
                return Err(TaskError::InvalidParameter {
                    name: "State".to_string(),
                    value: other.to_string(),
                })
            }
        })
    }
}

impl Default for State {
    fn default() -> Self {
        State::Unknown
    }
}

/// `state -> (legacy state label, legacy result label)`, for
/// [`crate::Task::deprecated_status`]. Preserved byte-for-byte from the
/// original's `DEPRECATED_STATE`/`DEPRECATED_RESULT` tables.
pub fn deprecated_state_label(state: State) -> &'static str {
    match state {
        State::Unknown => "unknown",
        State::Init => "init",
        State::Preparing => "running",
        State::Blocked => "running",
        State::Acquiring => "running",
        State::Queued => "running",
        State::Running => "running",
        State::Finished => "finished",
        State::Aborting => "aborting",
        State::Waitrecover => "cleaning",
        State::Recovering => "cleaning",
        State::Racquiring => "cleaning",
        State::Raborting => "aborting",
        State::Recovered => "finished",
        State::Failed => "finished",
    }
}

pub fn deprecated_result_label(state: State) -> &'static str {
    match state {
        State::Finished => "success",
        State::Recovered => "cleanSuccess",
        State::Failed => "cleanFailure",
        _ => "",
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
