// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const ALL_STATES: &[State] = &[
    State::Unknown,
    State::Init,
    State::Preparing,
    State::Blocked,
    State::Acquiring,
    State::Queued,
    State::Running,
    State::Finished,
    State::Aborting,
    State::Waitrecover,
    State::Recovering,
    State::Racquiring,
    State::Raborting,
    State::Recovered,
    State::Failed,
];

/// For every state `s` and every edge `s -> s'` enumerated in the table,
/// `moveto` succeeds; every edge not listed is rejected unless `force` is
/// set.
#[test]
fn transition_closure_matches_edge_table() {
    for &from in ALL_STATES {
        for &to in ALL_STATES {
            let mut s = from;
            let result = s.moveto(to, false);
            let listed = to.allowed_from().contains(&from);
            if listed {
                assert!(result.is_ok(), "expected {from:?} -> {to:?} to succeed");
                assert_eq!(s, to);
            } else {
                assert!(result.is_err(), "expected {from:?} -> {to:?} to be rejected");
                assert_eq!(s, from, "state must not change on rejected transition");
            }
        }
    }
}

#[test]
fn forced_transition_always_succeeds() {
    let mut s = State::Init;
    s.moveto(State::Recovered, true).unwrap();
    assert_eq!(s, State::Recovered);
}

#[yare::parameterized(
    preparing_from_init = { State::Init, State::Preparing },
    preparing_from_blocked = { State::Blocked, State::Preparing },
    blocked_from_preparing = { State::Preparing, State::Blocked },
    acquiring_from_preparing = { State::Preparing, State::Acquiring },
    acquiring_from_acquiring = { State::Acquiring, State::Acquiring },
    queued_from_acquiring = { State::Acquiring, State::Queued },
    queued_from_running = { State::Running, State::Queued },
    running_from_queued = { State::Queued, State::Running },
    finished_from_running = { State::Running, State::Finished },
    finished_from_preparing = { State::Preparing, State::Finished },
    aborting_from_running = { State::Running, State::Aborting },
    waitrecover_from_aborting = { State::Aborting, State::Waitrecover },
    racquiring_from_aborting = { State::Aborting, State::Racquiring },
    racquiring_from_finished = { State::Finished, State::Racquiring },
    recovering_from_racquiring = { State::Racquiring, State::Recovering },
    raborting_from_recovering = { State::Recovering, State::Raborting },
    recovered_from_recovering = { State::Recovering, State::Recovered },
    failed_from_aborting = { State::Aborting, State::Failed },
    failed_from_raborting = { State::Raborting, State::Failed },
)]
fn documented_edges_succeed(from: State, to: State) {
    let mut s = from;
    assert!(s.moveto(to, false).is_ok());
}

#[yare::parameterized(
    init_is_unreachable = { State::Preparing, State::Init },
    finished_cannot_reenter_running = { State::Finished, State::Running },
    queued_cannot_go_to_recovering = { State::Queued, State::Recovering },
)]
fn undocumented_edges_are_rejected(from: State, to: State) {
    let mut s = from;
    let err = s.moveto(to, false).unwrap_err();
    assert!(matches!(err, TaskError::TaskStateTransitionError { .. }));
}

/// Property 2: once in a terminal state, `isDone()` is true.
#[test]
fn terminal_idempotence() {
    for &terminal in &[State::Finished, State::Recovered, State::Failed] {
        assert!(terminal.is_done());
    }
    for &non_terminal in ALL_STATES {
        if ![State::Finished, State::Recovered, State::Failed].contains(&non_terminal) {
            assert!(!non_terminal.is_done());
        }
    }
}

#[test]
fn can_abort_matches_aborting_from_list() {
    for &s in &[
        State::Preparing,
        State::Blocked,
        State::Acquiring,
        State::Queued,
        State::Running,
    ] {
        assert!(s.can_abort());
    }
    assert!(!State::Finished.can_abort());
}

#[test]
fn can_abort_recovery_matches_raborting_from_list() {
    for &s in &[State::Racquiring, State::Recovering, State::Waitrecover] {
        assert!(s.can_abort_recovery());
    }
    assert!(!State::Running.can_abort_recovery());
}

#[test]
fn display_and_from_str_round_trip_for_every_state() {
    for &s in ALL_STATES {
        let parsed: State = s.to_string().parse().unwrap();
        assert_eq!(parsed, s);
    }
}

#[test]
fn deprecated_tables_match_original_byte_for_byte() {
    assert_eq!(deprecated_state_label(State::Preparing), "running");
    assert_eq!(deprecated_state_label(State::Blocked), "running");
    assert_eq!(deprecated_state_label(State::Acquiring), "running");
    assert_eq!(deprecated_state_label(State::Queued), "running");
    assert_eq!(deprecated_state_label(State::Running), "running");
    assert_eq!(deprecated_state_label(State::Finished), "finished");
    assert_eq!(deprecated_state_label(State::Aborting), "aborting");
    assert_eq!(deprecated_state_label(State::Waitrecover), "cleaning");
    assert_eq!(deprecated_state_label(State::Recovering), "cleaning");
    assert_eq!(deprecated_state_label(State::Racquiring), "cleaning");
    assert_eq!(deprecated_state_label(State::Raborting), "aborting");
    assert_eq!(deprecated_state_label(State::Recovered), "finished");
    assert_eq!(deprecated_state_label(State::Failed), "finished");

    assert_eq!(deprecated_result_label(State::Finished), "success");
    assert_eq!(deprecated_result_label(State::Recovered), "cleanSuccess");
    assert_eq!(deprecated_result_label(State::Failed), "cleanFailure");
    assert_eq!(deprecated_result_label(State::Running), "");
}
