// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn set_then_get_round_trips() {
    let mut meta = MetaFile::new();
    meta.set("id", "abc");
    meta.set("njobs", 3);
    assert_eq!(meta.get("id"), Some("abc"));
    assert_eq!(meta.get_required::<u32>("njobs").unwrap(), 3);
}

#[test]
fn set_overwrites_rather_than_appending() {
    let mut meta = MetaFile::new();
    meta.set("id", "abc");
    meta.set("id", "def");
    assert_eq!(meta.to_lines(), vec!["id = def".to_string()]);
}

#[test]
fn parse_skips_lines_without_separator() {
    let lines = vec!["id = abc".to_string(), "not a field".to_string(), "".to_string()];
    let meta = MetaFile::parse(&lines);
    assert_eq!(meta.get("id"), Some("abc"));
    assert_eq!(meta.to_lines().len(), 1);
}

#[test]
fn parse_skips_lines_with_extra_separators() {
    let lines = vec!["id = abc".to_string(), "weird = a = b".to_string()];
    let meta = MetaFile::parse(&lines);
    assert_eq!(meta.get("id"), Some("abc"));
    assert_eq!(meta.get("weird"), None);
}

#[test]
fn parse_trims_whitespace_around_name_and_value() {
    let lines = vec!["  id   =   abc  ".to_string()];
    let meta = MetaFile::parse(&lines);
    assert_eq!(meta.get("id"), Some("abc"));
}

#[test]
fn get_required_missing_field_errors() {
    let meta = MetaFile::new();
    let err = meta.get_required::<u32>("njobs").unwrap_err();
    assert!(matches!(err, StorageError::MissingField("njobs")));
}

#[test]
fn get_required_invalid_value_errors() {
    let mut meta = MetaFile::new();
    meta.set("njobs", "not-a-number");
    let err = meta.get_required::<u32>("njobs").unwrap_err();
    assert!(matches!(err, StorageError::InvalidField { field: "njobs", .. }));
}

#[test]
fn round_trip_through_lines() {
    let mut meta = MetaFile::new();
    meta.set("id", "abc");
    meta.set("state", "finished");
    let reparsed = MetaFile::parse(&meta.to_lines());
    assert_eq!(reparsed.get("id"), Some("abc"));
    assert_eq!(reparsed.get("state"), Some("finished"));
}
