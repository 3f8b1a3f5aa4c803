// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use super::*;

#[test]
fn mkdir_then_exists() {
    let fs = FakeFsHelper::new();
    let dir = PathBuf::from("/store/abc");
    assert!(!fs.exists(&dir));
    fs.mkdir(&dir).unwrap();
    assert!(fs.exists(&dir));
}

#[test]
fn mkdir_rejects_duplicate() {
    let fs = FakeFsHelper::new();
    let dir = PathBuf::from("/store/abc");
    fs.mkdir(&dir).unwrap();
    assert!(fs.mkdir(&dir).is_err());
}

#[test]
fn write_then_read_round_trips_lines() {
    let fs = FakeFsHelper::new();
    let path = PathBuf::from("/store/abc/abc.task");
    let lines = vec!["id = abc".to_string(), "name = n".to_string()];
    fs.write_lines(&path, &lines).unwrap();
    assert_eq!(fs.read_lines(&path).unwrap(), lines);
}

#[test]
fn rename_moves_directory_tree() {
    let fs = FakeFsHelper::new();
    let from = PathBuf::from("/store/abc");
    let to = PathBuf::from("/store/abc.backup");
    fs.mkdir(&from).unwrap();
    fs.write_lines(&from.join("abc.task"), &["id = abc".to_string()]).unwrap();

    fs.rename(&from, &to).unwrap();

    assert!(!fs.exists(&from));
    assert!(fs.exists(&to));
    assert_eq!(fs.read_lines(&to.join("abc.task")).unwrap(), vec!["id = abc".to_string()]);
}

#[test]
fn cleanupdir_missing_path_is_not_an_error() {
    let fs = FakeFsHelper::new();
    fs.cleanupdir(Path::new("/store/nope")).unwrap();
}

#[test]
fn glob_matches_suffix_within_directory_only() {
    let fs = FakeFsHelper::new();
    let dir = PathBuf::from("/store/abc");
    fs.mkdir(&dir).unwrap();
    fs.write_lines(&dir.join("abc.job.0"), &[]).unwrap();
    fs.write_lines(&dir.join("abc.resource"), &[]).unwrap();
    fs.write_lines(&dir.join("nested").join("abc.resource"), &[]).unwrap();

    let mut found = fs.glob(&dir, "*.resource").unwrap();
    found.sort();
    assert_eq!(found, vec![dir.join("abc.resource")]);
}

#[test]
fn calls_are_recorded_in_order() {
    let fs = FakeFsHelper::new();
    let dir = PathBuf::from("/store/abc");
    fs.mkdir(&dir).unwrap();
    fs.cleanupdir(&dir).unwrap();
    assert_eq!(
        fs.calls(),
        vec![RecordedCall::Mkdir(dir.clone()), RecordedCall::Cleanupdir(dir)]
    );
}
