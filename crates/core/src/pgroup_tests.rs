// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use super::*;

#[test]
fn roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tectonic.pgroup");

    write(&path, 4321).unwrap();
    assert_eq!(read(&path).unwrap(), 4321);
}

#[test]
fn missing_file_is_reported_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = read(&dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, PgroupError::Missing(_)));
}

#[parameterized(
    empty = { "" },
    trailing_newline = { "123\n" },
    text = { "not a pid" },
    negative = { "-5" },
)]
fn malformed_content_is_rejected(content: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tectonic.pgroup");
    std::fs::write(&path, content).unwrap();

    let err = read(&path).unwrap_err();
    assert!(matches!(err, PgroupError::Malformed(_)));
}

#[test]
fn oversized_content_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tectonic.pgroup");
    std::fs::write(&path, "1".repeat(2048)).unwrap();

    let err = read(&path).unwrap_err();
    assert!(matches!(err, PgroupError::Malformed(_)));
}
