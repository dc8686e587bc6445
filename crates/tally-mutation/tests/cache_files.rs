//! Integration tests: both cache shapes read from disk through the probe.

use std::path::Path;

use rusqlite::Connection;
use tally_core::TallyError;
use tally_mutation::{score, survivors, CacheShape, MutationCache};

fn write_sqlite_cache(path: &Path, mutants: &[(i64, &str, &str, i64, &str)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE SourceFile (id INTEGER PRIMARY KEY, filename TEXT UNIQUE);
        CREATE TABLE Line (id INTEGER PRIMARY KEY, sourcefile INTEGER REFERENCES SourceFile(id),
                           line TEXT, line_number INTEGER);
        CREATE TABLE Mutant (id INTEGER PRIMARY KEY, line INTEGER REFERENCES Line(id), status TEXT);
        ",
    )
    .unwrap();
    for (id, status, filename, line_number, text) in mutants {
        conn.execute(
            "INSERT OR IGNORE INTO SourceFile (filename) VALUES (?1)",
            [filename],
        )
        .unwrap();
        let file_id: i64 = conn
            .query_row(
                "SELECT id FROM SourceFile WHERE filename = ?1",
                [filename],
                |r| r.get(0),
            )
            .unwrap();
        conn.execute(
            "INSERT INTO Line (sourcefile, line, line_number) VALUES (?1, ?2, ?3)",
            rusqlite::params![file_id, text, line_number],
        )
        .unwrap();
        let line_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO Mutant (id, line, status) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, line_id, status],
        )
        .unwrap();
    }
}

#[test]
fn document_cache_score() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".mutmut-cache");
    std::fs::write(
        &path,
        r#"{ "mut1": {"status":"survived"}, "mut2": {"status":"killed"},
             "mut3": {"status":"killed"}, "meta": {"ignored": true} }"#,
    )
    .unwrap();

    let s = score(&path).unwrap();
    assert_eq!((s.total, s.killed, s.survived), (3, 2, 1));
    assert!(s.to_string().contains("Mutation Score: 66.67%"));
}

#[test]
fn relational_cache_survivors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".mutmut-cache");
    write_sqlite_cache(
        &path,
        &[
            (1, "killed", "src/a.py", 3, "x = 1"),
            (2, "ok_killed", "src/a.py", 7, "y = 2"),
            (3, "survived", "src/a.py", 12, "    return x + 1\n"),
        ],
    );

    let cache = MutationCache::open(&path).unwrap();
    assert_eq!(cache.shape(), CacheShape::Relational);

    let listing = survivors(&path, 10).unwrap();
    let text = listing.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Total mutants needing attention: 1");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("survived   src/a.py:12 -> return x + 1"));
    assert!(lines[1].ends_with("(id=3)"));

    let s = score(&path).unwrap();
    assert_eq!((s.total, s.survived), (3, 1));
}

#[test]
fn relational_cache_limit_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".mutmut-cache");
    let rows: Vec<(i64, &str, &str, i64, &str)> = (1..=25)
        .map(|i| (i, "bad_survived", "src/podcast.py", i, "pass"))
        .collect();
    write_sqlite_cache(&path, &rows);

    let listing = survivors(&path, 10).unwrap();
    assert_eq!(listing.total, 25);
    assert_eq!(listing.rows.len(), 10);
    assert_eq!(listing.hidden(), 15);

    let line_numbers: Vec<Option<i64>> = listing
        .rows
        .iter()
        .map(|r| r.location.as_ref().unwrap().line_number)
        .collect();
    assert_eq!(line_numbers, (1..=10).map(Some).collect::<Vec<_>>());
    assert!(listing.to_string().contains("... and 15 more"));
}

#[test]
fn garbage_cache_is_malformed_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".mutmut-cache");
    std::fs::write(&path, "\u{0}\u{1}binary junk").unwrap();

    let err = score(&path).unwrap_err();
    assert!(err.is_malformed_input(), "unexpected error kind: {err}");
}

#[test]
fn absent_cache_is_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = survivors(&dir.path().join(".mutmut-cache"), 200).unwrap_err();
    assert!(matches!(err, TallyError::FileNotFound(_)));
}
