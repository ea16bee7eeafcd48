use std::fs;

use reconcile_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_download_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("downloads").join("nested");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn second_download_replaces_the_first() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("ana.xlsx", b"v1").unwrap();
    assert_eq!(first.file_name().unwrap(), "ana.xlsx");
    assert_eq!(fs::read(&first).unwrap(), b"v1");

    let second = writer.write("ana.xlsx", b"v2").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"v2");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn no_partial_file_when_target_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("ana.xlsx", b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("ana.xlsx").exists());
}

#[test]
fn names_that_escape_the_download_dir_are_refused() {
    let temp = TempDir::new().unwrap();
    let downloads = temp.path().join("downloads");
    let writer = AtomicFileWriter::new(downloads.clone());

    for name in ["../ana.xlsx", "sub/ana.xlsx", "..", ""] {
        assert!(
            matches!(writer.write(name, b"x"), Err(PersistError::InvalidName(_))),
            "{name:?} should be refused"
        );
    }
    assert!(!temp.path().join("ana.xlsx").exists());
    assert!(!downloads.exists());
}
