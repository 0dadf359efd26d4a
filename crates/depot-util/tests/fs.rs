use depot_util::fs::{copy_file, dedup_paths, ensure_dir, extension_of, is_empty_dir};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y").join("z");
    assert!(!deep.exists());
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
}

#[test]
fn test_ensure_dir_idempotent() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("already");
    std::fs::create_dir(&dir).unwrap();
    ensure_dir(&dir).unwrap();
    assert!(dir.is_dir());
}

#[test]
fn test_is_empty_dir() {
    let tmp = TempDir::new().unwrap();
    assert!(is_empty_dir(tmp.path()).unwrap());
    std::fs::write(tmp.path().join("f"), "x").unwrap();
    assert!(!is_empty_dir(tmp.path()).unwrap());
}

#[test]
fn test_copy_file_creates_parents() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src.txt");
    std::fs::write(&src, "payload").unwrap();
    let dest = tmp.path().join("a").join("b").join("dest.txt");
    copy_file(&src, &dest).unwrap();
    assert_eq!(std::fs::read_to_string(dest).unwrap(), "payload");
}

#[test]
fn test_extension_of() {
    assert_eq!(extension_of(Path::new("lib/a-1.0.jar")).as_deref(), Some("jar"));
    assert_eq!(extension_of(Path::new("README")), None);
}

#[test]
fn test_dedup_paths_keeps_first() {
    let paths = vec![
        PathBuf::from("b"),
        PathBuf::from("a"),
        PathBuf::from("b"),
        PathBuf::from("c"),
    ];
    assert_eq!(
        dedup_paths(paths),
        vec![PathBuf::from("b"), PathBuf::from("a"), PathBuf::from("c")]
    );
}
