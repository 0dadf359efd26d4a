use depot_core::dependency::{CommandAction, ComputedDependency, Dependency, FileDependency};
use depot_util::errors::DepotResult;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_action_runs_when_output_missing() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("gen.jar");
    let runs = Arc::new(AtomicUsize::new(0));
    let (target, counter) = (out.clone(), runs.clone());
    let computed = ComputedDependency::of(
        move || -> DepotResult<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            std::fs::write(&target, "jar").map_err(depot_util::errors::DepotError::from)?;
            Ok(())
        },
        [out.clone()],
    );
    assert_eq!(computed.paths().unwrap(), vec![out.clone()]);
    assert_eq!(computed.paths().unwrap(), vec![out]);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_action_runs_when_output_dir_empty() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("classes");
    std::fs::create_dir(&dir).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let (target, counter) = (dir.clone(), runs.clone());
    let computed = ComputedDependency::of(
        move || -> DepotResult<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            std::fs::write(target.join("A.class"), "x").map_err(depot_util::errors::DepotError::from)?;
            Ok(())
        },
        [dir.clone()],
    );
    computed.paths().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_still_missing_after_run_is_generation_error() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("never.jar");
    let computed = ComputedDependency::of(|| -> DepotResult<()> { Ok(()) }, [out]);
    let err = computed.paths().unwrap_err();
    assert!(err.to_string().contains("Generation failed"), "got: {err}");
    assert!(err.to_string().contains("never.jar"));
}

#[test]
fn test_extra_files_follow_expected_files() {
    let tmp = TempDir::new().unwrap();
    let main = tmp.path().join("main.jar");
    std::fs::write(&main, "x").unwrap();
    let extra = tmp.path().join("extra.jar");
    let extra_clone = extra.clone();
    let computed = ComputedDependency::of(|| -> DepotResult<()> { Ok(()) }, [main.clone()])
        .with_extra_files(move || vec![extra_clone.clone()]);
    assert_eq!(computed.paths().unwrap(), vec![main, extra]);
}

#[cfg(unix)]
#[test]
fn test_command_action_produces_file() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("cmd.txt");
    let command = depot_util::process::CommandBuilder::new("sh")
        .arg("-c")
        .arg(format!("echo done > {}", out.display()));
    let computed = ComputedDependency::of(CommandAction::new(command), [out.clone()]);
    assert_eq!(computed.paths().unwrap(), vec![out]);
}

#[test]
fn test_missing_file_dependency_fails_on_read() {
    let dep = Dependency::from(FileDependency::of([PathBuf::from("/nonexistent/x.jar")]));
    assert!(dep.local_paths().is_err());
}
