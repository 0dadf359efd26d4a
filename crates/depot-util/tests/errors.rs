use depot_util::errors::DepotError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = DepotError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_declaration_error_display() {
    let err = DepotError::Declaration {
        message: "scope name 'a,b' is reserved".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Invalid declaration: scope name 'a,b' is reserved"
    );
}

#[test]
fn test_resolution_error_display() {
    let err = DepotError::Resolution {
        message: "g:a:1.0 not found".to_string(),
    };
    assert_eq!(err.to_string(), "Dependency resolution failed: g:a:1.0 not found");
}

#[test]
fn test_publication_conflict_names_path() {
    let err = DepotError::PublicationConflict {
        path: "g/a/1.0/a-1.0.jar".to_string(),
    };
    assert_eq!(err.to_string(), "Artifact g/a/1.0/a-1.0.jar already exists on repo.");
}

#[test]
fn test_generation_error_display() {
    let err = DepotError::Generation {
        message: "out/gen.jar".to_string(),
    };
    assert_eq!(err.to_string(), "Generation failed: out/gen.jar");
}

#[test]
fn test_generic_error_display() {
    let err = DepotError::Generic {
        message: "something broke".to_string(),
    };
    assert_eq!(err.to_string(), "something broke");
}

#[test]
fn test_into_miette_report() {
    let report: miette::Report = DepotError::Transport {
        message: "connection refused".to_string(),
    }
    .into();
    assert!(report.to_string().contains("connection refused"));
}
