use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all depot operations.
#[derive(Debug, Error, Diagnostic)]
pub enum DepotError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed declaration: scope name, module description, blank version range.
    #[error("Invalid declaration: {message}")]
    Declaration { message: String },

    /// One or more module dependencies could not be resolved.
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// A computed dependency ran but its declared outputs are still absent.
    #[error("Generation failed: {message}")]
    #[diagnostic(help("Check that the generating action writes every declared output file"))]
    Generation { message: String },

    /// A release artifact already exists at its destination.
    #[error("Artifact {path} already exists on repo.")]
    #[diagnostic(help("Release versions are immutable; bump the version or publish a snapshot"))]
    PublicationConflict { path: String },

    /// Repository transport failure (push, probe or read).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Invalid or unreadable configuration file.
    #[error("Config error: {message}")]
    #[diagnostic(help("Check ~/.depot/config.toml for syntax errors"))]
    Config { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type DepotResult<T> = miette::Result<T>;
