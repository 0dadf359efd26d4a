//! Detached signatures of published files.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use depot_core::config::{resolve_secret, SigningConfig};
use depot_util::errors::{DepotError, DepotResult};
use depot_util::process::CommandBuilder;

pub trait Signer: Send + Sync {
    /// Produces an ASCII-armored detached signature of `file` and returns
    /// its path.
    fn sign(&self, file: &Path) -> DepotResult<PathBuf>;
}

/// `<file>.asc`.
pub fn signature_path(file: &Path) -> PathBuf {
    let mut name = OsString::from(file.as_os_str());
    name.push(".asc");
    PathBuf::from(name)
}

/// Signs through an external `gpg` executable.
#[derive(Debug, Clone)]
pub struct GpgSigner {
    program: String,
    key: Option<String>,
    passphrase: Option<String>,
}

impl GpgSigner {
    pub fn new() -> Self {
        Self {
            program: "gpg".to_string(),
            key: None,
            passphrase: None,
        }
    }

    /// Key and passphrase accept the `env:NAME` form.
    pub fn from_config(config: &SigningConfig) -> Self {
        Self {
            program: config.program.clone(),
            key: resolve_secret(config.gpg_key.as_deref()),
            passphrase: resolve_secret(config.gpg_password.as_deref()),
        }
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    /// Key id or user id passed as `--local-user`.
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn with_passphrase(mut self, passphrase: &str) -> Self {
        self.passphrase = Some(passphrase.to_string());
        self
    }

    /// The passphrase travels through a file so it never shows on the
    /// command line.
    pub(crate) fn command(&self, file: &Path, output: &Path, passphrase_file: Option<&Path>) -> CommandBuilder {
        let mut command = CommandBuilder::new(&self.program)
            .args(["--batch", "--yes", "--armor", "--detach-sign"])
            .arg("--output")
            .arg(output);
        if let Some(key) = &self.key {
            command = command.arg("--local-user").arg(key);
        }
        if let Some(passphrase_file) = passphrase_file {
            command = command
                .args(["--pinentry-mode", "loopback", "--passphrase-file"])
                .arg(passphrase_file);
        }
        command.arg(file)
    }
}

impl Default for GpgSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer for GpgSigner {
    fn sign(&self, file: &Path) -> DepotResult<PathBuf> {
        let output = signature_path(file);
        let passphrase_file = match &self.passphrase {
            Some(passphrase) => {
                let mut tmp = tempfile::NamedTempFile::new().map_err(DepotError::Io)?;
                tmp.write_all(passphrase.as_bytes()).map_err(DepotError::Io)?;
                tmp.flush().map_err(DepotError::Io)?;
                Some(tmp)
            }
            None => None,
        };
        let command = self.command(file, &output, passphrase_file.as_ref().map(|f| f.path()));
        command.exec_checked().map_err(|e| DepotError::Generic {
            message: format!("Signing {} failed: {e}", file.display()),
        })?;
        if !output.is_file() {
            return Err(DepotError::Generic {
                message: format!("{} did not produce {}", self.program, output.display()),
            }
            .into());
        }
        tracing::debug!("Signed {}", file.display());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sits_next_to_file() {
        assert_eq!(
            signature_path(Path::new("/tmp/a-1.0.jar")),
            PathBuf::from("/tmp/a-1.0.jar.asc")
        );
    }

    #[test]
    fn command_line_without_passphrase() {
        let signer = GpgSigner::new().with_key("ABCD1234");
        let cmd = signer.command(Path::new("a.jar"), Path::new("a.jar.asc"), None);
        assert_eq!(
            cmd.display(),
            "gpg --batch --yes --armor --detach-sign --output a.jar.asc --local-user ABCD1234 a.jar"
        );
    }

    #[test]
    fn passphrase_goes_through_file() {
        let signer = GpgSigner::new().with_passphrase("s3cret");
        let cmd = signer.command(Path::new("a.jar"), Path::new("a.jar.asc"), Some(Path::new("/tmp/pass")));
        let line = cmd.display();
        assert!(line.contains("--passphrase-file /tmp/pass"));
        assert!(!line.contains("s3cret"));
    }

    #[test]
    fn missing_program_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.jar");
        std::fs::write(&file, "x").unwrap();
        let signer = GpgSigner::new().with_program("depot-test-no-such-gpg");
        assert!(signer.sign(&file).is_err());
    }
}
