//! External programs: command build actions and the signer go through here.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::PathBuf;
use std::process::{Command, Output};

use crate::errors::DepotError;

/// A program invocation assembled step by step, runnable more than once.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: OsString,
    args: Vec<OsString>,
    env: BTreeMap<OsString, OsString>,
    current_dir: Option<PathBuf>,
}

impl CommandBuilder {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Self {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Added to the inherited environment.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .insert(key.as_ref().to_os_string(), value.as_ref().to_os_string());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program and arguments separated by spaces, for messages.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(&self.env);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }

    /// Runs to completion, whatever the exit status.
    pub fn exec(&self) -> Result<Output, DepotError> {
        tracing::debug!("Running `{}`", self.display());
        self.command().output().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DepotError::Generic {
                message: format!("program `{}` not found", self.program.to_string_lossy()),
            },
            _ => DepotError::Io(e),
        })
    }

    /// Runs to completion; a non-zero exit is an error carrying stderr.
    pub fn exec_checked(&self) -> Result<Output, DepotError> {
        let output = self.exec()?;
        if output.status.success() {
            return Ok(output);
        }
        Err(DepotError::Generic {
            message: format!(
                "`{}` exited with {}: {}",
                self.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })
    }
}
