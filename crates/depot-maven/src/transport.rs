//! Repository transports: where published files go and where descriptors
//! and metadata are read from.
//!
//! Publication happens inside a transaction. Pushes are immediately
//! visible; `abort_publish_transaction` removes what the transaction wrote
//! as far as the transport is able to.

use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use depot_util::errors::{DepotError, DepotResult};
use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::auth::{self, Credentials};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub trait Transport: Send + Sync {
    fn begin_publish_transaction(&self, id: &str) -> DepotResult<()>;

    /// Copies `source` to `destination`. Without `overwrite`, an existing
    /// destination is a publication conflict.
    fn push(&self, destination: &str, source: &Path, overwrite: bool) -> DepotResult<()>;

    fn resource_exists(&self, path: &str) -> DepotResult<bool>;

    /// `None` when the resource does not exist.
    fn open_read(&self, path: &str) -> DepotResult<Option<Box<dyn Read + Send>>>;

    fn commit_publish_transaction(&self) -> DepotResult<()>;

    fn abort_publish_transaction(&self) -> DepotResult<()>;

    /// Human readable location, used in logs.
    fn describe(&self) -> String;

    fn supports_compare_and_swap(&self) -> bool {
        false
    }

    /// Replaces `destination` with `source` only if its current content is
    /// `expected` (`None` meaning absent). Returns `false` when the content
    /// changed in between.
    fn compare_and_swap(
        &self,
        destination: &str,
        _expected: Option<&[u8]>,
        _source: &Path,
    ) -> DepotResult<bool> {
        Err(DepotError::Transport {
            message: format!(
                "{} does not support compare-and-swap (writing {destination})",
                self.describe()
            ),
        }
        .into())
    }

    fn read_bytes(&self, path: &str) -> DepotResult<Option<Vec<u8>>> {
        let Some(mut reader) = self.open_read(path)? else {
            return Ok(None);
        };
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map_err(DepotError::Io)?;
        Ok(Some(buf))
    }
}

/// Builds the transport matching a repository URL: `http(s)://` goes over
/// HTTP, `file://` or a bare path is a local directory.
pub fn for_url(url: &str, credentials: Credentials) -> DepotResult<Box<dyn Transport>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(Box::new(HttpTransport::new(url, credentials)?))
    } else {
        let path = url.strip_prefix("file://").unwrap_or(url);
        Ok(Box::new(FsTransport::new(path)))
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A repository stored in a local directory.
#[derive(Debug)]
pub struct FsTransport {
    root: PathBuf,
    transaction: Mutex<Option<String>>,
    created: Mutex<Vec<PathBuf>>,
}

impl FsTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            transaction: Mutex::new(None),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Transport for FsTransport {
    fn begin_publish_transaction(&self, id: &str) -> DepotResult<()> {
        tracing::debug!("Begin publish transaction {id} on {}", self.root.display());
        *guard(&self.transaction) = Some(id.to_string());
        guard(&self.created).clear();
        Ok(())
    }

    fn push(&self, destination: &str, source: &Path, overwrite: bool) -> DepotResult<()> {
        let target = self.resolve(destination);
        let existed = target.exists();
        if existed && !overwrite {
            return Err(DepotError::PublicationConflict {
                path: destination.to_string(),
            }
            .into());
        }
        tracing::debug!("Push {} -> {}", source.display(), target.display());
        depot_util::fs::copy_file(source, &target).map_err(|e| DepotError::Transport {
            message: format!("Failed to write {}: {e}", target.display()),
        })?;
        if !existed && guard(&self.transaction).is_some() {
            guard(&self.created).push(target);
        }
        Ok(())
    }

    fn resource_exists(&self, path: &str) -> DepotResult<bool> {
        let exists = self.resolve(path).is_file();
        tracing::debug!("Probe {path}: {}", if exists { "present" } else { "absent" });
        Ok(exists)
    }

    fn open_read(&self, path: &str) -> DepotResult<Option<Box<dyn Read + Send>>> {
        match fs::File::open(self.resolve(path)) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DepotError::Transport {
                message: format!("Failed to read {path}: {e}"),
            }
            .into()),
        }
    }

    fn commit_publish_transaction(&self) -> DepotResult<()> {
        if let Some(id) = guard(&self.transaction).take() {
            tracing::debug!("Commit publish transaction {id}");
        }
        guard(&self.created).clear();
        Ok(())
    }

    fn abort_publish_transaction(&self) -> DepotResult<()> {
        guard(&self.transaction).take();
        let created: Vec<PathBuf> = guard(&self.created).drain(..).collect();
        let mut failures = Vec::new();
        for path in created.iter().rev() {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    failures.push(format!("{}: {e}", path.display()));
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DepotError::Transport {
                message: format!("Could not remove {}", failures.join(", ")),
            }
            .into())
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn supports_compare_and_swap(&self) -> bool {
        true
    }

    fn compare_and_swap(
        &self,
        destination: &str,
        expected: Option<&[u8]>,
        source: &Path,
    ) -> DepotResult<bool> {
        let current = self.read_bytes(destination)?;
        if current.as_deref() != expected {
            return Ok(false);
        }
        self.push(destination, source, true)?;
        Ok(true)
    }
}

/// A repository reached over HTTP: PUT to publish, HEAD to probe, GET to read.
#[derive(Debug)]
pub struct HttpTransport {
    base_url: String,
    credentials: Credentials,
    client: Client,
    pushed: Mutex<Vec<String>>,
}

impl HttpTransport {
    pub fn new(base_url: &str, credentials: Credentials) -> DepotResult<Self> {
        Self::with_timeout(base_url, credentials, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> DepotResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("depot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DepotError::Transport {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
            pushed: Mutex::new(Vec::new()),
        })
    }

    pub fn url_of(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn transport_error(url: &str, detail: impl std::fmt::Display) -> miette::Report {
        DepotError::Transport {
            message: format!("{url}: {detail}"),
        }
        .into()
    }
}

impl Transport for HttpTransport {
    fn begin_publish_transaction(&self, id: &str) -> DepotResult<()> {
        tracing::debug!("Begin publish transaction {id} on {}", self.base_url);
        guard(&self.pushed).clear();
        Ok(())
    }

    /// Files that existed before the push are not recorded, so an abort
    /// never deletes them.
    fn push(&self, destination: &str, source: &Path, overwrite: bool) -> DepotResult<()> {
        let existed = self.resource_exists(destination)?;
        if existed && !overwrite {
            return Err(DepotError::PublicationConflict {
                path: destination.to_string(),
            }
            .into());
        }
        let url = self.url_of(destination);
        let body = fs::read(source).map_err(DepotError::Io)?;
        tracing::debug!("PUT {url} ({} bytes)", body.len());
        let request = auth::apply_auth(self.client.put(&url), &self.credentials).body(body);
        let response = request
            .send()
            .map_err(|e| Self::transport_error(&url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::transport_error(&url, format!("HTTP {status}")));
        }
        if !existed {
            guard(&self.pushed).push(destination.to_string());
        }
        Ok(())
    }

    fn resource_exists(&self, path: &str) -> DepotResult<bool> {
        let url = self.url_of(path);
        let response = auth::apply_auth(self.client.head(&url), &self.credentials)
            .send()
            .map_err(|e| Self::transport_error(&url, e))?;
        let status = response.status();
        tracing::debug!("HEAD {url}: {status}");
        if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else if status.is_success() {
            Ok(true)
        } else {
            Err(Self::transport_error(&url, format!("HTTP {status}")))
        }
    }

    fn open_read(&self, path: &str) -> DepotResult<Option<Box<dyn Read + Send>>> {
        let url = self.url_of(path);
        let response = auth::apply_auth(self.client.get(&url), &self.credentials)
            .send()
            .map_err(|e| Self::transport_error(&url, e))?;
        let status = response.status();
        tracing::debug!("GET {url}: {status}");
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::transport_error(&url, format!("HTTP {status}")));
        }
        Ok(Some(Box::new(response)))
    }

    fn commit_publish_transaction(&self) -> DepotResult<()> {
        guard(&self.pushed).clear();
        Ok(())
    }

    /// Issues a DELETE for every file the transaction created. Servers
    /// that refuse deletion leave the files in place.
    fn abort_publish_transaction(&self) -> DepotResult<()> {
        let pushed: Vec<String> = guard(&self.pushed).drain(..).collect();
        let mut failures = Vec::new();
        for path in pushed.iter().rev() {
            let url = self.url_of(path);
            let outcome = auth::apply_auth(self.client.delete(&url), &self.credentials).send();
            match outcome {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => failures.push(format!("{url} (HTTP {})", response.status())),
                Err(e) => failures.push(format!("{url} ({e})")),
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DepotError::Transport {
                message: format!("Could not delete {}", failures.join(", ")),
            }
            .into())
        }
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
