//! Local artifact cache mirroring the Maven repository layout.

use std::fs;
use std::path::{Path, PathBuf};

use depot_core::module::ModuleId;
use depot_util::errors::{DepotError, DepotResult};

use crate::checksum;
use crate::pom::{self, Pom};
use crate::transport::Transport;

/// Downloaded files, laid out as `<root>/<group-path>/<name>/<version>/<file>`.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_dir(&self, module_id: &ModuleId, version: &str) -> PathBuf {
        self.root
            .join(module_id.group_path())
            .join(module_id.name())
            .join(version)
    }

    /// Path of a cached file, if present.
    pub fn get(&self, module_id: &ModuleId, version: &str, filename: &str) -> Option<PathBuf> {
        let path = self.artifact_dir(module_id, version).join(filename);
        path.is_file().then_some(path)
    }

    /// Parsed POM of a cached module version.
    pub fn get_pom(&self, module_id: &ModuleId, version: &str) -> Option<Pom> {
        let filename = format!("{}-{version}.pom", module_id.name());
        let path = self.get(module_id, version, &filename)?;
        let content = fs::read_to_string(path).ok()?;
        pom::parse_pom(&content).ok()
    }

    /// Store data in the cache, creating directories as needed.
    pub fn put(
        &self,
        module_id: &ModuleId,
        version: &str,
        filename: &str,
        data: &[u8],
    ) -> DepotResult<PathBuf> {
        let dir = self.artifact_dir(module_id, version);
        fs::create_dir_all(&dir).map_err(DepotError::Io)?;
        let path = dir.join(filename);
        fs::write(&path, data).map_err(DepotError::Io)?;
        Ok(path)
    }

    /// Returns the cached file, or downloads `remote_path` through the
    /// transport and caches it. `refresh` bypasses the cached copy.
    /// `None` when the repository does not have the file.
    ///
    /// Downloads are checked against the checksum sidecars published next
    /// to them; content that does not match is not cached.
    pub fn fetch(
        &self,
        transport: &dyn Transport,
        remote_path: &str,
        module_id: &ModuleId,
        version: &str,
        refresh: bool,
    ) -> DepotResult<Option<PathBuf>> {
        let filename = remote_path.rsplit('/').next().unwrap_or(remote_path);
        if !refresh {
            if let Some(path) = self.get(module_id, version, filename) {
                return Ok(Some(path));
            }
        }
        match transport.read_bytes(remote_path)? {
            Some(data) => {
                tracing::debug!("Downloaded {remote_path} from {}", transport.describe());
                checksum::verify(transport, remote_path, &data)?;
                self.put(module_id, version, filename, &data).map(Some)
            }
            None => Ok(None),
        }
    }
}
