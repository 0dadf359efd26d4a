use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use depot_util::errors::DepotError;

/// User configuration loaded from `~/.depot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepotConfig {
    /// Repositories dependencies are resolved from.
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryEntry>,

    /// Repositories artifacts are published to.
    #[serde(default)]
    pub publish: BTreeMap<String, PublishRepoConfig>,

    #[serde(default)]
    pub signing: Option<SigningConfig>,

    #[serde(default = "default_cache_dir", rename = "cache-dir")]
    pub cache_dir: String,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            repositories: BTreeMap::new(),
            publish: BTreeMap::new(),
            signing: None,
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> String {
    "~/.depot/cache".to_string()
}

/// A download repository: a bare URL or a table with credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepositoryEntry {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
}

impl RepositoryEntry {
    pub fn url(&self) -> &str {
        match self {
            RepositoryEntry::Url(url) | RepositoryEntry::Detailed { url, .. } => url,
        }
    }
}

/// Repository layout, which selects the publication protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoLayout {
    #[default]
    Maven,
    Ivy,
}

/// Digest algorithms for checksum sidecar files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    /// Extension of the sidecar file, without the dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }
}

fn default_checksums() -> Vec<ChecksumAlgorithm> {
    vec![ChecksumAlgorithm::Md5, ChecksumAlgorithm::Sha1]
}

/// A publication target from `[publish.<name>]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRepoConfig {
    pub url: String,
    #[serde(default)]
    pub layout: RepoLayout,
    #[serde(default, rename = "unique-snapshot")]
    pub unique_snapshot: bool,
    #[serde(default = "default_checksums")]
    pub checksums: Vec<ChecksumAlgorithm>,
    #[serde(default)]
    pub sign: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, rename = "artifact-pattern")]
    pub artifact_pattern: Option<String>,
    #[serde(default, rename = "ivy-pattern")]
    pub ivy_pattern: Option<String>,
    /// Glob patterns over `group:name`; empty accepts every module.
    #[serde(default)]
    pub filter: Vec<String>,
}

/// Detached-signature settings from `[signing]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    #[serde(default = "default_signing_program")]
    pub program: String,
    #[serde(default, rename = "gpg-key")]
    pub gpg_key: Option<String>,
    #[serde(default, rename = "gpg-password")]
    pub gpg_password: Option<String>,
}

fn default_signing_program() -> String {
    "gpg".to_string()
}

impl DepotConfig {
    /// Load `~/.depot/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load a configuration file at an explicit location.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DepotError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            DepotError::Config {
                message: format!("Failed to parse config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// The cache directory with a leading `~` expanded.
    pub fn cache_path(&self) -> PathBuf {
        expand_home(&self.cache_dir)
    }
}

/// Returns the path to the depot data directory (`~/.depot/`).
pub fn dirs_path() -> PathBuf {
    home_dir().join(".depot")
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if path == "~" => home_dir(),
        None => PathBuf::from(path),
    }
}

/// Resolve a credential value: `env:NAME` reads the environment variable.
pub fn resolve_secret(value: Option<&str>) -> Option<String> {
    match value?.strip_prefix("env:") {
        Some(var) => std::env::var(var).ok(),
        None => value.map(str::to_string),
    }
}
