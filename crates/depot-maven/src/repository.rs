//! Repositories: where dependencies are downloaded from and where
//! publications are pushed to.

use std::fmt;
use std::sync::Arc;

use depot_core::config::{ChecksumAlgorithm, PublishRepoConfig, RepoLayout, RepositoryEntry};
use depot_core::module::ModuleId;
use depot_util::errors::{DepotError, DepotResult};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::auth::Credentials;
use crate::layout::{DEFAULT_IVY_ARTIFACT_PATTERN, DEFAULT_IVY_DESCRIPTOR_PATTERN};
use crate::transport::{self, Transport};

/// Maven Central base URL.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// A download repository with optional credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenRepository {
    pub name: String,
    pub url: String,
    pub credentials: Credentials,
}

impl MavenRepository {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.trim_end_matches('/').to_string(),
            credentials: Credentials::none(),
        }
    }

    /// Build a repository from a `[repositories]` entry.
    pub fn from_entry(name: &str, entry: &RepositoryEntry) -> Self {
        match entry {
            RepositoryEntry::Url(url) => Self::new(name, url),
            RepositoryEntry::Detailed {
                url,
                username,
                password,
            } => Self {
                credentials: Credentials::from_config(username.as_deref(), password.as_deref()),
                ..Self::new(name, url)
            },
        }
    }

    pub fn maven_central() -> Self {
        Self::new("maven-central", MAVEN_CENTRAL_URL)
    }

    /// `org.example:lib` at `1.0` is laid out under `org/example/lib/1.0`.
    pub fn coordinate_path(module_id: &ModuleId, version: &str) -> String {
        format!("{}/{}/{}", module_id.group_path(), module_id.name(), version)
    }

    pub fn has_auth(&self) -> bool {
        !self.credentials.is_empty()
    }

    /// Opens a transport to read from this repository.
    pub fn transport(&self) -> DepotResult<Box<dyn Transport>> {
        transport::for_url(&self.url, self.credentials.clone())
    }
}

/// A publication target.
#[derive(Clone)]
pub struct PublishRepository {
    name: String,
    layout: RepoLayout,
    unique_snapshot: bool,
    checksums: Vec<ChecksumAlgorithm>,
    sign: bool,
    artifact_pattern: String,
    ivy_pattern: String,
    filter_patterns: Vec<String>,
    filter: Option<GlobSet>,
    transport: Arc<dyn Transport>,
}

impl PublishRepository {
    /// A repository with md5 and sha1 checksums, no signing, no filter.
    pub fn new(name: &str, layout: RepoLayout, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.to_string(),
            layout,
            unique_snapshot: false,
            checksums: vec![ChecksumAlgorithm::Md5, ChecksumAlgorithm::Sha1],
            sign: false,
            artifact_pattern: DEFAULT_IVY_ARTIFACT_PATTERN.to_string(),
            ivy_pattern: DEFAULT_IVY_DESCRIPTOR_PATTERN.to_string(),
            filter_patterns: Vec::new(),
            filter: None,
            transport,
        }
    }

    /// Build from a `[publish.<name>]` section, opening its transport.
    pub fn from_config(name: &str, config: &PublishRepoConfig) -> DepotResult<Self> {
        let credentials =
            Credentials::from_config(config.username.as_deref(), config.password.as_deref());
        let transport: Arc<dyn Transport> = Arc::from(transport::for_url(&config.url, credentials)?);
        let mut repo = Self::new(name, config.layout, transport)
            .with_unique_snapshot(config.unique_snapshot)
            .with_checksums(config.checksums.clone())
            .with_signing(config.sign);
        if let Some(pattern) = &config.artifact_pattern {
            repo = repo.with_artifact_pattern(pattern);
        }
        if let Some(pattern) = &config.ivy_pattern {
            repo = repo.with_ivy_pattern(pattern);
        }
        let filter: Vec<&str> = config.filter.iter().map(String::as_str).collect();
        repo.with_filter(&filter)
    }

    pub fn with_unique_snapshot(mut self, unique_snapshot: bool) -> Self {
        self.unique_snapshot = unique_snapshot;
        self
    }

    pub fn with_checksums(mut self, checksums: Vec<ChecksumAlgorithm>) -> Self {
        self.checksums = checksums;
        self
    }

    pub fn with_signing(mut self, sign: bool) -> Self {
        self.sign = sign;
        self
    }

    pub fn with_artifact_pattern(mut self, pattern: &str) -> Self {
        self.artifact_pattern = pattern.to_string();
        self
    }

    pub fn with_ivy_pattern(mut self, pattern: &str) -> Self {
        self.ivy_pattern = pattern.to_string();
        self
    }

    /// Restrict the modules accepted. Each pattern is a glob over
    /// `group:name`; a pattern without `:` is a group prefix. No pattern
    /// accepts everything.
    pub fn with_filter(mut self, patterns: &[&str]) -> DepotResult<Self> {
        if patterns.is_empty() {
            self.filter = None;
            self.filter_patterns.clear();
            return Ok(self);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob_text = if pattern.contains(':') {
                pattern.to_string()
            } else {
                format!("{pattern}*")
            };
            let glob = Glob::new(&glob_text).map_err(|e| DepotError::Config {
                message: format!("Invalid filter '{pattern}' for repository {}: {e}", self.name),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| DepotError::Config {
            message: format!("Invalid filter for repository {}: {e}", self.name),
        })?;
        self.filter = Some(set);
        self.filter_patterns = patterns.iter().map(|p| p.to_string()).collect();
        Ok(self)
    }

    pub fn accepts(&self, module_id: &ModuleId) -> bool {
        match &self.filter {
            Some(set) => set.is_match(module_id.to_string()),
            None => true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> RepoLayout {
        self.layout
    }

    pub fn is_unique_snapshot(&self) -> bool {
        self.unique_snapshot
    }

    pub fn checksums(&self) -> &[ChecksumAlgorithm] {
        &self.checksums
    }

    pub fn requires_signature(&self) -> bool {
        self.sign
    }

    pub fn artifact_pattern(&self) -> &str {
        &self.artifact_pattern
    }

    pub fn ivy_pattern(&self) -> &str {
        &self.ivy_pattern
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

impl fmt::Debug for PublishRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishRepository")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .field("unique_snapshot", &self.unique_snapshot)
            .field("checksums", &self.checksums)
            .field("sign", &self.sign)
            .field("filter", &self.filter_patterns)
            .field("location", &self.transport.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FsTransport;

    fn id(s: &str) -> ModuleId {
        ModuleId::parse(s).unwrap()
    }

    fn fs_repo() -> PublishRepository {
        PublishRepository::new("local", RepoLayout::Maven, Arc::new(FsTransport::new("/tmp/none")))
    }

    #[test]
    fn coordinate_path_replaces_dots() {
        assert_eq!(
            MavenRepository::coordinate_path(&id("io.netty:netty-buffer"), "1.8.0"),
            "io/netty/netty-buffer/1.8.0"
        );
    }

    #[test]
    fn from_entry_url() {
        let entry = RepositoryEntry::Url("https://repo.example.com/maven/".to_string());
        let repo = MavenRepository::from_entry("test", &entry);
        assert_eq!(repo.url, "https://repo.example.com/maven");
        assert!(!repo.has_auth());
    }

    #[test]
    fn from_entry_detailed_with_auth() {
        let entry = RepositoryEntry::Detailed {
            url: "https://nexus.co/maven".to_string(),
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
        };
        let repo = MavenRepository::from_entry("nexus", &entry);
        assert!(repo.has_auth());
        assert_eq!(repo.credentials.username.as_deref(), Some("user"));
    }

    #[test]
    fn no_filter_accepts_all() {
        assert!(fs_repo().accepts(&id("any:thing")));
    }

    #[test]
    fn group_prefix_and_glob_filters() {
        let repo = fs_repo().with_filter(&["org.example", "com.acme:*-api"]).unwrap();
        assert!(repo.accepts(&id("org.example.sub:lib")));
        assert!(repo.accepts(&id("com.acme:billing-api")));
        assert!(!repo.accepts(&id("com.acme:billing-impl")));
        assert!(!repo.accepts(&id("net.other:lib")));
    }

    #[test]
    fn from_config_reads_options() {
        let config: PublishRepoConfig = toml_config(
            r#"
url = "/tmp/depot-repo"
layout = "ivy"
unique-snapshot = true
checksums = ["sha256"]
sign = true
"#,
        );
        let repo = PublishRepository::from_config("r", &config).unwrap();
        assert_eq!(repo.layout(), RepoLayout::Ivy);
        assert!(repo.is_unique_snapshot());
        assert!(repo.requires_signature());
        assert_eq!(repo.checksums(), &[ChecksumAlgorithm::Sha256]);
        assert_eq!(repo.artifact_pattern(), DEFAULT_IVY_ARTIFACT_PATTERN);
    }

    fn toml_config(text: &str) -> PublishRepoConfig {
        let wrapped = format!("[publish.r]\n{text}");
        let config = depot_core::config::DepotConfig::parse_toml(&wrapped).unwrap();
        config.publish["r"].clone()
    }
}
