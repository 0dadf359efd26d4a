use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use depot_core::config::{ChecksumAlgorithm, RepoLayout};
use depot_core::dependency_set::DependencySet;
use depot_core::module::VersionedModule;
use depot_core::publication::Publication;
use depot_core::scope::scopes;
use depot_maven::checksum::digest_bytes;
use depot_maven::metadata::MavenMetadata;
use depot_maven::publish::{IvyPublisher, MavenPublisher, Publisher};
use depot_maven::repository::PublishRepository;
use depot_maven::signer::{signature_path, Signer};
use depot_maven::transport::{FsTransport, Transport};
use depot_util::errors::{DepotError, DepotResult};

/// In-memory repository recording every call.
#[derive(Default)]
struct MemoryTransport {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    created: Mutex<Vec<String>>,
    events: Mutex<Vec<String>>,
    fail_suffix: Option<String>,
}

impl MemoryTransport {
    fn failing_on(suffix: &str) -> Self {
        Self {
            fail_suffix: Some(suffix.to_string()),
            ..Self::default()
        }
    }

    fn paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    fn text(&self, path: &str) -> String {
        String::from_utf8(self.files.lock().unwrap()[path].clone()).unwrap()
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push_count(&self) -> usize {
        self.events().iter().filter(|e| e.starts_with("push ")).count()
    }
}

impl Transport for MemoryTransport {
    fn begin_publish_transaction(&self, id: &str) -> DepotResult<()> {
        self.events.lock().unwrap().push(format!("begin {id}"));
        self.created.lock().unwrap().clear();
        Ok(())
    }

    fn push(&self, destination: &str, source: &Path, overwrite: bool) -> DepotResult<()> {
        self.events.lock().unwrap().push(format!("push {destination}"));
        if let Some(suffix) = &self.fail_suffix {
            if destination.ends_with(suffix.as_str()) {
                return Err(DepotError::Transport {
                    message: format!("connection reset writing {destination}"),
                }
                .into());
            }
        }
        let mut files = self.files.lock().unwrap();
        if files.contains_key(destination) && !overwrite {
            return Err(DepotError::PublicationConflict {
                path: destination.to_string(),
            }
            .into());
        }
        let data = fs::read(source).map_err(DepotError::Io)?;
        if files.insert(destination.to_string(), data).is_none() {
            self.created.lock().unwrap().push(destination.to_string());
        }
        Ok(())
    }

    fn resource_exists(&self, path: &str) -> DepotResult<bool> {
        self.events.lock().unwrap().push(format!("probe {path}"));
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    fn open_read(&self, path: &str) -> DepotResult<Option<Box<dyn Read + Send>>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(path)
            .map(|data| Box::new(Cursor::new(data.clone())) as Box<dyn Read + Send>))
    }

    fn commit_publish_transaction(&self) -> DepotResult<()> {
        self.events.lock().unwrap().push("commit".to_string());
        Ok(())
    }

    fn abort_publish_transaction(&self) -> DepotResult<()> {
        self.events.lock().unwrap().push("abort".to_string());
        let mut files = self.files.lock().unwrap();
        for path in self.created.lock().unwrap().drain(..) {
            files.remove(&path);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Writes `<file>.asc` containing a fake signature.
struct FakeSigner;

impl Signer for FakeSigner {
    fn sign(&self, file: &Path) -> DepotResult<PathBuf> {
        let output = signature_path(file);
        fs::write(&output, b"-----BEGIN PGP SIGNATURE-----").map_err(DepotError::Io)?;
        Ok(output)
    }
}

fn at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, second).unwrap()
}

fn module(coords: &str) -> VersionedModule {
    VersionedModule::parse(coords).unwrap()
}

fn jar_publication(dir: &Path) -> Publication {
    let jar = dir.join("a.jar");
    fs::write(&jar, b"jar bytes").unwrap();
    Publication::of(jar).unwrap()
}

fn with_sources(dir: &Path) -> Publication {
    let sources = dir.join("a-sources.jar");
    fs::write(&sources, b"sources bytes").unwrap();
    jar_publication(dir).and(sources, "sources").unwrap()
}

fn deps() -> DependencySet {
    DependencySet::new()
        .and_module("g:b:2.0", &[scopes::compile()])
        .unwrap()
}

fn memory_repo(layout: RepoLayout) -> (Arc<MemoryTransport>, PublishRepository) {
    let transport = Arc::new(MemoryTransport::default());
    let repo = PublishRepository::new("mem", layout, transport.clone());
    (transport, repo)
}

#[test]
fn test_unique_snapshot_build_numbers_increase() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, repo) = memory_repo(RepoLayout::Maven);
    let repo = repo.with_unique_snapshot(true);
    let publisher = MavenPublisher::new(&repo, None).unwrap();
    let module = module("g:a:1.0-SNAPSHOT");
    let publication = jar_publication(dir.path());

    publisher.publish_at(&module, &publication, &deps(), at(5)).unwrap();
    let paths = transport.paths();
    assert!(paths.contains(&"g/a/1.0-SNAPSHOT/a-1.0-20240102.030405-1.jar".to_string()));
    assert!(paths.contains(&"g/a/1.0-SNAPSHOT/a-1.0-20240102.030405-1.pom".to_string()));
    let first = MavenMetadata::parse(&transport.text("g/a/1.0-SNAPSHOT/maven-metadata.xml")).unwrap();
    assert_eq!(first.current_build_number(), 1);

    publisher.publish_at(&module, &publication, &deps(), at(6)).unwrap();
    assert!(transport
        .paths()
        .contains(&"g/a/1.0-SNAPSHOT/a-1.0-20240102.030406-2.jar".to_string()));
    let second = MavenMetadata::parse(&transport.text("g/a/1.0-SNAPSHOT/maven-metadata.xml")).unwrap();
    assert_eq!(second.current_build_number(), 2);
    assert_eq!(second.unique_version().as_deref(), Some("1.0-20240102.030406-2"));
    let extensions: Vec<&str> = second
        .versioning
        .snapshot_versions
        .iter()
        .map(|v| v.extension.as_str())
        .collect();
    assert_eq!(extensions, vec!["jar", "pom"]);
}

#[test]
fn test_unique_snapshot_skips_module_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, repo) = memory_repo(RepoLayout::Maven);
    let repo = repo.with_unique_snapshot(true);
    MavenPublisher::new(&repo, None)
        .unwrap()
        .publish_at(&module("g:a:1.0-SNAPSHOT"), &jar_publication(dir.path()), &deps(), at(5))
        .unwrap();
    assert!(!transport.paths().contains(&"g/a/maven-metadata.xml".to_string()));
}

#[test]
fn test_second_release_is_rejected_before_any_push() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, repo) = memory_repo(RepoLayout::Maven);
    let publisher = MavenPublisher::new(&repo, None).unwrap();
    let module = module("g:a:1.0");
    let publication = jar_publication(dir.path());

    publisher.publish_at(&module, &publication, &deps(), at(1)).unwrap();
    let pushes = transport.push_count();

    let err = publisher.publish_at(&module, &publication, &deps(), at(2)).unwrap_err();
    assert!(err.to_string().contains("g/a/1.0/a-1.0.jar"), "{err}");
    assert_eq!(transport.push_count(), pushes);
    assert_eq!(transport.events().iter().filter(|e| e.starts_with("begin")).count(), 1);
}

#[test]
fn test_release_probe_covers_classified_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, repo) = memory_repo(RepoLayout::Maven);
    let publisher = MavenPublisher::new(&repo, None).unwrap();
    let module = module("g:a:1.0");

    let sources = dir.path().join("other-sources.jar");
    fs::write(&sources, b"s").unwrap();
    let only_sources = Publication::new()
        .and(sources, "sources")
        .unwrap();
    publisher.publish_at(&module, &only_sources, &deps(), at(1)).unwrap();

    let err = publisher
        .publish_at(&module, &with_sources(dir.path()), &deps(), at(2))
        .unwrap_err();
    assert!(err.to_string().contains("g/a/1.0/a-1.0-sources.jar"), "{err}");
}

#[test]
fn test_release_on_filesystem_repository_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let repo_dir = tempfile::tempdir().unwrap();
    let repo = PublishRepository::new("fs", RepoLayout::Maven, Arc::new(FsTransport::new(repo_dir.path())));
    let publisher = MavenPublisher::new(&repo, None).unwrap();
    let module = module("g:a:1.0");
    let publication = jar_publication(dir.path());

    publisher.publish_at(&module, &publication, &deps(), at(1)).unwrap();
    assert!(repo_dir.path().join("g/a/1.0/a-1.0.jar").is_file());
    assert!(repo_dir.path().join("g/a/1.0/a-1.0.pom").is_file());
    assert!(repo_dir.path().join("g/a/maven-metadata.xml").is_file());

    let err = publisher.publish_at(&module, &publication, &deps(), at(2)).unwrap_err();
    assert!(err.to_string().contains("g/a/1.0/a-1.0.jar"));
}

#[test]
fn test_plain_snapshot_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, repo) = memory_repo(RepoLayout::Maven);
    let publisher = MavenPublisher::new(&repo, None).unwrap();
    let module = module("g:a:1.0-SNAPSHOT");
    let publication = jar_publication(dir.path());

    publisher.publish_at(&module, &publication, &deps(), at(1)).unwrap();
    publisher.publish_at(&module, &publication, &deps(), at(2)).unwrap();
    assert!(transport
        .paths()
        .contains(&"g/a/1.0-SNAPSHOT/a-1.0-SNAPSHOT.jar".to_string()));
    assert!(!transport.events().iter().any(|e| e.starts_with("probe")));
}

#[test]
fn test_checksum_sidecars_for_artifacts_and_pom() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, repo) = memory_repo(RepoLayout::Maven);
    let repo = repo.with_checksums(vec![ChecksumAlgorithm::Sha1, ChecksumAlgorithm::Sha256]);
    MavenPublisher::new(&repo, None)
        .unwrap()
        .publish_at(&module("g:a:1.0"), &jar_publication(dir.path()), &deps(), at(1))
        .unwrap();

    assert_eq!(
        transport.text("g/a/1.0/a-1.0.jar.sha1"),
        digest_bytes(b"jar bytes", ChecksumAlgorithm::Sha1)
    );
    assert_eq!(
        transport.text("g/a/1.0/a-1.0.jar.sha256"),
        digest_bytes(b"jar bytes", ChecksumAlgorithm::Sha256)
    );
    let pom = transport.text("g/a/1.0/a-1.0.pom");
    assert_eq!(
        transport.text("g/a/1.0/a-1.0.pom.sha1"),
        digest_bytes(pom.as_bytes(), ChecksumAlgorithm::Sha1)
    );
    assert!(!transport.paths().iter().any(|p| p.ends_with(".md5")));
}

#[test]
fn test_generated_pom_lists_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, repo) = memory_repo(RepoLayout::Maven);
    MavenPublisher::new(&repo, None)
        .unwrap()
        .publish_at(&module("g:a:1.0"), &jar_publication(dir.path()), &deps(), at(1))
        .unwrap();
    let pom = transport.text("g/a/1.0/a-1.0.pom");
    assert!(pom.contains("<artifactId>a</artifactId>"));
    assert!(pom.contains("<packaging>jar</packaging>"));
    assert!(pom.contains("<artifactId>b</artifactId>"));
}

#[test]
fn test_module_metadata_lists_versions() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, repo) = memory_repo(RepoLayout::Maven);
    let publisher = MavenPublisher::new(&repo, None).unwrap();
    publisher
        .publish_at(&module("g:a:1.1"), &jar_publication(dir.path()), &deps(), at(1))
        .unwrap();
    publisher
        .publish_at(&module("g:a:1.0"), &jar_publication(dir.path()), &deps(), at(2))
        .unwrap();

    let metadata = MavenMetadata::parse(&transport.text("g/a/maven-metadata.xml")).unwrap();
    assert_eq!(metadata.versioning.versions, vec!["1.0", "1.1"]);
    assert_eq!(metadata.versioning.last_update.as_deref(), Some("20240102030402"));
    assert!(transport.paths().contains(&"g/a/maven-metadata.xml.sha1".to_string()));
}

#[test]
fn test_failure_aborts_and_propagates_original_error() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::failing_on(".pom"));
    let repo = PublishRepository::new("mem", RepoLayout::Maven, transport.clone());
    let err = MavenPublisher::new(&repo, None)
        .unwrap()
        .publish_at(&module("g:a:1.0"), &jar_publication(dir.path()), &deps(), at(1))
        .unwrap_err();

    assert!(err.to_string().contains("connection reset writing g/a/1.0/a-1.0.pom"), "{err}");
    let events = transport.events();
    assert_eq!(events.last().map(String::as_str), Some("abort"));
    assert!(!events.iter().any(|e| e == "commit"));
    assert!(transport.paths().is_empty());
}

#[test]
fn test_signatures_are_pushed_but_not_signed_again() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, repo) = memory_repo(RepoLayout::Maven);
    let repo = repo.with_signing(true);
    MavenPublisher::new(&repo, Some(&FakeSigner))
        .unwrap()
        .publish_at(&module("g:a:1.0"), &jar_publication(dir.path()), &deps(), at(1))
        .unwrap();

    let paths = transport.paths();
    assert!(paths.contains(&"g/a/1.0/a-1.0.jar.asc".to_string()));
    assert!(paths.contains(&"g/a/1.0/a-1.0.jar.asc.sha1".to_string()));
    assert!(paths.contains(&"g/a/1.0/a-1.0.pom.asc".to_string()));
    assert!(!paths.iter().any(|p| p.ends_with(".asc.asc")));
    assert!(!paths.iter().any(|p| p.ends_with(".sha1.asc")));
}

#[test]
fn test_signing_repository_requires_signer() {
    let (_, repo) = memory_repo(RepoLayout::Maven);
    let repo = repo.with_signing(true);
    assert!(MavenPublisher::new(&repo, None).is_err());
}

#[test]
fn test_ivy_publication_layout() {
    let dir = tempfile::tempdir().unwrap();
    let repo_dir = tempfile::tempdir().unwrap();
    let repo = PublishRepository::new("ivy", RepoLayout::Ivy, Arc::new(FsTransport::new(repo_dir.path())));
    IvyPublisher::new(&repo, None)
        .unwrap()
        .publish(
            &module("g:a:1.0"),
            &with_sources(dir.path()),
            &deps(),
            &scopes::default_mapping(),
            at(9),
        )
        .unwrap();

    assert!(repo_dir.path().join("g/a/jars/a-1.0.jar").is_file());
    assert!(repo_dir.path().join("g/a/jars/a-1.0-sources.jar").is_file());
    assert!(repo_dir.path().join("g/a/jars/a-1.0.jar.sha1").is_file());
    let descriptor = fs::read_to_string(repo_dir.path().join("g/a/ivy-1.0.xml")).unwrap();
    assert!(descriptor.contains(r#"publication="20240102030409""#));
    assert!(descriptor.contains(r#"<dependency org="g" name="b" rev="2.0""#));
}

#[test]
fn test_ivy_release_conflict_on_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, repo) = memory_repo(RepoLayout::Ivy);
    let repo = repo.with_artifact_pattern("[organisation]/[module]/[revision]/[artifact](-[classifier]).[ext]");
    let publisher = IvyPublisher::new(&repo, None).unwrap();
    let mapping = scopes::default_mapping();
    publisher
        .publish(&module("g:a:1.0"), &jar_publication(dir.path()), &deps(), &mapping, at(1))
        .unwrap();
    assert!(transport.paths().contains(&"g/a/1.0/a.jar".to_string()));

    let err = publisher
        .publish(&module("g:a:1.0"), &jar_publication(dir.path()), &deps(), &mapping, at(2))
        .unwrap_err();
    assert!(err.to_string().contains("g/a/1.0/a.jar"));
}

#[test]
fn test_publisher_routes_by_layout_and_filter() {
    let dir = tempfile::tempdir().unwrap();
    let (maven_transport, maven) = memory_repo(RepoLayout::Maven);
    let (other_transport, other) = memory_repo(RepoLayout::Maven);
    let other = other.with_filter(&["com.acme"]).unwrap();
    let publisher = Publisher::new(vec![maven, other]);

    assert!(publisher.has_maven_publish_repo());
    assert!(!publisher.has_ivy_publish_repo());

    publisher
        .publish_maven_at(&module("g:a:1.0"), &jar_publication(dir.path()), &deps(), at(1))
        .unwrap();
    assert!(maven_transport.paths().contains(&"g/a/1.0/a-1.0.jar".to_string()));
    assert!(other_transport.paths().is_empty());

    let err = publisher
        .publish_ivy(
            &module("g:a:1.0"),
            &jar_publication(dir.path()),
            &deps(),
            &scopes::default_mapping(),
            at(1),
        )
        .unwrap_err();
    assert!(err.to_string().contains("No Ivy publish repository"));
}

#[test]
fn test_missing_artifact_file_fails_without_transaction() {
    let (transport, repo) = memory_repo(RepoLayout::Maven);
    let publication = Publication::of("/nonexistent/depot/a.jar").unwrap();
    assert!(MavenPublisher::new(&repo, None)
        .unwrap()
        .publish_at(&module("g:a:1.0"), &publication, &deps(), at(1))
        .is_err());
    assert!(transport.events().is_empty());
}
