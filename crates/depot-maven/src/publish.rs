//! Publication engine.
//!
//! Both protocols share one transactional shape: probe release
//! destinations, begin a transaction, push every artifact with its
//! checksum sidecars and optional `.asc` signature, push the descriptor,
//! commit. Any failure aborts the transaction and the original error is
//! returned; a failing abort is only logged.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use depot_core::config::{DepotConfig, RepoLayout};
use depot_core::dependency_set::DependencySet;
use depot_core::module::VersionedModule;
use depot_core::publication::{Publication, PublishedArtifact};
use depot_core::scope::ScopeMapping;
use depot_util::errors::{DepotError, DepotResult};
use tempfile::TempDir;

use crate::checksum;
use crate::ivy;
use crate::layout::{self, IvyTokens};
use crate::metadata::MavenMetadata;
use crate::pom;
use crate::repository::PublishRepository;
use crate::signer::{GpgSigner, Signer};
use crate::transport::Transport;

/// `yyyyMMdd.HHmmss`, the unique snapshot timestamp.
pub fn snapshot_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d.%H%M%S").to_string()
}

/// `yyyyMMddHHmmss`, the `lastUpdated` of module-level metadata.
fn last_updated(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// Pushes files with their sidecars to one repository.
struct Pusher<'a> {
    repo: &'a PublishRepository,
    signer: Option<&'a dyn Signer>,
    overwrite: bool,
}

impl Pusher<'_> {
    fn transport(&self) -> &dyn Transport {
        self.repo.transport()
    }

    fn push_all(&self, destination: &str, source: &Path, sign: bool) -> DepotResult<()> {
        tracing::info!("Publishing {destination} to {}", self.transport().describe());
        self.transport().push(destination, source, self.overwrite)?;
        self.push_checksums(destination, source, self.overwrite)?;
        if sign {
            if let Some(signer) = self.signer {
                let signature = signer.sign(source)?;
                self.push_all(&format!("{destination}.asc"), &signature, false)?;
            }
        }
        Ok(())
    }

    fn push_checksums(&self, destination: &str, source: &Path, overwrite: bool) -> DepotResult<()> {
        for algorithm in self.repo.checksums() {
            let digest = checksum::digest_file(source, *algorithm)?;
            let mut sidecar = tempfile::NamedTempFile::new().map_err(DepotError::Io)?;
            sidecar.write_all(digest.as_bytes()).map_err(DepotError::Io)?;
            sidecar.flush().map_err(DepotError::Io)?;
            self.transport().push(
                &format!("{destination}.{}", algorithm.suffix()),
                sidecar.path(),
                overwrite,
            )?;
        }
        Ok(())
    }

    /// Fails with the first destination that already exists.
    fn probe(&self, destinations: &[String]) -> DepotResult<()> {
        for destination in destinations {
            if self.transport().resource_exists(destination)? {
                return Err(DepotError::PublicationConflict {
                    path: destination.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn in_transaction(&self, id: &str, body: impl FnOnce() -> DepotResult<()>) -> DepotResult<()> {
        let transport = self.transport();
        transport.begin_publish_transaction(id)?;
        let result = body().and_then(|()| transport.commit_publish_transaction());
        if let Err(e) = result {
            if let Err(abort) = transport.abort_publish_transaction() {
                tracing::warn!("Could not abort publication {id} on {}: {abort}", transport.describe());
            }
            return Err(e);
        }
        Ok(())
    }
}

fn check_publication(module: &VersionedModule, publication: &Publication) -> DepotResult<()> {
    if publication.artifacts().is_empty() {
        return Err(DepotError::Declaration {
            message: format!("Nothing to publish for {module}"),
        }
        .into());
    }
    let missing = publication.missing_files();
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        return Err(DepotError::Generic {
            message: format!("Cannot publish {module}, missing {}", names.join(", ")),
        }
        .into());
    }
    Ok(())
}

fn signer_for<'a>(
    repo: &PublishRepository,
    signer: Option<&'a dyn Signer>,
) -> DepotResult<Option<&'a dyn Signer>> {
    if !repo.requires_signature() {
        return Ok(None);
    }
    match signer {
        Some(signer) => Ok(Some(signer)),
        None => Err(DepotError::Config {
            message: format!(
                "Repository {} requires signed artifacts but no signer is configured",
                repo.name()
            ),
        }
        .into()),
    }
}

fn write_temp(dir: &TempDir, name: &str, content: &str) -> DepotResult<PathBuf> {
    let path = dir.path().join(name);
    std::fs::write(&path, content).map_err(DepotError::Io)?;
    Ok(path)
}

/// Publishes to a Maven-layout repository.
pub struct MavenPublisher<'a> {
    repo: &'a PublishRepository,
    signer: Option<&'a dyn Signer>,
}

impl<'a> MavenPublisher<'a> {
    /// Fails when the repository requires signing and `signer` is `None`.
    pub fn new(repo: &'a PublishRepository, signer: Option<&'a dyn Signer>) -> DepotResult<Self> {
        Ok(Self {
            repo,
            signer: signer_for(repo, signer)?,
        })
    }

    pub fn publish(
        &self,
        module: &VersionedModule,
        publication: &Publication,
        dependencies: &DependencySet,
    ) -> DepotResult<()> {
        self.publish_at(module, publication, dependencies, Utc::now())
    }

    /// Like [`MavenPublisher::publish`] with an explicit publication time.
    pub fn publish_at(
        &self,
        module: &VersionedModule,
        publication: &Publication,
        dependencies: &DependencySet,
        at: DateTime<Utc>,
    ) -> DepotResult<()> {
        check_publication(module, publication)?;
        let snapshot = module.version().is_snapshot();
        let pusher = Pusher {
            repo: self.repo,
            signer: self.signer,
            overwrite: snapshot,
        };
        if !snapshot {
            pusher.probe(&release_destinations(module, publication))?;
        }

        let timestamp = snapshot_timestamp(at);
        let mut version_metadata = if snapshot && self.repo.is_unique_snapshot() {
            Some(self.next_snapshot_build(module, &timestamp)?)
        } else {
            None
        };
        let file_version = version_metadata
            .as_ref()
            .and_then(MavenMetadata::unique_version)
            .unwrap_or_else(|| module.version().to_string());

        let packaging = publication
            .main_artifacts()
            .next()
            .map_or("pom", PublishedArtifact::ext);
        let scratch = tempfile::tempdir().map_err(DepotError::Io)?;
        let pom_xml = pom::write_pom(module, packaging, dependencies, publication.info());
        let pom_file = write_temp(
            &scratch,
            &format!("{}-{file_version}.pom", module.module_id().name()),
            &pom_xml,
        )?;

        let sign = self.signer.is_some();
        let transaction = format!("{module}@{timestamp}");
        pusher.in_transaction(&transaction, || {
            for artifact in publication.artifacts() {
                let destination =
                    layout::maven_artifact_path(module, &file_version, artifact.classifier(), artifact.ext());
                pusher.push_all(&destination, artifact.file(), sign)?;
                if let Some(metadata) = version_metadata.as_mut() {
                    metadata.add_snapshot_version(artifact.ext(), artifact.classifier());
                }
            }
            let pom_destination = layout::maven_artifact_path(module, &file_version, None, "pom");
            pusher.push_all(&pom_destination, &pom_file, sign)?;

            if let Some(metadata) = version_metadata.as_mut() {
                metadata.add_snapshot_version("pom", None);
                let file = write_temp(&scratch, layout::MAVEN_METADATA_FILE, &metadata.to_xml())?;
                let metadata_pusher = Pusher {
                    overwrite: true,
                    ..pusher
                };
                metadata_pusher.push_all(&layout::maven_version_metadata_path(module), &file, false)?;
            }
            Ok(())
        })?;

        if version_metadata.is_none() {
            self.update_module_metadata(module, &scratch, at)?;
        }
        tracing::info!("Published {module} to {}", self.repo.name());
        Ok(())
    }

    /// Version-level metadata advanced to the next build number.
    fn next_snapshot_build(&self, module: &VersionedModule, timestamp: &str) -> DepotResult<MavenMetadata> {
        let path = layout::maven_version_metadata_path(module);
        let mut metadata = match self.repo.transport().read_bytes(&path)? {
            Some(bytes) => MavenMetadata::parse(&String::from_utf8_lossy(&bytes))?,
            None => MavenMetadata::for_snapshot(module, timestamp),
        };
        if metadata.version.is_none() {
            metadata.version = Some(module.version().to_string());
        }
        metadata.update_snapshot(timestamp);
        tracing::debug!(
            "Snapshot build {} of {module}",
            metadata.current_build_number()
        );
        Ok(metadata)
    }

    /// Adds the version to the module-level metadata. Uses
    /// compare-and-swap when the transport offers it.
    fn update_module_metadata(
        &self,
        module: &VersionedModule,
        scratch: &TempDir,
        at: DateTime<Utc>,
    ) -> DepotResult<()> {
        let transport = self.repo.transport();
        let path = layout::maven_module_metadata_path(module.module_id());
        let previous = transport.read_bytes(&path)?;
        let mut metadata = match &previous {
            Some(bytes) => MavenMetadata::parse(&String::from_utf8_lossy(bytes))?,
            None => MavenMetadata::for_module(module.module_id()),
        };
        metadata.add_version(module.version().as_str(), &last_updated(at));
        let file = write_temp(scratch, layout::MAVEN_METADATA_FILE, &metadata.to_xml())?;

        if transport.supports_compare_and_swap() {
            if !transport.compare_and_swap(&path, previous.as_deref(), &file)? {
                return Err(DepotError::Transport {
                    message: format!("{path} was modified concurrently, version {} not recorded", module.version()),
                }
                .into());
            }
        } else {
            transport.push(&path, &file, true)?;
        }
        let pusher = Pusher {
            repo: self.repo,
            signer: None,
            overwrite: true,
        };
        pusher.push_checksums(&path, &file, true)
    }
}

/// Main artifacts first, then classified ones, then the POM.
fn release_destinations(module: &VersionedModule, publication: &Publication) -> Vec<String> {
    publication
        .main_artifacts()
        .chain(publication.classified_artifacts())
        .map(|a| layout::maven_release_path(module, a.classifier(), a.ext()))
        .chain(std::iter::once(layout::maven_release_path(module, None, "pom")))
        .collect()
}

/// Publishes to an Ivy-layout repository.
pub struct IvyPublisher<'a> {
    repo: &'a PublishRepository,
    signer: Option<&'a dyn Signer>,
}

impl<'a> IvyPublisher<'a> {
    /// Fails when the repository requires signing and `signer` is `None`.
    pub fn new(repo: &'a PublishRepository, signer: Option<&'a dyn Signer>) -> DepotResult<Self> {
        Ok(Self {
            repo,
            signer: signer_for(repo, signer)?,
        })
    }

    fn artifact_destination(&self, module: &VersionedModule, artifact: &PublishedArtifact) -> String {
        let tokens = IvyTokens::of(module).with_file(artifact.ext(), artifact.artifact_type(), artifact.classifier());
        layout::ivy_path(self.repo.artifact_pattern(), &tokens)
    }

    fn descriptor_destination(&self, module: &VersionedModule) -> String {
        let tokens = IvyTokens::of(module).with_file("xml", "ivy", None);
        layout::ivy_path(self.repo.ivy_pattern(), &tokens)
    }

    /// `date` is the publication date written into the descriptor.
    pub fn publish(
        &self,
        module: &VersionedModule,
        publication: &Publication,
        dependencies: &DependencySet,
        default_mapping: &ScopeMapping,
        date: DateTime<Utc>,
    ) -> DepotResult<()> {
        check_publication(module, publication)?;
        let snapshot = module.version().is_snapshot();
        let pusher = Pusher {
            repo: self.repo,
            signer: self.signer,
            overwrite: snapshot,
        };
        let descriptor_destination = self.descriptor_destination(module);
        if !snapshot {
            let mut destinations: Vec<String> = publication
                .main_artifacts()
                .chain(publication.classified_artifacts())
                .map(|a| self.artifact_destination(module, a))
                .collect();
            destinations.push(descriptor_destination.clone());
            pusher.probe(&destinations)?;
        }

        let scratch = tempfile::tempdir().map_err(DepotError::Io)?;
        let descriptor = ivy::write_ivy_xml(module, publication, dependencies, default_mapping, date);
        let descriptor_file = write_temp(&scratch, &format!("ivy-{}.xml", module.version()), &descriptor)?;

        let sign = self.signer.is_some();
        let transaction = format!("{module}@{}", ivy::publication_date(date));
        pusher.in_transaction(&transaction, || {
            for artifact in publication.artifacts() {
                pusher.push_all(&self.artifact_destination(module, artifact), artifact.file(), sign)?;
            }
            pusher.push_all(&descriptor_destination, &descriptor_file, sign)
        })?;
        tracing::info!("Published {module} to {}", self.repo.name());
        Ok(())
    }
}

/// Publishes to every configured repository of the matching layout whose
/// filter accepts the module.
#[derive(Default)]
pub struct Publisher {
    repositories: Vec<PublishRepository>,
    signer: Option<Arc<dyn Signer>>,
}

impl Publisher {
    pub fn new(repositories: Vec<PublishRepository>) -> Self {
        Self {
            repositories,
            signer: None,
        }
    }

    /// Repositories from `[publish.*]`, signing through `[signing]` when present.
    pub fn from_config(config: &DepotConfig) -> DepotResult<Self> {
        let repositories = config
            .publish
            .iter()
            .map(|(name, repo)| PublishRepository::from_config(name, repo))
            .collect::<DepotResult<Vec<_>>>()?;
        let mut publisher = Self::new(repositories);
        if let Some(signing) = &config.signing {
            publisher = publisher.with_signer(Arc::new(GpgSigner::from_config(signing)));
        }
        Ok(publisher)
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn repositories(&self) -> &[PublishRepository] {
        &self.repositories
    }

    pub fn has_maven_publish_repo(&self) -> bool {
        self.repositories.iter().any(|r| r.layout() == RepoLayout::Maven)
    }

    pub fn has_ivy_publish_repo(&self) -> bool {
        self.repositories.iter().any(|r| r.layout() == RepoLayout::Ivy)
    }

    fn targets(&self, layout: RepoLayout, module: &VersionedModule) -> DepotResult<Vec<&PublishRepository>> {
        let targets: Vec<&PublishRepository> = self
            .repositories
            .iter()
            .filter(|r| r.layout() == layout)
            .filter(|r| {
                let accepted = r.accepts(module.module_id());
                if !accepted {
                    tracing::debug!("Repository {} does not accept {module}", r.name());
                }
                accepted
            })
            .collect();
        if targets.is_empty() {
            return Err(DepotError::Config {
                message: format!("No {layout:?} publish repository accepts {module}"),
            }
            .into());
        }
        Ok(targets)
    }

    pub fn publish_maven(
        &self,
        module: &VersionedModule,
        publication: &Publication,
        dependencies: &DependencySet,
    ) -> DepotResult<()> {
        self.publish_maven_at(module, publication, dependencies, Utc::now())
    }

    pub fn publish_maven_at(
        &self,
        module: &VersionedModule,
        publication: &Publication,
        dependencies: &DependencySet,
        at: DateTime<Utc>,
    ) -> DepotResult<()> {
        for repo in self.targets(RepoLayout::Maven, module)? {
            MavenPublisher::new(repo, self.signer.as_deref())?.publish_at(module, publication, dependencies, at)?;
        }
        Ok(())
    }

    pub fn publish_ivy(
        &self,
        module: &VersionedModule,
        publication: &Publication,
        dependencies: &DependencySet,
        default_mapping: &ScopeMapping,
        date: DateTime<Utc>,
    ) -> DepotResult<()> {
        for repo in self.targets(RepoLayout::Ivy, module)? {
            IvyPublisher::new(repo, self.signer.as_deref())?.publish(
                module,
                publication,
                dependencies,
                default_mapping,
                date,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(snapshot_timestamp(at), "20240102.030405");
        assert_eq!(last_updated(at), "20240102030405");
    }

    #[test]
    fn release_destinations_order() {
        let module = VersionedModule::parse("g:a:1.0").unwrap();
        let publication = Publication::of("a-sources.zip")
            .unwrap()
            .and("a-doc.jar", "javadoc")
            .unwrap()
            .and_artifact(PublishedArtifact::new("a.jar", None).unwrap())
            .unwrap();
        assert_eq!(
            release_destinations(&module, &publication),
            vec![
                "g/a/1.0/a-1.0.zip",
                "g/a/1.0/a-1.0.jar",
                "g/a/1.0/a-1.0-javadoc.jar",
                "g/a/1.0/a-1.0.pom",
            ]
        );
    }
}
