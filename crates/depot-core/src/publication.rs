//! What gets published: artifact files with their classifiers, plus the
//! descriptive project information written into generated POMs.

use std::path::{Path, PathBuf};

use depot_util::errors::DepotError;
use depot_util::fs::extension_of;
use serde::{Deserialize, Serialize};

use crate::scope::Scope;

/// One file of a publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    file: PathBuf,
    classifier: Option<String>,
    artifact_type: Option<String>,
    ext: String,
    scopes: Vec<Scope>,
}

impl PublishedArtifact {
    /// Fails when the file has no extension or the classifier is blank.
    pub fn new(file: impl Into<PathBuf>, classifier: Option<&str>) -> Result<Self, DepotError> {
        let file = file.into();
        let ext = extension_of(&file).ok_or_else(|| DepotError::Declaration {
            message: format!("artifact file {} has no extension", file.display()),
        })?;
        let classifier = match classifier {
            Some(c) if c.trim().is_empty() => {
                return Err(DepotError::Declaration {
                    message: format!("blank classifier for artifact {}", file.display()),
                })
            }
            Some(c) => Some(c.trim().to_string()),
            None => None,
        };
        Ok(Self {
            file,
            classifier,
            artifact_type: None,
            ext,
            scopes: Vec::new(),
        })
    }

    /// Explicit type; defaults to the extension.
    pub fn with_type(mut self, artifact_type: &str) -> Self {
        self.artifact_type = Some(artifact_type.to_string());
        self
    }

    /// Scopes (Ivy configurations) the artifact belongs to.
    pub fn with_scopes(mut self, scopes: &[Scope]) -> Self {
        self.scopes = scopes.to_vec();
        self
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    pub fn artifact_type(&self) -> &str {
        self.artifact_type.as_deref().unwrap_or(&self.ext)
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn is_main(&self) -> bool {
        self.classifier.is_none()
    }
}

/// Artifacts to publish for one module version.
#[derive(Debug, Clone, Default)]
pub struct Publication {
    artifacts: Vec<PublishedArtifact>,
    info: Option<PublicationInfo>,
}

impl Publication {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publication whose main artifact is `file`.
    pub fn of(file: impl Into<PathBuf>) -> Result<Self, DepotError> {
        Self::new().and_artifact(PublishedArtifact::new(file, None)?)
    }

    /// Add a classified artifact.
    pub fn and(self, file: impl Into<PathBuf>, classifier: &str) -> Result<Self, DepotError> {
        self.and_artifact(PublishedArtifact::new(file, Some(classifier))?)
    }

    /// Like [`Publication::and`] but silently skips a file that does not exist.
    pub fn and_optional(self, file: impl Into<PathBuf>, classifier: &str) -> Result<Self, DepotError> {
        let file = file.into();
        if file.exists() {
            self.and(file, classifier)
        } else {
            Ok(self)
        }
    }

    /// Fails if an artifact with the same extension and classifier is present.
    pub fn and_artifact(mut self, artifact: PublishedArtifact) -> Result<Self, DepotError> {
        let duplicate = self
            .artifacts
            .iter()
            .any(|a| a.ext == artifact.ext && a.classifier == artifact.classifier);
        if duplicate {
            return Err(DepotError::Declaration {
                message: format!(
                    "publication already contains an artifact with extension '{}' and classifier '{}'",
                    artifact.ext,
                    artifact.classifier.as_deref().unwrap_or("")
                ),
            });
        }
        self.artifacts.push(artifact);
        Ok(self)
    }

    pub fn with_info(mut self, info: PublicationInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn artifacts(&self) -> &[PublishedArtifact] {
        &self.artifacts
    }

    pub fn main_artifacts(&self) -> impl Iterator<Item = &PublishedArtifact> {
        self.artifacts.iter().filter(|a| a.is_main())
    }

    pub fn classified_artifacts(&self) -> impl Iterator<Item = &PublishedArtifact> {
        self.artifacts.iter().filter(|a| !a.is_main())
    }

    pub fn info(&self) -> Option<&PublicationInfo> {
        self.info.as_ref()
    }

    /// Artifact files absent from the file system.
    pub fn missing_files(&self) -> Vec<&Path> {
        self.artifacts
            .iter()
            .map(|a| a.file())
            .filter(|f| !f.exists())
            .collect()
    }
}

/// Descriptive metadata written into generated POM files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationInfo {
    #[serde(default)]
    pub project: ProjectInfo,
    #[serde(default)]
    pub scm: Option<ScmInfo>,
    #[serde(default)]
    pub developers: Vec<DeveloperInfo>,
    #[serde(default)]
    pub licenses: Vec<LicenseInfo>,
}

impl PublicationInfo {
    pub fn with_project(mut self, name: &str, description: &str, url: &str) -> Self {
        self.project = ProjectInfo {
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            url: Some(url.to_string()),
        };
        self
    }

    pub fn with_scm(mut self, scm: ScmInfo) -> Self {
        self.scm = Some(scm);
        self
    }

    pub fn and_developer(mut self, developer: DeveloperInfo) -> Self {
        self.developers.push(developer);
        self
    }

    pub fn and_license(mut self, name: &str, url: &str) -> Self {
        self.licenses.push(LicenseInfo {
            name: name.to_string(),
            url: url.to_string(),
        });
        self
    }

    pub fn and_apache2_license(self) -> Self {
        self.and_license(
            "Apache License V2.0",
            "http://www.apache.org/licenses/LICENSE-2.0.html",
        )
    }

    pub fn and_mit_license(self) -> Self {
        self.and_license("MIT License", "http://www.opensource.org/licenses/mit-license.php")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmInfo {
    #[serde(default)]
    pub connection: Option<String>,
    #[serde(default, rename = "developer-connection")]
    pub developer_connection: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub organisation: Option<String>,
    #[serde(default, rename = "organisation-url")]
    pub organisation_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub name: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_file_without_extension() {
        assert!(Publication::of("build/LICENSE").is_err());
    }

    #[test]
    fn rejects_blank_classifier() {
        let publication = Publication::of("a.jar").unwrap();
        assert!(publication.and("a-sources.jar", " ").is_err());
    }

    #[test]
    fn rejects_duplicate_ext_and_classifier() {
        let publication = Publication::of("a.jar")
            .unwrap()
            .and("a-sources.jar", "sources")
            .unwrap();
        assert!(publication.clone().and("other-sources.jar", "sources").is_err());
        assert!(publication.and("a-sources.zip", "sources").is_ok());
    }

    #[test]
    fn optional_artifact_skipped_when_absent() {
        let publication = Publication::of("a.jar")
            .unwrap()
            .and_optional("/nonexistent/a-javadoc.jar", "javadoc")
            .unwrap();
        assert_eq!(publication.artifacts().len(), 1);
    }

    #[test]
    fn type_defaults_to_extension() {
        let artifact = PublishedArtifact::new("a.jar", None).unwrap();
        assert_eq!(artifact.artifact_type(), "jar");
        assert_eq!(artifact.with_type("bundle").artifact_type(), "bundle");
    }
}
