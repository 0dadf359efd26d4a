use std::collections::BTreeMap;

use crate::dependency::ModuleDependency;
use crate::module::{ModuleId, VersionedModule};
use crate::version::Version;

/// Versions to use for modules declared without one, or with a
/// dynamic-resolvable range.
///
/// A provider never replaces an explicitly pinned static version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionProvider {
    versions: BTreeMap<ModuleId, Version>,
}

impl VersionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(module_id: ModuleId, version: impl Into<Version>) -> Self {
        Self::new().with(module_id, version)
    }

    /// Same provider with one more entry; an existing entry is replaced.
    pub fn with(&self, module_id: ModuleId, version: impl Into<Version>) -> Self {
        let mut versions = self.versions.clone();
        versions.insert(module_id, version.into());
        Self { versions }
    }

    /// Entries of both providers; `other` wins on collision.
    pub fn and(&self, other: &VersionProvider) -> Self {
        let mut versions = self.versions.clone();
        versions.extend(other.versions.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { versions }
    }

    pub fn get_version_of(&self, module_id: &ModuleId) -> Option<&Version> {
        self.versions.get(module_id)
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.versions.keys()
    }

    pub fn to_versioned_modules(&self) -> Vec<VersionedModule> {
        self.versions
            .iter()
            .map(|(id, v)| id.with_version(v.clone()))
            .collect()
    }

    /// `dependency` with its version filled in if it had none and this
    /// provider knows one.
    pub fn version(&self, dependency: &ModuleDependency) -> ModuleDependency {
        match self.versions.get(dependency.module_id()) {
            Some(version) if dependency.version().is_unspecified() => dependency
                .clone()
                .with_version(version.clone().into()),
            _ => dependency.clone(),
        }
    }
}

impl FromIterator<VersionedModule> for VersionProvider {
    fn from_iter<T: IntoIterator<Item = VersionedModule>>(iter: T) -> Self {
        Self {
            versions: iter
                .into_iter()
                .map(|m| (m.module_id().clone(), m.version().clone()))
                .collect(),
        }
    }
}
