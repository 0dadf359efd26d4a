//! The seam between the coordinator and the engine walking module graphs.

use std::path::PathBuf;

use depot_core::dependency::ModuleDependency;
use depot_core::dependency_set::DependencySet;
use depot_core::module::{ModuleId, VersionedModule};
use depot_core::scope::{Scope, ScopeMapping};
use depot_core::version::Version;
use depot_core::version_provider::VersionProvider;
use depot_util::errors::DepotResult;

use crate::node::DependencyNode;
use crate::report::ModuleProblem;

const ANONYMOUS_GROUP: &str = "anonymousGroup";
const ANONYMOUS_NAME: &str = "anonymousName";

/// Options applying to a whole resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolutionParameters {
    default_scopes: Vec<Scope>,
    default_mapping: Option<ScopeMapping>,
    refresh: bool,
}

impl ResolutionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scopes given to dependencies declared without any.
    pub fn with_default_scopes(mut self, scopes: &[Scope]) -> Self {
        self.default_scopes = scopes.to_vec();
        self
    }

    /// Mapping given to module dependencies declared without scope.
    /// Default scopes, when also set, take precedence.
    pub fn with_default_mapping(mut self, mapping: ScopeMapping) -> Self {
        self.default_mapping = Some(mapping);
        self
    }

    /// Ignore cached files and resolutions.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn default_scopes(&self) -> &[Scope] {
        &self.default_scopes
    }

    pub fn default_mapping(&self) -> Option<&ScopeMapping> {
        self.default_mapping.as_ref()
    }

    pub fn is_refresh(&self) -> bool {
        self.refresh
    }
}

/// The modules resolved for one requested scope.
#[derive(Debug, Clone)]
pub struct ScopeResolution {
    /// `None` for the all-scopes wildcard.
    pub scope: Option<Scope>,
    /// Module nodes carry their artifact files.
    pub tree: DependencyNode,
}

#[derive(Debug, Clone)]
pub struct ModuleResolution {
    /// One entry per requested scope, in request order.
    pub per_scope: Vec<ScopeResolution>,
    pub unresolved: Vec<ModuleProblem>,
}

/// An engine resolving module dependencies transitively.
pub trait ModuleResolver: Send + Sync {
    /// Resolves the module dependencies of `dependencies` for each of
    /// `scopes`; an empty slice means every scope at once. Versions in
    /// `overrides` replace unspecified and dynamic ranges. Modules that
    /// cannot be satisfied are reported, not raised.
    fn resolve(
        &self,
        identity: &VersionedModule,
        dependencies: &DependencySet,
        parameters: &ResolutionParameters,
        overrides: &VersionProvider,
        scopes: &[Scope],
    ) -> DepotResult<ModuleResolution>;

    /// Downloads the artifact of one module, without its dependencies.
    fn fetch_single(&self, dependency: &ModuleDependency) -> DepotResult<PathBuf>;

    /// Forgets whatever was cached for `identity`.
    fn invalidate_cache(&self, identity: &VersionedModule);
}

/// A throwaway identity for resolutions made on nobody's behalf.
pub fn anonymous_identity() -> DepotResult<VersionedModule> {
    let id = ModuleId::new(ANONYMOUS_GROUP, ANONYMOUS_NAME)?;
    Ok(id.with_version(Version::new(uuid::Uuid::new_v4().to_string())))
}
