//! Resolution of whole dependency sets: scope closure, delegation of module
//! dependencies to a [`ModuleResolver`], local files merged in declaration order.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use depot_core::config::DepotConfig;
use depot_core::dependency::{Exclude, ModuleDependency, ScopedDependency};
use depot_core::dependency_set::DependencySet;
use depot_core::module::VersionedModule;
use depot_core::scope::{involved_scopes, Scope};
use depot_util::errors::{DepotError, DepotResult};

use crate::node::DependencyNode;
use crate::report::ErrorReport;
use crate::repository::RepositoryResolver;
use crate::resolver::{anonymous_identity, ModuleResolver, ResolutionParameters};
use crate::result::ResolveResult;

/// Entry point for resolving dependency sets.
#[derive(Clone)]
pub struct DependencyResolver {
    resolver: Option<Arc<dyn ModuleResolver>>,
    parameters: ResolutionParameters,
    identity: Option<VersionedModule>,
}

impl DependencyResolver {
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            resolver: Some(resolver),
            parameters: ResolutionParameters::default(),
            identity: None,
        }
    }

    /// Resolves file and computed dependencies only.
    pub fn local_only() -> Self {
        Self {
            resolver: None,
            parameters: ResolutionParameters::default(),
            identity: None,
        }
    }

    /// Backed by a [`RepositoryResolver`] over the configured repositories.
    pub fn from_config(config: &DepotConfig) -> DepotResult<Self> {
        Ok(Self::new(Arc::new(RepositoryResolver::from_config(config)?)))
    }

    pub fn with_parameters(mut self, parameters: ResolutionParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Resolve on behalf of `identity`; resolver-side caches are kept for it.
    /// Without one, each call uses a throwaway identity.
    pub fn with_identity(mut self, identity: VersionedModule) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn parameters(&self) -> &ResolutionParameters {
        &self.parameters
    }

    pub fn has_module_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    fn module_resolver(&self) -> DepotResult<&Arc<dyn ModuleResolver>> {
        self.resolver.as_ref().ok_or_else(|| {
            DepotError::Declaration {
                message: "module dependencies declared but no module resolver is configured".to_string(),
            }
            .into()
        })
    }

    fn with_defaults(&self, dependencies: &DependencySet) -> DependencySet {
        let mut result = dependencies.with_default_scopes(self.parameters.default_scopes());
        if let Some(mapping) = self.parameters.default_mapping() {
            result = result.with_default_mapping(mapping);
        }
        result
    }

    /// Resolves `dependencies` for `scopes`, all scopes when empty.
    ///
    /// Missing modules end up in the error report of the result; errors
    /// are raised only for invalid declarations, failing build actions and
    /// resolver failures.
    pub fn resolve(&self, dependencies: &DependencySet, scopes: &[Scope]) -> DepotResult<ResolveResult> {
        let dependencies = self.with_defaults(dependencies);
        warn_undeclared(&dependencies, scopes);
        let requested = involved_scopes(scopes);
        let selected: Vec<&ScopedDependency> = dependencies
            .iter()
            .filter(|d| is_requested(d, &requested))
            .collect();

        let (identity, anonymous) = match &self.identity {
            Some(identity) => (identity.clone(), false),
            None => (anonymous_identity()?, true),
        };
        let mut tree = DependencyNode::root(identity.clone());
        let mut report = ErrorReport::all_fine();

        if selected.iter().any(|d| d.dependency().is_module()) {
            let resolver = self.module_resolver()?;
            let modules = dependencies.with_modules_only().to_resolved_module_versions();
            modules.assert_no_unspecified_version()?;
            tracing::debug!(
                "Resolving {} module dependencies of {identity} for {}",
                modules.len(),
                scope_names(&requested)
            );
            let outcome = resolver.resolve(
                &identity,
                &modules,
                &self.parameters,
                modules.version_provider(),
                &requested,
            );
            if anonymous {
                resolver.invalidate_cache(&identity);
            }
            let resolution = outcome?;
            for scope_resolution in &resolution.per_scope {
                tree = tree.merge(&scope_resolution.tree);
            }
            report = ErrorReport::of(resolution.unresolved);
        }

        tree = tree.merge_non_modules(&selected)?;
        let excludes: Vec<&Exclude> = dependencies
            .global_exclusions()
            .iter()
            .filter(|e| requested.is_empty() || requested.iter().any(|s| e.applies_to(Some(s))))
            .collect();
        if !excludes.is_empty() {
            tree = tree.pruned(&excludes);
        }

        let result = ResolveResult::new(tree, report);
        tracing::info!(
            "Resolved {} dependencies for {} into {} files{}",
            selected.len(),
            scope_names(&requested),
            result.files().len(),
            if result.error_report().has_errors() {
                format!(", {} unresolved", result.error_report().len())
            } else {
                String::new()
            }
        );
        Ok(result)
    }

    /// Files of `dependencies` for `scopes`, each listed once. Fails when a
    /// module cannot be resolved.
    pub fn get(&self, dependencies: &DependencySet, scopes: &[Scope]) -> DepotResult<Vec<PathBuf>> {
        let dependencies = self.with_defaults(dependencies);
        let requested = involved_scopes(scopes);
        let selected: Vec<&ScopedDependency> = dependencies
            .iter()
            .filter(|d| is_requested(d, &requested))
            .collect();
        if selected.iter().any(|d| d.dependency().is_module()) {
            let result = self.resolve(&dependencies, scopes)?;
            return Ok(result.assert_no_error()?.files());
        }
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for dependency in selected {
            for path in dependency.dependency().local_paths()? {
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }

    /// The artifact of one module, without its dependencies.
    pub fn fetch_single(&self, dependency: &ModuleDependency) -> DepotResult<PathBuf> {
        tracing::debug!("Fetching {dependency}");
        self.module_resolver()?.fetch_single(dependency)
    }
}

/// Unscoped dependencies take part in every scope.
fn is_requested(dependency: &ScopedDependency, requested: &[Scope]) -> bool {
    requested.is_empty() || dependency.is_unset() || dependency.is_involved_in_any_of(requested)
}

fn warn_undeclared(dependencies: &DependencySet, scopes: &[Scope]) {
    for scope in scopes {
        if !dependencies.iter().any(|d| d.is_unset() || d.is_involved_in(scope)) {
            tracing::warn!("No dependencies declared with scope '{scope}'");
        }
    }
}

fn scope_names(scopes: &[Scope]) -> String {
    if scopes.is_empty() {
        return "all scopes".to_string();
    }
    scopes.iter().map(Scope::name).collect::<Vec<_>>().join(", ")
}
