//! The immutable, ordered set of dependencies a project declares.
//!
//! Every "mutator" returns a new set; declaration order is kept because it
//! drives the order of the resolved artifact list.

use std::path::PathBuf;

use depot_util::errors::DepotError;

use crate::dependency::{
    Dependency, Exclude, FileDependency, ModuleDependency, ScopeBinding, ScopedDependency,
};
use crate::module::ModuleId;
use crate::scope::{involved_scopes, scopes, Scope, ScopeMapping};
use crate::version::VersionRange;
use crate::version_provider::VersionProvider;

#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    dependencies: Vec<ScopedDependency>,
    global_exclusions: Vec<Exclude>,
    version_provider: VersionProvider,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(dependencies: impl IntoIterator<Item = ScopedDependency>) -> Self {
        Self {
            dependencies: dependencies.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Parse a flat description, one module per line.
    ///
    /// A line starting with `-` lists the scopes (space separated) for the
    /// lines that follow; until the first such line, modules are bound to
    /// compile and runtime.
    ///
    /// ```text
    /// - COMPILE RUNTIME
    /// org.example:core:1.0
    /// - TEST
    /// org.example:test-kit:2.1
    /// ```
    pub fn of_text_description(text: &str) -> Result<Self, DepotError> {
        let mut current = vec![scopes::compile(), scopes::runtime()];
        let mut dependencies = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(payload) = line.strip_prefix('-') {
                current = payload
                    .split_whitespace()
                    .map(|item| scopes::by_name(item).map_or_else(|| Scope::of(item), Ok))
                    .collect::<Result<Vec<_>, _>>()?;
                continue;
            }
            let dependency = ModuleDependency::parse(line)?;
            dependencies.push(ScopedDependency::with_scopes(dependency, &current));
        }
        Ok(Self::of(dependencies))
    }

    pub fn dependencies(&self) -> &[ScopedDependency] {
        &self.dependencies
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopedDependency> {
        self.dependencies.iter()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn global_exclusions(&self) -> &[Exclude] {
        &self.global_exclusions
    }

    pub fn version_provider(&self) -> &VersionProvider {
        &self.version_provider
    }

    fn with_dependencies(&self, dependencies: Vec<ScopedDependency>) -> Self {
        Self {
            dependencies,
            global_exclusions: self.global_exclusions.clone(),
            version_provider: self.version_provider.clone(),
        }
    }

    /// Append a dependency. Repeated modules are kept: their bindings add up.
    pub fn and(&self, dependency: ScopedDependency) -> Self {
        let mut dependencies = self.dependencies.clone();
        dependencies.push(dependency);
        self.with_dependencies(dependencies)
    }

    /// Append every dependency of `other`, and merge its exclusions and versions.
    pub fn and_set(&self, other: &DependencySet) -> Self {
        let mut result = self.clone();
        result.dependencies.extend(other.dependencies.iter().cloned());
        for exclude in &other.global_exclusions {
            if !result.global_exclusions.contains(exclude) {
                result.global_exclusions.push(exclude.clone());
            }
        }
        result.version_provider = result.version_provider.and(&other.version_provider);
        result
    }

    /// Append `dependency` bound to `scopes` (unset if empty).
    pub fn and_dependency(&self, dependency: impl Into<Dependency>, scopes: &[Scope]) -> Self {
        self.and(ScopedDependency::with_scopes(dependency, scopes))
    }

    /// Append the module described by `description` (see [`ModuleDependency::parse`]).
    pub fn and_module(&self, description: &str, scopes: &[Scope]) -> Result<Self, DepotError> {
        Ok(self.and_dependency(ModuleDependency::parse(description)?, scopes))
    }

    /// Append a module bound through a scope mapping.
    pub fn and_mapped(&self, dependency: ModuleDependency, mapping: ScopeMapping) -> Self {
        self.and(ScopedDependency::with_mapping(dependency, mapping))
    }

    pub fn and_files(
        &self,
        files: impl IntoIterator<Item = impl Into<PathBuf>>,
        scopes: &[Scope],
    ) -> Self {
        self.and_dependency(FileDependency::of(files), scopes)
    }

    /// Bind every unscoped dependency to `scopes`.
    pub fn with_default_scopes(&self, scopes: &[Scope]) -> Self {
        if scopes.is_empty() {
            return self.clone();
        }
        self.rebind_unset(ScopeBinding::Scopes(scopes.to_vec()))
    }

    /// Bind every unscoped module dependency to `mapping`.
    pub fn with_default_mapping(&self, mapping: &ScopeMapping) -> Self {
        self.rebind_unset(ScopeBinding::Mapping(mapping.clone()))
    }

    fn rebind_unset(&self, binding: ScopeBinding) -> Self {
        let dependencies = self
            .dependencies
            .iter()
            .map(|d| {
                if d.is_unset() {
                    d.with_binding(binding.clone())
                } else {
                    d.clone()
                }
            })
            .collect();
        self.with_dependencies(dependencies)
    }

    /// First declaration of `module_id`.
    pub fn get(&self, module_id: &ModuleId) -> Option<&ScopedDependency> {
        self.dependencies.iter().find(|d| {
            d.module_dependency()
                .is_some_and(|m| m.module_id() == module_id)
        })
    }

    /// Declared version, else the version provider's, else unspecified.
    pub fn version_of(&self, module_id: &ModuleId) -> VersionRange {
        if let Some(declared) = self.get(module_id).and_then(|d| d.module_dependency()) {
            if !declared.version().is_unspecified() {
                return declared.version().clone();
            }
        }
        self.version_provider
            .get_version_of(module_id)
            .map(|v| VersionRange::from(v.clone()))
            .unwrap_or_else(VersionRange::unspecified)
    }

    /// Exclude a module from every transitive closure. Idempotent.
    pub fn with_global_exclusion(&self, exclude: Exclude) -> Self {
        let mut result = self.clone();
        if !result.global_exclusions.contains(&exclude) {
            result.global_exclusions.push(exclude);
        }
        result
    }

    /// Exclude a module from the transitive closure of `module_id` only.
    pub fn with_local_exclusion(&self, module_id: &ModuleId, exclude: Exclude) -> Self {
        self.map_modules(|m| {
            if m.module_id() == module_id {
                m.clone().and_exclude([exclude.clone()])
            } else {
                m.clone()
            }
        })
    }

    pub fn with_version_provider(&self, provider: VersionProvider) -> Self {
        let mut result = self.clone();
        result.version_provider = provider;
        result
    }

    pub fn and_version_provider(&self, provider: &VersionProvider) -> Self {
        self.with_version_provider(self.version_provider.and(provider))
    }

    /// Rewrite dynamic-resolvable ranges that `provider` has a version for.
    pub fn resolved_with(&self, provider: &VersionProvider) -> Self {
        self.map_modules(|m| match provider.get_version_of(m.module_id()) {
            Some(version) if m.version().is_dynamic_and_resolvable() => {
                m.clone().with_version(version.clone().into())
            }
            _ => m.clone(),
        })
    }

    /// Fill unspecified module versions from this set's version provider.
    pub fn to_resolved_module_versions(&self) -> Self {
        self.map_modules(|m| self.version_provider.version(m))
    }

    fn map_modules(&self, f: impl Fn(&ModuleDependency) -> ModuleDependency) -> Self {
        let dependencies = self
            .dependencies
            .iter()
            .map(|d| match d.module_dependency() {
                Some(m) => d.with_dependency(Dependency::Module(f(m))),
                None => d.clone(),
            })
            .collect();
        self.with_dependencies(dependencies)
    }

    /// Only the module dependencies.
    pub fn with_modules_only(&self) -> Self {
        self.with_dependencies(
            self.dependencies
                .iter()
                .filter(|d| d.dependency().is_module())
                .cloned()
                .collect(),
        )
    }

    pub fn module_dependencies(&self) -> impl Iterator<Item = &ModuleDependency> {
        self.dependencies.iter().filter_map(|d| d.module_dependency())
    }

    pub fn has_modules(&self) -> bool {
        self.module_dependencies().next().is_some()
    }

    pub fn has_dynamic_versions(&self) -> bool {
        self.module_dependencies().any(|m| m.version().is_dynamic())
    }

    pub fn has_dynamic_and_resolvable_versions(&self) -> bool {
        self.module_dependencies()
            .any(|m| m.version().is_dynamic_and_resolvable())
    }

    /// Every scope named by a binding, mapping targets included.
    pub fn declared_scopes(&self) -> Vec<Scope> {
        let mut result: Vec<Scope> = Vec::new();
        for scope in self.dependencies.iter().flat_map(|d| d.declared_scopes()) {
            if !result.contains(&scope) {
                result.push(scope);
            }
        }
        result
    }

    /// Ancestor closure of the scopes dependencies are bound from.
    pub fn involved_scopes(&self) -> Vec<Scope> {
        let mut bound: Vec<Scope> = Vec::new();
        for scope in self.dependencies.iter().flat_map(|d| d.binding_scopes()) {
            if !bound.contains(&scope) {
                bound.push(scope);
            }
        }
        involved_scopes(&bound)
    }

    /// Fails listing every module whose version is neither declared nor provided.
    pub fn assert_no_unspecified_version(&self) -> Result<(), DepotError> {
        let missing: Vec<String> = self
            .module_dependencies()
            .filter(|m| self.version_of(m.module_id()).is_unspecified())
            .map(|m| m.module_id().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DepotError::Declaration {
                message: format!("no version specified for {}", missing.join(", ")),
            })
        }
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a ScopedDependency;
    type IntoIter = std::slice::Iter<'a, ScopedDependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.dependencies.iter()
    }
}
