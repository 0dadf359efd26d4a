//! Dependency value types: module, file and computed dependencies, exclusions,
//! and their scope binding.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use depot_util::errors::{DepotError, DepotResult};
use depot_util::fs::{dedup_paths, is_empty_dir};
use depot_util::process::CommandBuilder;

use crate::module::ModuleId;
use crate::scope::{Scope, ScopeMapping};
use crate::version::VersionRange;

/// A rule removing a module from a transitive closure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Exclude {
    module_id: ModuleId,
    artifact_type: Option<String>,
    ext: Option<String>,
    scopes: Vec<Scope>,
}

impl Exclude {
    pub fn of(module_id: ModuleId) -> Self {
        Self {
            module_id,
            artifact_type: None,
            ext: None,
            scopes: Vec::new(),
        }
    }

    /// Parse `"group:name"`.
    pub fn parse(s: &str) -> Result<Self, DepotError> {
        ModuleId::parse(s).map(Self::of)
    }

    pub fn with_type(mut self, artifact_type: &str) -> Self {
        self.artifact_type = Some(artifact_type.to_string());
        self
    }

    pub fn with_ext(mut self, ext: &str) -> Self {
        self.ext = Some(ext.to_string());
        self
    }

    /// Restrict the exclusion to the given scopes.
    pub fn with_scopes(mut self, scopes: &[Scope]) -> Self {
        self.scopes = scopes.to_vec();
        self
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    pub fn artifact_type(&self) -> Option<&str> {
        self.artifact_type.as_deref()
    }

    pub fn ext(&self) -> Option<&str> {
        self.ext.as_deref()
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Whether this rule is active when resolving `scope` (`None` = every scope).
    pub fn applies_to(&self, scope: Option<&Scope>) -> bool {
        match scope {
            _ if self.scopes.is_empty() => true,
            None => true,
            Some(scope) => scope.is_in_or_extending_any_of(&self.scopes),
        }
    }

    /// Whether this rule designates `module_id`. `*` matches any group or name.
    pub fn matches(&self, module_id: &ModuleId) -> bool {
        let group = self.module_id.group();
        let name = self.module_id.name();
        (group == "*" || group == module_id.group()) && (name == "*" || name == module_id.name())
    }

    /// Restricted to some artifact extensions or types rather than the whole module.
    pub fn is_partial(&self) -> bool {
        self.ext.is_some() || self.artifact_type.is_some()
    }
}

/// A dependency resolved from a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDependency {
    module_id: ModuleId,
    version: VersionRange,
    classifier: Option<String>,
    artifact_type: Option<String>,
    ext: Option<String>,
    transitive: bool,
    exclusions: Vec<Exclude>,
}

impl ModuleDependency {
    pub fn of(module_id: ModuleId, version: VersionRange) -> Self {
        Self {
            module_id,
            version,
            classifier: None,
            artifact_type: None,
            ext: None,
            transitive: true,
            exclusions: Vec::new(),
        }
    }

    /// Parse a module description.
    ///
    /// Accepted forms: `group:name`, `group:name:version`,
    /// `group:name:classifier:version`, `group:name:classifier:type:version`,
    /// each optionally followed by `@ext`. A `?` version means unspecified.
    pub fn parse(description: &str) -> Result<Self, DepotError> {
        let malformed = || DepotError::Declaration {
            message: format!(
                "dependency description '{description}' is not correct, expected one of \
                 group:name, group:name:version, group:name:classifier:version, \
                 group:name:classifier:type:version ('?' for an unspecified version)"
            ),
        };
        let (coordinates, ext) = match description.trim().split_once('@') {
            Some((coordinates, ext)) if !ext.trim().is_empty() => (coordinates, Some(ext.trim())),
            Some(_) => return Err(malformed()),
            None => (description.trim(), None),
        };
        let parts: Vec<&str> = coordinates.split(':').map(str::trim).collect();
        if !(2..=5).contains(&parts.len()) {
            return Err(malformed());
        }
        let module_id = ModuleId::new(parts[0], parts[1]).map_err(|_| malformed())?;
        let version = match parts.len() {
            2 => None,
            n => Some(parts[n - 1]),
        };
        let version = match version {
            None | Some("?") => VersionRange::unspecified(),
            Some(v) => VersionRange::of(v)?,
        };
        let mut dependency = Self::of(module_id, version);
        if parts.len() >= 4 && !parts[2].is_empty() {
            dependency.classifier = Some(parts[2].to_string());
        }
        if parts.len() == 5 && !parts[3].is_empty() {
            dependency.artifact_type = Some(parts[3].to_string());
        }
        dependency.ext = ext.map(str::to_string);
        Ok(dependency)
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    pub fn version(&self) -> &VersionRange {
        &self.version
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn artifact_type(&self) -> Option<&str> {
        self.artifact_type.as_deref()
    }

    pub fn ext(&self) -> Option<&str> {
        self.ext.as_deref()
    }

    pub fn is_transitive(&self) -> bool {
        self.transitive
    }

    pub fn exclusions(&self) -> &[Exclude] {
        &self.exclusions
    }

    pub fn with_version(mut self, version: VersionRange) -> Self {
        self.version = version;
        self
    }

    pub fn with_classifier(mut self, classifier: &str) -> Self {
        self.classifier = Some(classifier.to_string());
        self
    }

    pub fn with_ext(mut self, ext: &str) -> Self {
        self.ext = Some(ext.to_string());
        self
    }

    pub fn with_transitive(mut self, transitive: bool) -> Self {
        self.transitive = transitive;
        self
    }

    /// Add exclusions, skipping those already present.
    pub fn and_exclude(mut self, excludes: impl IntoIterator<Item = Exclude>) -> Self {
        for exclude in excludes {
            if !self.exclusions.contains(&exclude) {
                self.exclusions.push(exclude);
            }
        }
        self
    }
}

impl fmt::Display for ModuleDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module_id, self.version)?;
        if let Some(ref classifier) = self.classifier {
            write!(f, " ({classifier})")?;
        }
        Ok(())
    }
}

/// A dependency on files already present on the local file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDependency {
    files: Vec<PathBuf>,
}

impl FileDependency {
    /// Duplicate paths are dropped, first occurrence wins.
    pub fn of(files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            files: dedup_paths(files.into_iter().map(Into::into)),
        }
    }

    /// The declared files, each checked to exist.
    pub fn paths(&self) -> DepotResult<Vec<PathBuf>> {
        if let Some(missing) = self.files.iter().find(|f| !f.exists()) {
            return Err(DepotError::Declaration {
                message: format!("file dependency {} does not exist", missing.display()),
            }
            .into());
        }
        Ok(self.files.clone())
    }

    pub fn declared_files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// A side-effecting action expected to produce files.
pub trait BuildAction: Send + Sync {
    fn run(&self) -> DepotResult<()>;

    fn describe(&self) -> String {
        "build action".to_string()
    }
}

impl<F> BuildAction for F
where
    F: Fn() -> DepotResult<()> + Send + Sync,
{
    fn run(&self) -> DepotResult<()> {
        self()
    }
}

/// Runs an external command; its outputs are the computed files.
pub struct CommandAction {
    command: CommandBuilder,
}

impl CommandAction {
    pub fn new(command: CommandBuilder) -> Self {
        Self { command }
    }
}

impl BuildAction for CommandAction {
    fn run(&self) -> DepotResult<()> {
        self.command.exec_checked()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("`{}`", self.command.display())
    }
}

type ExtraFiles = Arc<dyn Fn() -> Vec<PathBuf> + Send + Sync>;

/// Files produced on demand by a build action.
#[derive(Clone)]
pub struct ComputedDependency {
    action: Arc<dyn BuildAction>,
    files: Vec<PathBuf>,
    extra_files: Option<ExtraFiles>,
}

impl ComputedDependency {
    pub fn of(
        action: impl BuildAction + 'static,
        files: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> Self {
        Self {
            action: Arc::new(action),
            files: dedup_paths(files.into_iter().map(Into::into)),
            extra_files: None,
        }
    }

    /// Files only known once the action ran, appended after the expected ones.
    pub fn with_extra_files(
        mut self,
        supplier: impl Fn() -> Vec<PathBuf> + Send + Sync + 'static,
    ) -> Self {
        self.extra_files = Some(Arc::new(supplier));
        self
    }

    pub fn expected_files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Run the action if an expected output is absent, then return the outputs.
    pub fn paths(&self) -> DepotResult<Vec<PathBuf>> {
        if self.needs_run()? {
            tracing::info!(
                "generating {} with {}",
                display_paths(&self.files),
                self.action.describe()
            );
            self.action.run()?;
            let missing: Vec<PathBuf> = self
                .files
                .iter()
                .filter(|f| !f.exists())
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(DepotError::Generation {
                    message: format!(
                        "{} ran but did not produce {}",
                        self.action.describe(),
                        display_paths(&missing)
                    ),
                }
                .into());
            }
        }
        let mut result = self.files.clone();
        if let Some(ref supplier) = self.extra_files {
            result.extend(supplier());
        }
        Ok(dedup_paths(result))
    }

    fn needs_run(&self) -> DepotResult<bool> {
        for file in &self.files {
            if !file.exists() || (file.is_dir() && is_empty_dir(file).map_err(DepotError::from)?) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl fmt::Debug for ComputedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedDependency")
            .field("action", &self.action.describe())
            .field("files", &self.files)
            .finish()
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Any dependency a project can declare.
#[derive(Debug, Clone)]
pub enum Dependency {
    Module(ModuleDependency),
    Files(FileDependency),
    Computed(ComputedDependency),
}

impl Dependency {
    pub fn as_module(&self) -> Option<&ModuleDependency> {
        match self {
            Dependency::Module(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_module(&self) -> bool {
        self.as_module().is_some()
    }

    /// Local files of a file or computed dependency; empty for modules.
    pub fn local_paths(&self) -> DepotResult<Vec<PathBuf>> {
        match self {
            Dependency::Module(_) => Ok(Vec::new()),
            Dependency::Files(files) => files.paths(),
            Dependency::Computed(computed) => computed.paths(),
        }
    }
}

impl From<ModuleDependency> for Dependency {
    fn from(value: ModuleDependency) -> Self {
        Dependency::Module(value)
    }
}

impl From<FileDependency> for Dependency {
    fn from(value: FileDependency) -> Self {
        Dependency::Files(value)
    }
}

impl From<ComputedDependency> for Dependency {
    fn from(value: ComputedDependency) -> Self {
        Dependency::Computed(value)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Module(m) => write!(f, "{m}"),
            Dependency::Files(files) => write!(f, "files [{}]", display_paths(&files.files)),
            Dependency::Computed(c) => write!(f, "computed [{}]", display_paths(&c.files)),
        }
    }
}

/// How a dependency is bound to scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeBinding {
    /// No scope yet; a default may be applied later.
    Unset,
    Scopes(Vec<Scope>),
    /// Only meaningful for module dependencies.
    Mapping(ScopeMapping),
}

/// A dependency together with its scope binding.
#[derive(Debug, Clone)]
pub struct ScopedDependency {
    dependency: Dependency,
    binding: ScopeBinding,
}

impl ScopedDependency {
    /// Unscoped.
    pub fn of(dependency: impl Into<Dependency>) -> Self {
        Self {
            dependency: dependency.into(),
            binding: ScopeBinding::Unset,
        }
    }

    /// Bound to `scopes`; an empty list leaves the dependency unscoped.
    pub fn with_scopes(dependency: impl Into<Dependency>, scopes: &[Scope]) -> Self {
        let binding = if scopes.is_empty() {
            ScopeBinding::Unset
        } else {
            ScopeBinding::Scopes(scopes.to_vec())
        };
        Self {
            dependency: dependency.into(),
            binding,
        }
    }

    pub fn with_mapping(dependency: ModuleDependency, mapping: ScopeMapping) -> Self {
        Self {
            dependency: Dependency::Module(dependency),
            binding: ScopeBinding::Mapping(mapping),
        }
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    pub fn binding(&self) -> &ScopeBinding {
        &self.binding
    }

    pub fn module_dependency(&self) -> Option<&ModuleDependency> {
        self.dependency.as_module()
    }

    pub fn is_unset(&self) -> bool {
        self.binding == ScopeBinding::Unset
    }

    /// Scopes named by the binding, mapping targets included.
    pub fn declared_scopes(&self) -> Vec<Scope> {
        match &self.binding {
            ScopeBinding::Unset => Vec::new(),
            ScopeBinding::Scopes(scopes) => scopes.clone(),
            ScopeBinding::Mapping(mapping) => mapping.declared_scopes(),
        }
    }

    /// Scopes the dependency is bound from (left side of a mapping).
    pub fn binding_scopes(&self) -> Vec<Scope> {
        match &self.binding {
            ScopeBinding::Unset => Vec::new(),
            ScopeBinding::Scopes(scopes) => scopes.clone(),
            ScopeBinding::Mapping(mapping) => mapping.entries().cloned().collect(),
        }
    }

    /// Whether requesting `scope` pulls this dependency.
    pub fn is_involved_in(&self, scope: &Scope) -> bool {
        scope.is_in_or_extending_any_of(&self.binding_scopes())
    }

    pub fn is_involved_in_any_of(&self, scopes: &[Scope]) -> bool {
        scopes.iter().any(|s| self.is_involved_in(s))
    }

    pub(crate) fn with_dependency(&self, dependency: Dependency) -> Self {
        Self {
            dependency,
            binding: self.binding.clone(),
        }
    }

    pub(crate) fn with_binding(&self, binding: ScopeBinding) -> Self {
        if let (ScopeBinding::Mapping(_), false) = (&binding, self.dependency.is_module()) {
            return self.clone();
        }
        Self {
            dependency: self.dependency.clone(),
            binding,
        }
    }
}

impl fmt::Display for ScopedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.binding {
            ScopeBinding::Unset => write!(f, "{}", self.dependency),
            ScopeBinding::Scopes(scopes) => {
                let names: Vec<&str> = scopes.iter().map(Scope::name).collect();
                write!(f, "{} [{}]", self.dependency, names.join(", "))
            }
            ScopeBinding::Mapping(mapping) => write!(f, "{} [{mapping}]", self.dependency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::scopes::{compile, runtime, test};

    #[test]
    fn parse_two_parts_is_unspecified() {
        let dep = ModuleDependency::parse("org.example:lib").unwrap();
        assert!(dep.version().is_unspecified());
    }

    #[test]
    fn parse_question_mark_is_unspecified() {
        let dep = ModuleDependency::parse("org.example:lib:?").unwrap();
        assert!(dep.version().is_unspecified());
    }

    #[test]
    fn parse_with_classifier_type_and_ext() {
        let dep = ModuleDependency::parse("org.example:lib:linux:native:1.2@so").unwrap();
        assert_eq!(dep.version().as_str(), "1.2");
        assert_eq!(dep.classifier(), Some("linux"));
        assert_eq!(dep.artifact_type(), Some("native"));
        assert_eq!(dep.ext(), Some("so"));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(ModuleDependency::parse("lib").is_err());
        assert!(ModuleDependency::parse("a:b:c:d:e:f").is_err());
        assert!(ModuleDependency::parse("a:b:1.0@").is_err());
        assert!(ModuleDependency::parse("a:b: ").is_err());
    }

    #[test]
    fn binding_involvement_follows_inheritance() {
        let dep = ModuleDependency::parse("g:a:1.0").unwrap();
        let scoped = ScopedDependency::with_scopes(dep.clone(), &[compile()]);
        assert!(scoped.is_involved_in(&test()));
        assert!(scoped.is_involved_in(&runtime()));

        let unset = ScopedDependency::of(dep);
        assert!(!unset.is_involved_in(&compile()));
    }

    #[test]
    fn mapping_binding_ignored_for_files() {
        let files = ScopedDependency::of(FileDependency::of(["a.jar"]));
        let mapping = crate::scope::scopes::default_mapping();
        assert!(files.with_binding(ScopeBinding::Mapping(mapping)).is_unset());
    }

    #[test]
    fn exclude_scope_restriction() {
        let exclude = Exclude::parse("g:b").unwrap().with_scopes(&[runtime()]);
        assert!(exclude.applies_to(Some(&test())));
        assert!(!exclude.applies_to(Some(&compile())));
        assert!(exclude.applies_to(None));
    }

    #[test]
    fn exclude_wildcards() {
        let b = ModuleId::parse("g:b").unwrap();
        assert!(Exclude::parse("g:b").unwrap().matches(&b));
        assert!(Exclude::parse("g:*").unwrap().matches(&b));
        assert!(Exclude::parse("*:b").unwrap().matches(&b));
        assert!(!Exclude::parse("h:*").unwrap().matches(&b));
        assert!(Exclude::parse("g:b").unwrap().with_ext("zip").is_partial());
    }

    #[test]
    fn file_dependency_dedups() {
        let files = FileDependency::of(["a.jar", "b.jar", "a.jar"]);
        assert_eq!(files.declared_files().len(), 2);
    }
}
