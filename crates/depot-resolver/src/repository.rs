//! Module resolution against Maven-layout repositories: breadth-first walk
//! over POMs where the nearest declaration of a module wins.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use depot_core::config::DepotConfig;
use depot_core::dependency::{Exclude, ModuleDependency, ScopeBinding, ScopedDependency};
use depot_core::dependency_set::DependencySet;
use depot_core::module::{ModuleId, VersionedModule};
use depot_core::scope::{scopes, Scope, ScopeMapping};
use depot_core::version::{Version, VersionRange};
use depot_core::version_provider::VersionProvider;
use depot_maven::cache::LocalCache;
use depot_maven::layout::{maven_artifact_path, maven_module_metadata_path, maven_version_metadata_path};
use depot_maven::metadata::MavenMetadata;
use depot_maven::pom::{self, Pom};
use depot_maven::repository::MavenRepository;
use depot_maven::transport::Transport;
use depot_util::errors::{DepotError, DepotResult};
use petgraph::graph::NodeIndex;

use crate::graph::{DepEdge, DependencyGraph, ResolvedModule};
use crate::node::DependencyNode;
use crate::report::ModuleProblem;
use crate::resolver::{ModuleResolution, ModuleResolver, ResolutionParameters, ScopeResolution};

const MAX_PARENT_DEPTH: usize = 16;

/// Resolutions kept per identity; the oldest is dropped first.
const MAX_CACHED_REQUESTS: usize = 8;

/// How much of a module's own dependencies a request pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Closure {
    ArtifactOnly,
    Compile,
    Runtime,
}

/// Maven scope propagation: what a dependency declared with `dep_scope`
/// in a POM contributes when its parent was pulled with `parent`.
fn propagate(parent: Closure, dep_scope: &str) -> Option<Closure> {
    match (parent, dep_scope) {
        (Closure::ArtifactOnly, _) => None,
        (_, "test" | "provided" | "system" | "import") => None,
        (Closure::Compile, "runtime") => None,
        (closure, _) => Some(closure),
    }
}

/// Closure pulled by a mapping target such as `compile(default)` or
/// `archives(master)`; the part in parentheses is a fallback name.
fn target_closure(target: &Scope) -> Closure {
    let name = target.name();
    match name.split('(').next().unwrap_or(name) {
        "runtime" | "default" | "test" => Closure::Runtime,
        "compile" | "provided" => Closure::Compile,
        _ => Closure::ArtifactOnly,
    }
}

/// What requesting `scope` pulls of a declared dependency; `None` when the
/// dependency is not part of `scope`.
fn direct_closure(declared: &ScopedDependency, module: &ModuleDependency, scope: Option<&Scope>) -> Option<Closure> {
    let closure = match declared.binding() {
        ScopeBinding::Unset => Closure::Runtime,
        ScopeBinding::Scopes(bound) => {
            let matched: Vec<&Scope> = bound
                .iter()
                .filter(|b| scope.map_or(true, |s| s.is_in_or_extending_any_of(std::slice::from_ref(*b))))
                .collect();
            if matched.is_empty() {
                return None;
            }
            if matched.iter().all(|s| !s.is_transitive()) {
                Closure::ArtifactOnly
            } else if scope.map_or(true, |s| s.is_in_or_extending_any_of(&[scopes::runtime()])) {
                Closure::Runtime
            } else {
                Closure::Compile
            }
        }
        ScopeBinding::Mapping(mapping) => {
            let mut matched = false;
            let mut closure = Closure::ArtifactOnly;
            for from in mapping.entries() {
                if scope.is_some_and(|s| !s.is_in_or_extending_any_of(std::slice::from_ref(from))) {
                    continue;
                }
                matched = true;
                for target in mapping.mapped_scopes(from).unwrap_or(&[]) {
                    closure = closure.max(target_closure(target));
                }
            }
            if !matched {
                return None;
            }
            closure
        }
    };
    Some(if module.is_transitive() {
        closure
    } else {
        Closure::ArtifactOnly
    })
}

/// Extension of the artifact of a POM dependency `type`; `None` for jar-like types.
fn type_extension(type_: &str) -> Option<&str> {
    match type_ {
        "jar" | "bundle" | "test-jar" | "maven-plugin" | "ejb" | "ejb-client" => None,
        other => Some(other),
    }
}

fn packaging_extension(packaging: &str) -> &str {
    match packaging {
        "war" | "ear" | "rar" | "aar" | "zip" => packaging,
        _ => "jar",
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Remote {
    name: String,
    transport: Box<dyn Transport>,
}

type CachedResolutions = HashMap<VersionedModule, VecDeque<(RequestKey, ModuleResolution)>>;

/// Resolves modules from Maven repositories, tried in the order added,
/// downloading into a local cache.
pub struct RepositoryResolver {
    remotes: Vec<Remote>,
    cache: LocalCache,
    resolutions: Mutex<CachedResolutions>,
}

impl RepositoryResolver {
    pub fn new(cache: LocalCache) -> Self {
        Self {
            remotes: Vec::new(),
            cache,
            resolutions: Mutex::new(HashMap::new()),
        }
    }

    /// The `[repositories]` of `config`, Maven Central appended when none
    /// of them is Central.
    pub fn from_config(config: &DepotConfig) -> DepotResult<Self> {
        let mut resolver = Self::new(LocalCache::new(config.cache_path()));
        for (name, entry) in &config.repositories {
            resolver = resolver.with_repository(&MavenRepository::from_entry(name, entry))?;
        }
        if !config
            .repositories
            .values()
            .any(|e| e.url().contains("repo.maven.apache.org"))
        {
            resolver = resolver.with_repository(&MavenRepository::maven_central())?;
        }
        Ok(resolver)
    }

    pub fn with_repository(self, repository: &MavenRepository) -> DepotResult<Self> {
        let transport = repository.transport()?;
        Ok(self.with_transport(&repository.name, transport))
    }

    pub fn with_transport(mut self, name: &str, transport: Box<dyn Transport>) -> Self {
        self.remotes.push(Remote {
            name: name.to_string(),
            transport,
        });
        self
    }

    pub fn repository_names(&self) -> Vec<&str> {
        self.remotes.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Number of identities with cached resolutions.
    pub fn cached_identities(&self) -> usize {
        guard(&self.resolutions).len()
    }

    /// Number of resolutions cached for `identity`.
    pub fn cached_requests(&self, identity: &VersionedModule) -> usize {
        guard(&self.resolutions).get(identity).map_or(0, VecDeque::len)
    }

    fn cached(&self, identity: &VersionedModule, key: &RequestKey) -> Option<ModuleResolution> {
        guard(&self.resolutions)
            .get(identity)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, resolution)| resolution.clone())
    }

    fn remember(&self, identity: &VersionedModule, key: RequestKey, resolution: ModuleResolution) {
        let mut resolutions = guard(&self.resolutions);
        let entries = resolutions.entry(identity.clone()).or_default();
        entries.retain(|(k, _)| *k != key);
        if entries.len() >= MAX_CACHED_REQUESTS {
            entries.pop_front();
        }
        entries.push_back((key, resolution));
    }
}

impl ModuleResolver for RepositoryResolver {
    fn resolve(
        &self,
        identity: &VersionedModule,
        dependencies: &DependencySet,
        parameters: &ResolutionParameters,
        overrides: &VersionProvider,
        scopes: &[Scope],
    ) -> DepotResult<ModuleResolution> {
        let key = RequestKey::new(dependencies, parameters, overrides, scopes);
        if !parameters.is_refresh() {
            if let Some(resolution) = self.cached(identity, &key) {
                tracing::debug!("Reusing resolution of {identity}");
                return Ok(resolution);
            }
        }
        if self.remotes.is_empty() {
            tracing::warn!("No repository to resolve {identity} from");
        }

        let targets: Vec<Option<&Scope>> = if scopes.is_empty() {
            vec![None]
        } else {
            scopes.iter().map(Some).collect()
        };
        let mut walk = Walk::new(self, parameters.is_refresh(), overrides);
        let mut per_scope = Vec::with_capacity(targets.len());
        for scope in targets {
            let global: Vec<&Exclude> = dependencies
                .global_exclusions()
                .iter()
                .filter(|e| !e.is_partial() && e.applies_to(scope))
                .collect();
            let tree = walk.run(identity, dependencies, &global, scope);
            per_scope.push(ScopeResolution {
                scope: scope.cloned(),
                tree,
            });
        }
        let resolution = ModuleResolution {
            per_scope,
            unresolved: walk.problems,
        };
        self.remember(identity, key, resolution.clone());
        Ok(resolution)
    }

    fn fetch_single(&self, dependency: &ModuleDependency) -> DepotResult<PathBuf> {
        let failure = |reason: String| -> miette::Report {
            DepotError::Resolution {
                message: format!("Cannot fetch {dependency}: {reason}"),
            }
            .into()
        };
        let overrides = VersionProvider::new();
        let mut walk = Walk::new(self, false, &overrides);
        let version = walk.select_version(dependency).map_err(failure)?;
        let module = dependency.module_id().with_version(version);
        let pom = walk.pom(&module);
        let files = walk
            .artifact_files(&module, dependency, pom.as_ref())
            .map_err(failure)?;
        files
            .into_iter()
            .next()
            .ok_or_else(|| failure(format!("{module} publishes no artifact file")))
    }

    fn invalidate_cache(&self, identity: &VersionedModule) {
        if guard(&self.resolutions).remove(identity).is_some() {
            tracing::debug!("Dropped cached resolutions of {identity}");
        }
    }
}

/// Everything a resolution depends on besides the repositories, compared
/// field by field when looking up cached resolutions.
#[derive(Debug, PartialEq, Eq)]
struct RequestKey {
    modules: Vec<(ModuleDependency, ScopeBinding)>,
    global_exclusions: Vec<Exclude>,
    overrides: Vec<VersionedModule>,
    scopes: Vec<Scope>,
    default_scopes: Vec<Scope>,
    default_mapping: Option<ScopeMapping>,
}

impl RequestKey {
    fn new(
        dependencies: &DependencySet,
        parameters: &ResolutionParameters,
        overrides: &VersionProvider,
        scopes: &[Scope],
    ) -> Self {
        Self {
            modules: dependencies
                .iter()
                .filter_map(|d| Some((d.module_dependency()?.clone(), d.binding().clone())))
                .collect(),
            global_exclusions: dependencies.global_exclusions().to_vec(),
            overrides: overrides.to_versioned_modules(),
            scopes: scopes.to_vec(),
            default_scopes: parameters.default_scopes().to_vec(),
            default_mapping: parameters.default_mapping().cloned(),
        }
    }
}

/// Entry in the BFS queue.
struct QueueEntry {
    dependency: ModuleDependency,
    closure: Closure,
    declared_scopes: Vec<Scope>,
    depth: usize,
    parent: NodeIndex,
    exclusions: Vec<Exclude>,
}

/// State shared by the walks of one resolution call.
struct Walk<'a> {
    resolver: &'a RepositoryResolver,
    refresh: bool,
    overrides: &'a VersionProvider,
    poms: HashMap<VersionedModule, Option<Pom>>,
    versions: HashMap<ModuleId, Vec<Version>>,
    problems: Vec<ModuleProblem>,
}

impl<'a> Walk<'a> {
    fn new(resolver: &'a RepositoryResolver, refresh: bool, overrides: &'a VersionProvider) -> Self {
        Self {
            resolver,
            refresh,
            overrides,
            poms: HashMap::new(),
            versions: HashMap::new(),
            problems: Vec::new(),
        }
    }

    /// Resolves the tree of `dependencies` for `scope` (`None`: every scope).
    fn run(
        &mut self,
        identity: &VersionedModule,
        dependencies: &DependencySet,
        global: &[&Exclude],
        scope: Option<&Scope>,
    ) -> DependencyNode {
        let mut graph = DependencyGraph::new();
        let root = graph.set_root(ResolvedModule::new(
            identity.module_id().clone(),
            identity.version().clone(),
        ));

        let mut queue: VecDeque<QueueEntry> = VecDeque::new();
        for declared in dependencies {
            let Some(module) = declared.module_dependency() else {
                continue;
            };
            let Some(closure) = direct_closure(declared, module, scope) else {
                continue;
            };
            queue.push_back(QueueEntry {
                dependency: module.clone(),
                closure,
                declared_scopes: declared.declared_scopes(),
                depth: 1,
                parent: root,
                exclusions: module
                    .exclusions()
                    .iter()
                    .filter(|e| !e.is_partial() && e.applies_to(scope))
                    .cloned()
                    .collect(),
            });
        }

        while let Some(entry) = queue.pop_front() {
            let module_id = entry.dependency.module_id().clone();
            if global.iter().any(|e| e.matches(&module_id)) {
                continue;
            }

            if let Some(existing) = graph.find(&module_id) {
                let resolved = graph.node(existing).version.clone();
                let requested = entry.dependency.version().clone();
                let evicted = !requested.is_unspecified() && !requested.contains(&resolved);
                if evicted {
                    tracing::debug!("{module_id}:{requested} evicted by {resolved} (nearest wins)");
                }
                graph.add_edge(
                    entry.parent,
                    existing,
                    DepEdge {
                        requested,
                        declared_scopes: entry.declared_scopes,
                        evicted,
                    },
                );
                continue;
            }

            let version = match self.select_version(&entry.dependency) {
                Ok(version) => version,
                Err(reason) => {
                    self.report(&graph, entry.parent, &entry.dependency, reason);
                    continue;
                }
            };
            let module = module_id.with_version(version.clone());
            let pom = self.pom(&module);
            let files = match self.artifact_files(&module, &entry.dependency, pom.as_ref()) {
                Ok(files) => files,
                Err(reason) => {
                    self.report(&graph, entry.parent, &entry.dependency, reason);
                    continue;
                }
            };
            tracing::debug!("Resolved {module} at depth {}", entry.depth);

            let node = graph.add_node(ResolvedModule {
                module_id: module_id.clone(),
                version,
                files,
            });
            graph.add_edge(
                entry.parent,
                node,
                DepEdge {
                    requested: entry.dependency.version().clone(),
                    declared_scopes: entry.declared_scopes.clone(),
                    evicted: false,
                },
            );

            let Some(pom) = pom else {
                continue;
            };
            for dep in &pom.dependencies {
                if dep.optional {
                    continue;
                }
                let Some(closure) = propagate(entry.closure, dep.scope.as_deref().unwrap_or("compile")) else {
                    continue;
                };
                let Ok(child_id) = ModuleId::new(dep.group_id.as_str(), dep.artifact_id.as_str()) else {
                    tracing::debug!("Skipping malformed dependency {}:{} of {module}", dep.group_id, dep.artifact_id);
                    continue;
                };
                if entry.exclusions.iter().any(|e| e.matches(&child_id)) {
                    continue;
                }

                let range = dep
                    .version
                    .as_deref()
                    .or_else(|| pom.managed_version(&dep.group_id, &dep.artifact_id))
                    .and_then(|v| VersionRange::of(v).ok())
                    .unwrap_or_else(VersionRange::unspecified);
                let mut child = ModuleDependency::of(child_id, range);
                if let Some(classifier) = &dep.classifier {
                    child = child.with_classifier(classifier);
                } else if dep.type_.as_deref() == Some("test-jar") {
                    child = child.with_classifier("tests");
                }
                if let Some(ext) = dep.type_.as_deref().and_then(type_extension) {
                    child = child.with_ext(ext);
                }

                let mut exclusions = entry.exclusions.clone();
                for exclusion in &dep.exclusions {
                    let name = exclusion.artifact_id.as_deref().unwrap_or("*");
                    if let Ok(id) = ModuleId::new(exclusion.group_id.as_str(), name) {
                        exclusions.push(Exclude::of(id));
                    }
                }

                queue.push_back(QueueEntry {
                    dependency: child,
                    closure,
                    declared_scopes: Vec::new(),
                    depth: entry.depth + 1,
                    parent: node,
                    exclusions,
                });
            }
        }

        graph
            .to_tree()
            .unwrap_or_else(|| DependencyNode::root(identity.clone()))
    }

    fn report(&mut self, graph: &DependencyGraph, parent: NodeIndex, dependency: &ModuleDependency, reason: String) {
        let reason = match required_by(graph, parent) {
            Some(chain) => format!("{reason}, required by {chain}"),
            None => reason,
        };
        let problem = ModuleProblem::new(
            dependency.module_id().clone(),
            dependency.version().clone(),
            reason,
        );
        tracing::debug!("Unresolved {problem}");
        if !self.problems.contains(&problem) {
            self.problems.push(problem);
        }
    }

    /// Overrides replace unspecified and dynamic ranges; dynamic ranges
    /// select the highest published version they contain.
    fn select_version(&mut self, dependency: &ModuleDependency) -> Result<Version, String> {
        let module_id = dependency.module_id();
        let range = dependency.version();
        if range.is_unspecified() || range.is_dynamic_and_resolvable() {
            if let Some(version) = self.overrides.get_version_of(module_id) {
                return Ok(version.clone());
            }
        }
        if range.is_unspecified() {
            return Err("no version declared or managed".to_string());
        }
        if let Some(version) = range.to_version() {
            return Ok(version);
        }
        let candidates = self.available_versions(module_id);
        range
            .select(candidates.iter())
            .cloned()
            .ok_or_else(|| format!("no published version matches {range}"))
    }

    fn available_versions(&mut self, module_id: &ModuleId) -> Vec<Version> {
        if let Some(versions) = self.versions.get(module_id) {
            return versions.clone();
        }
        let path = maven_module_metadata_path(module_id);
        let mut versions: Vec<Version> = Vec::new();
        for remote in &self.resolver.remotes {
            match remote.transport.read_bytes(&path) {
                Ok(Some(bytes)) => match MavenMetadata::parse(&String::from_utf8_lossy(&bytes)) {
                    Ok(metadata) => {
                        for version in metadata.versioning.versions {
                            let version = Version::new(version);
                            if !versions.contains(&version) {
                                versions.push(version);
                            }
                        }
                    }
                    Err(e) => tracing::warn!("Unreadable {path} in {}: {e}", remote.name),
                },
                Ok(None) => {}
                Err(e) => tracing::warn!("Cannot list versions of {module_id} in {}: {e}", remote.name),
            }
        }
        self.versions.insert(module_id.clone(), versions.clone());
        versions
    }

    /// The version in file names: the timestamped one for snapshots
    /// deployed with unique versions.
    fn file_version(&self, module: &VersionedModule, ext: &str, classifier: Option<&str>) -> String {
        if !module.version().is_snapshot() {
            return module.version().to_string();
        }
        let path = maven_version_metadata_path(module);
        for remote in &self.resolver.remotes {
            let Ok(Some(bytes)) = remote.transport.read_bytes(&path) else {
                continue;
            };
            let Ok(metadata) = MavenMetadata::parse(&String::from_utf8_lossy(&bytes)) else {
                continue;
            };
            if let Some(entry) = metadata
                .versioning
                .snapshot_versions
                .iter()
                .find(|v| v.extension == ext && v.classifier.as_deref() == classifier)
            {
                return entry.value.clone();
            }
            if let Some(unique) = metadata.unique_version() {
                return unique;
            }
        }
        module.version().to_string()
    }

    /// Downloads `remote_path` from the first repository having it. `Err`
    /// when no repository has it and some could not be reached.
    fn download(&self, module: &VersionedModule, remote_path: &str) -> Result<Option<PathBuf>, String> {
        let mut failures = Vec::new();
        for remote in &self.resolver.remotes {
            match self.resolver.cache.fetch(
                remote.transport.as_ref(),
                remote_path,
                module.module_id(),
                module.version().as_str(),
                self.refresh,
            ) {
                Ok(Some(path)) => return Ok(Some(path)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("{remote_path} unavailable from {}: {e}", remote.name);
                    failures.push(format!("{}: {e}", remote.name));
                }
            }
        }
        if failures.is_empty() {
            Ok(None)
        } else {
            Err(failures.join("; "))
        }
    }

    fn pom(&mut self, module: &VersionedModule) -> Option<Pom> {
        self.effective_pom(module, 0)
    }

    /// The POM with its parents applied, properties interpolated and BOM
    /// imports merged into its dependency management.
    fn effective_pom(&mut self, module: &VersionedModule, depth: usize) -> Option<Pom> {
        if let Some(cached) = self.poms.get(module) {
            return cached.clone();
        }
        if depth > MAX_PARENT_DEPTH {
            tracing::warn!("POM hierarchy of {module} is too deep");
            return None;
        }
        self.poms.insert(module.clone(), None);
        let pom = self.load_pom(module, depth);
        self.poms.insert(module.clone(), pom.clone());
        pom
    }

    fn load_pom(&mut self, module: &VersionedModule, depth: usize) -> Option<Pom> {
        let file_version = self.file_version(module, "pom", None);
        let path = maven_artifact_path(module, &file_version, None, "pom");
        let file = match self.download(module, &path) {
            Ok(file) => file?,
            Err(reason) => {
                tracing::debug!("No POM for {module}: {reason}");
                return None;
            }
        };
        let content = match fs::read_to_string(&file) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Cannot read {}: {e}", file.display());
                return None;
            }
        };
        let mut pom = match pom::parse_pom(&content) {
            Ok(pom) => pom,
            Err(e) => {
                tracing::warn!("Invalid POM {path}: {e}");
                return None;
            }
        };

        if let Some(parent) = pom.parent.clone() {
            if let Ok(parent_id) = ModuleId::new(parent.group_id.as_str(), parent.artifact_id.as_str()) {
                let parent_module = parent_id.with_version(Version::new(parent.version.as_str()));
                match self.effective_pom(&parent_module, depth + 1) {
                    Some(parent_pom) => pom.apply_parent(&parent_pom),
                    None => tracing::warn!("Parent POM {parent_module} of {module} not found"),
                }
            }
        }
        pom.resolve_properties();

        let imports: Vec<(String, String, Option<String>)> = pom
            .bom_imports()
            .into_iter()
            .map(|d| (d.group_id.clone(), d.artifact_id.clone(), d.version.clone()))
            .collect();
        for (group, artifact, version) in imports {
            let (Ok(bom_id), Some(version)) = (ModuleId::new(group.as_str(), artifact.as_str()), version) else {
                continue;
            };
            let bom = bom_id.with_version(Version::new(version.as_str()));
            let Some(bom_pom) = self.effective_pom(&bom, depth + 1) else {
                tracing::warn!("BOM {bom} imported by {module} not found");
                continue;
            };
            for managed in bom_pom.dependency_management {
                let present = pom
                    .dependency_management
                    .iter()
                    .any(|d| d.group_id == managed.group_id && d.artifact_id == managed.artifact_id);
                if !present {
                    pom.dependency_management.push(managed);
                }
            }
        }
        Some(pom)
    }

    /// The artifact file of `module`; none for POM-only modules unless an
    /// extension or classifier is asked for explicitly.
    fn artifact_files(
        &self,
        module: &VersionedModule,
        dependency: &ModuleDependency,
        pom: Option<&Pom>,
    ) -> Result<Vec<PathBuf>, String> {
        let packaging = pom.and_then(|p| p.packaging.as_deref()).unwrap_or("jar");
        let explicit = dependency.ext().is_some() || dependency.classifier().is_some();
        if packaging == "pom" && !explicit {
            return Ok(Vec::new());
        }
        let ext = dependency.ext().unwrap_or_else(|| packaging_extension(packaging));
        let file_version = self.file_version(module, ext, dependency.classifier());
        let path = maven_artifact_path(module, &file_version, dependency.classifier(), ext);
        match self.download(module, &path) {
            Ok(Some(file)) => Ok(vec![file]),
            Ok(None) if pom.is_none() => Err("not found in any repository".to_string()),
            Ok(None) => Err(format!("artifact {path} not found")),
            Err(reason) => Err(reason),
        }
    }
}

/// `g:a:1.0 > g:b:2.0` from the first declared module down to `parent`.
fn required_by(graph: &DependencyGraph, parent: NodeIndex) -> Option<String> {
    if Some(parent) == graph.root() {
        return None;
    }
    let path = graph.find_path(&graph.node(parent).module_id)?;
    Some(
        path.iter()
            .skip(1)
            .map(|m| m.versioned().to_string())
            .collect::<Vec<_>>()
            .join(" > "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_propagation() {
        assert_eq!(propagate(Closure::Compile, "compile"), Some(Closure::Compile));
        assert_eq!(propagate(Closure::Compile, "runtime"), None);
        assert_eq!(propagate(Closure::Runtime, "compile"), Some(Closure::Runtime));
        assert_eq!(propagate(Closure::Runtime, "runtime"), Some(Closure::Runtime));
        assert_eq!(propagate(Closure::Runtime, "test"), None);
        assert_eq!(propagate(Closure::Runtime, "provided"), None);
        assert_eq!(propagate(Closure::ArtifactOnly, "compile"), None);
    }

    #[test]
    fn direct_closure_by_scope() {
        let module = ModuleDependency::parse("g:a:1.0").unwrap();
        let declared = ScopedDependency::with_scopes(module.clone(), &[scopes::compile()]);
        assert_eq!(direct_closure(&declared, &module, Some(&scopes::compile())), Some(Closure::Compile));
        assert_eq!(direct_closure(&declared, &module, Some(&scopes::test())), Some(Closure::Runtime));
        assert_eq!(direct_closure(&declared, &module, Some(&scopes::provided())), None);
        assert_eq!(direct_closure(&declared, &module, None), Some(Closure::Runtime));

        let provided = ScopedDependency::with_scopes(module.clone(), &[scopes::provided()]);
        assert_eq!(
            direct_closure(&provided, &module, Some(&scopes::provided())),
            Some(Closure::ArtifactOnly)
        );

        let intransitive = module.clone().with_transitive(false);
        let declared = ScopedDependency::with_scopes(intransitive.clone(), &[scopes::compile()]);
        assert_eq!(
            direct_closure(&declared, &intransitive, Some(&scopes::compile())),
            Some(Closure::ArtifactOnly)
        );
    }

    #[test]
    fn direct_closure_by_mapping() {
        let module = ModuleDependency::parse("g:a:1.0").unwrap();
        let mapping = ScopeMapping::new()
            .and(&[scopes::compile()], &["archives(master)", "compile(default)"])
            .unwrap();
        let declared = ScopedDependency::with_mapping(module.clone(), mapping);
        assert_eq!(direct_closure(&declared, &module, Some(&scopes::runtime())), Some(Closure::Compile));
        assert_eq!(direct_closure(&declared, &module, Some(&scopes::provided())), None);

        let master_only = ScopeMapping::new().and(&[scopes::compile()], &["archives(master)"]).unwrap();
        let declared = ScopedDependency::with_mapping(module.clone(), master_only);
        assert_eq!(
            direct_closure(&declared, &module, Some(&scopes::compile())),
            Some(Closure::ArtifactOnly)
        );
    }

    #[test]
    fn extensions_from_types_and_packaging() {
        assert_eq!(type_extension("jar"), None);
        assert_eq!(type_extension("zip"), Some("zip"));
        assert_eq!(packaging_extension("bundle"), "jar");
        assert_eq!(packaging_extension("war"), "war");
    }
}
