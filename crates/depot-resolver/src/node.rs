//! The resolved dependency tree.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use depot_core::dependency::{Dependency, Exclude, ScopedDependency};
use depot_core::module::{ModuleId, VersionedModule};
use depot_core::scope::Scope;
use depot_core::version::{Version, VersionRange};
use depot_core::version_provider::VersionProvider;
use depot_util::errors::DepotResult;

/// A module reached during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNodeInfo {
    module_id: ModuleId,
    declared_version: VersionRange,
    declared_scopes: Vec<Scope>,
    /// `None` when another version of the module won.
    resolved_version: Option<Version>,
    files: Vec<PathBuf>,
}

impl ModuleNodeInfo {
    pub fn new(module_id: ModuleId, declared_version: VersionRange, resolved_version: Version) -> Self {
        Self {
            module_id,
            declared_version,
            declared_scopes: Vec::new(),
            resolved_version: Some(resolved_version),
            files: Vec::new(),
        }
    }

    /// A request that lost against a nearer declaration of the same module.
    pub fn evicted(module_id: ModuleId, declared_version: VersionRange) -> Self {
        Self {
            module_id,
            declared_version,
            declared_scopes: Vec::new(),
            resolved_version: None,
            files: Vec::new(),
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<Scope>) -> Self {
        self.declared_scopes = scopes;
        self
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    pub fn declared_version(&self) -> &VersionRange {
        &self.declared_version
    }

    pub fn declared_scopes(&self) -> &[Scope] {
        &self.declared_scopes
    }

    pub fn resolved_version(&self) -> Option<&Version> {
        self.resolved_version.as_ref()
    }

    pub fn is_evicted(&self) -> bool {
        self.resolved_version.is_none()
    }

    pub fn resolved_module(&self) -> Option<VersionedModule> {
        self.resolved_version
            .as_ref()
            .map(|v| self.module_id.with_version(v.clone()))
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl fmt::Display for ModuleNodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resolved_version {
            None => write!(f, "{}:{} (evicted)", self.module_id, self.declared_version)?,
            Some(v) if self.declared_version.is_unspecified()
                || self.declared_version.to_version().as_ref() == Some(v) =>
            {
                write!(f, "{}:{v}", self.module_id)?
            }
            Some(v) => write!(f, "{}:{} -> {v}", self.module_id, self.declared_version)?,
        }
        if !self.declared_scopes.is_empty() {
            let names: Vec<&str> = self.declared_scopes.iter().map(Scope::name).collect();
            write!(f, " [{}]", names.join(", "))?;
        }
        Ok(())
    }
}

/// Files declared directly, or produced by a build action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNodeInfo {
    files: Vec<PathBuf>,
    computed: bool,
    declared_scopes: Vec<Scope>,
}

impl FileNodeInfo {
    /// Reads the paths of a file or computed dependency, running its action
    /// when outputs are missing.
    pub fn of(dependency: &ScopedDependency) -> DepotResult<Self> {
        Ok(Self {
            files: dependency.dependency().local_paths()?,
            computed: matches!(dependency.dependency(), Dependency::Computed(_)),
            declared_scopes: dependency.declared_scopes(),
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }

    pub fn declared_scopes(&self) -> &[Scope] {
        &self.declared_scopes
    }
}

impl fmt::Display for FileNodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .files
            .iter()
            .map(|p| {
                p.file_name()
                    .map_or_else(|| p.display().to_string(), |n| n.to_string_lossy().into_owned())
            })
            .collect();
        let kind = if self.computed { "computed" } else { "files" };
        write!(f, "{kind}: {}", names.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeInfo {
    /// The module the resolution was made for.
    Root(VersionedModule),
    Module(ModuleNodeInfo),
    Files(FileNodeInfo),
}

/// A node of the resolved tree. Children keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    info: NodeInfo,
    children: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn root(identity: VersionedModule) -> Self {
        Self {
            info: NodeInfo::Root(identity),
            children: Vec::new(),
        }
    }

    pub fn module(info: ModuleNodeInfo, children: Vec<DependencyNode>) -> Self {
        Self {
            info: NodeInfo::Module(info),
            children,
        }
    }

    pub fn files(info: FileNodeInfo) -> Self {
        Self {
            info: NodeInfo::Files(info),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<DependencyNode>) -> Self {
        self.children = children;
        self
    }

    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    pub fn children(&self) -> &[DependencyNode] {
        &self.children
    }

    pub fn module_info(&self) -> Option<&ModuleNodeInfo> {
        match &self.info {
            NodeInfo::Module(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_module(&self) -> bool {
        self.module_info().is_some()
    }

    fn has_module_child(&self, module_id: &ModuleId) -> bool {
        self.children
            .iter()
            .any(|c| c.module_info().is_some_and(|m| m.module_id() == module_id))
    }

    /// Appends the children of `other`, skipping modules already present
    /// as direct children of this node.
    pub fn merge(&self, other: &DependencyNode) -> Self {
        let mut result = self.clone();
        for child in &other.children {
            let duplicate = child
                .module_info()
                .is_some_and(|m| result.has_module_child(m.module_id()));
            if !duplicate {
                result.children.push(child.clone());
            }
        }
        result
    }

    /// Inserts the file and computed dependencies of `dependencies` among
    /// the module children, in declaration order: files declared before a
    /// module land before that module's node, the rest at the end.
    pub fn merge_non_modules(&self, dependencies: &[&ScopedDependency]) -> DepotResult<Self> {
        let mut added: HashSet<usize> = HashSet::new();
        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            if let Some(info) = child.module_info() {
                for index in files_declared_before(dependencies, info.module_id()) {
                    if added.insert(index) {
                        children.push(DependencyNode::files(FileNodeInfo::of(dependencies[index])?));
                    }
                }
            }
            children.push(child.clone());
        }
        for (index, dependency) in dependencies.iter().enumerate() {
            if !dependency.dependency().is_module() && added.insert(index) {
                children.push(DependencyNode::files(FileNodeInfo::of(dependency)?));
            }
        }
        Ok(self.clone().with_children(children))
    }

    /// Files of the whole tree, depth first, each listed once.
    pub fn all_files(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        self.collect_files(&mut seen, &mut result);
        result
    }

    fn collect_files(&self, seen: &mut HashSet<PathBuf>, out: &mut Vec<PathBuf>) {
        let files: &[PathBuf] = match &self.info {
            NodeInfo::Root(_) => &[],
            NodeInfo::Module(info) => info.files(),
            NodeInfo::Files(info) => info.files(),
        };
        for file in files {
            if seen.insert(file.clone()) {
                out.push(file.clone());
            }
        }
        for child in &self.children {
            child.collect_files(seen, out);
        }
    }

    /// Every descendant, depth first.
    pub fn flatten(&self) -> Vec<&DependencyNode> {
        let mut result = Vec::new();
        for child in &self.children {
            result.push(child);
            result.extend(child.flatten());
        }
        result
    }

    /// First non-evicted node of `module_id`.
    pub fn find(&self, module_id: &ModuleId) -> Option<&DependencyNode> {
        self.flatten().into_iter().find(|n| {
            n.module_info()
                .is_some_and(|m| m.module_id() == module_id && !m.is_evicted())
        })
    }

    pub fn contains(&self, module_id: &ModuleId) -> bool {
        self.find(module_id).is_some()
    }

    /// Resolved modules, each listed once.
    pub fn involved_modules(&self) -> Vec<VersionedModule> {
        let mut result: Vec<VersionedModule> = Vec::new();
        for module in self
            .flatten()
            .into_iter()
            .filter_map(|n| n.module_info().and_then(ModuleNodeInfo::resolved_module))
        {
            if !result.iter().any(|m| m.module_id() == module.module_id()) {
                result.push(module);
            }
        }
        result
    }

    pub fn resolved_versions(&self) -> VersionProvider {
        self.involved_modules().into_iter().collect()
    }

    /// Drops the modules `excludes` designate, subtrees included. A rule
    /// restricted to an extension or type only drops the matching files.
    pub fn pruned(&self, excludes: &[&Exclude]) -> Self {
        let children = self
            .children
            .iter()
            .filter(|child| {
                child.module_info().map_or(true, |m| {
                    !excludes
                        .iter()
                        .any(|e| !e.is_partial() && e.matches(m.module_id()))
                })
            })
            .map(|child| {
                let mut child = child.pruned(excludes);
                if let NodeInfo::Module(info) = &mut child.info {
                    let partial: Vec<&str> = excludes
                        .iter()
                        .filter(|e| e.is_partial() && e.matches(&info.module_id))
                        .filter_map(|e| e.ext().or(e.artifact_type()))
                        .collect();
                    info.files.retain(|f| {
                        let ext = f.extension().and_then(|e| e.to_str()).unwrap_or("");
                        !partial.contains(&ext)
                    });
                }
                child
            })
            .collect();
        self.clone().with_children(children)
    }

    /// One line per node, indented as a tree. A module already expanded
    /// higher in the tree is marked `(*)` and not expanded again.
    pub fn to_strings(&self) -> Vec<String> {
        let mut lines = vec![self.label()];
        let mut expanded = HashSet::new();
        let count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            child.render(&mut lines, "", i == count - 1, &mut expanded);
        }
        lines
    }

    fn render(&self, lines: &mut Vec<String>, prefix: &str, is_last: bool, expanded: &mut HashSet<ModuleId>) {
        let connector = if is_last { "└── " } else { "├── " };
        let repeated = self
            .module_info()
            .is_some_and(|m| !m.is_evicted() && !expanded.insert(m.module_id().clone()));
        let marker = if repeated { " (*)" } else { "" };
        lines.push(format!("{prefix}{connector}{}{marker}", self.label()));
        if repeated {
            return;
        }
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            child.render(lines, &child_prefix, i == count - 1, expanded);
        }
    }

    fn label(&self) -> String {
        match &self.info {
            NodeInfo::Root(module) => module.to_string(),
            NodeInfo::Module(info) => info.to_string(),
            NodeInfo::Files(info) => info.to_string(),
        }
    }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_strings().join("\n"))
    }
}

/// Indexes of the file dependencies declared before the last declaration
/// of `module_id`; empty when the module is not declared.
fn files_declared_before(dependencies: &[&ScopedDependency], module_id: &ModuleId) -> Vec<usize> {
    let mut result = Vec::new();
    let mut pending = Vec::new();
    for (index, dependency) in dependencies.iter().enumerate() {
        match dependency.module_dependency() {
            Some(m) if m.module_id() == module_id => result.append(&mut pending),
            Some(_) => {}
            None => pending.push(index),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::dependency::{FileDependency, ModuleDependency};

    fn id(s: &str) -> ModuleId {
        ModuleId::parse(s).unwrap()
    }

    fn module(s: &str, version: &str, files: &[&str], children: Vec<DependencyNode>) -> DependencyNode {
        let info = ModuleNodeInfo::new(id(s), VersionRange::of(version).unwrap(), Version::new(version))
            .with_files(files.iter().map(PathBuf::from).collect());
        DependencyNode::module(info, children)
    }

    fn root() -> DependencyNode {
        DependencyNode::root(VersionedModule::parse("my:app:1.0").unwrap())
    }

    #[test]
    fn all_files_depth_first_without_duplicates() {
        let tree = root().with_children(vec![
            module("g:a", "1.0", &["a.jar"], vec![module("g:c", "1.0", &["c.jar"], vec![])]),
            module("g:b", "1.0", &["b.jar"], vec![module("g:c", "1.0", &["c.jar"], vec![])]),
        ]);
        assert_eq!(
            tree.all_files(),
            vec![PathBuf::from("a.jar"), PathBuf::from("c.jar"), PathBuf::from("b.jar")]
        );
    }

    #[test]
    fn merge_skips_present_modules() {
        let compile = root().with_children(vec![module("g:a", "1.0", &["a.jar"], vec![])]);
        let runtime = root().with_children(vec![
            module("g:a", "1.0", &["a.jar"], vec![]),
            module("g:r", "2.0", &["r.jar"], vec![]),
        ]);
        let merged = compile.merge(&runtime);
        assert_eq!(merged.children().len(), 2);
        assert_eq!(merged.all_files(), vec![PathBuf::from("a.jar"), PathBuf::from("r.jar")]);
    }

    #[test]
    fn non_modules_follow_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.jar");
        let last = dir.path().join("last.jar");
        std::fs::write(&first, "x").unwrap();
        std::fs::write(&last, "x").unwrap();

        let declared = [
            ScopedDependency::of(ModuleDependency::parse("g:a:1.0").unwrap()),
            ScopedDependency::of(FileDependency::of([first.clone()])),
            ScopedDependency::of(ModuleDependency::parse("g:b:1.0").unwrap()),
            ScopedDependency::of(FileDependency::of([last.clone()])),
        ];
        let refs: Vec<&ScopedDependency> = declared.iter().collect();
        let tree = root()
            .with_children(vec![
                module("g:a", "1.0", &["a.jar"], vec![]),
                module("g:b", "1.0", &["b.jar"], vec![]),
            ])
            .merge_non_modules(&refs)
            .unwrap();
        assert_eq!(
            tree.all_files(),
            vec![PathBuf::from("a.jar"), first, PathBuf::from("b.jar"), last]
        );
    }

    #[test]
    fn find_ignores_evicted() {
        let evicted = DependencyNode::module(
            ModuleNodeInfo::evicted(id("g:c"), VersionRange::of("0.9").unwrap()),
            vec![],
        );
        let tree = root().with_children(vec![module("g:a", "1.0", &[], vec![evicted])]);
        assert!(tree.contains(&id("g:a")));
        assert!(!tree.contains(&id("g:c")));
        assert_eq!(tree.flatten().len(), 2);
        assert_eq!(tree.resolved_versions().len(), 1);
    }

    #[test]
    fn pruning_removes_subtrees_everywhere() {
        let tree = root().with_children(vec![
            module("g:a", "1.0", &["a.jar"], vec![module("g:b", "1.0", &["b.jar"], vec![])]),
            module("g:b", "1.0", &["b.jar"], vec![]),
        ]);
        let exclude = Exclude::parse("g:b").unwrap();
        let pruned = tree.pruned(&[&exclude]);
        assert!(!pruned.contains(&id("g:b")));
        assert_eq!(pruned.pruned(&[&exclude]), pruned);
    }

    #[test]
    fn partial_exclusion_drops_matching_files() {
        let tree = root().with_children(vec![module("g:a", "1.0", &["a.jar", "a.zip"], vec![])]);
        let exclude = Exclude::parse("g:a").unwrap().with_ext("zip");
        assert_eq!(tree.pruned(&[&exclude]).all_files(), vec![PathBuf::from("a.jar")]);
    }

    #[test]
    fn rendering_marks_repeated_modules() {
        let c = || module("g:c", "1.0", &[], vec![module("g:d", "1.0", &[], vec![])]);
        let tree = root().with_children(vec![
            module("g:a", "1.0", &[], vec![c()]),
            module("g:b", "1.0", &[], vec![c()]),
        ]);
        assert_eq!(
            tree.to_strings(),
            vec![
                "my:app:1.0",
                "├── g:a:1.0",
                "│   └── g:c:1.0",
                "│       └── g:d:1.0",
                "└── g:b:1.0",
                "    └── g:c:1.0 (*)",
            ]
        );
    }
}
