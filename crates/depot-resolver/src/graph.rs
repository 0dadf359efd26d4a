//! Module graph built while walking POMs, turned into a tree afterwards.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use depot_core::module::{ModuleId, VersionedModule};
use depot_core::scope::Scope;
use depot_core::version::{Version, VersionRange};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::node::{DependencyNode, ModuleNodeInfo};

/// A module at its selected version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub module_id: ModuleId,
    pub version: Version,
    pub files: Vec<PathBuf>,
}

impl ResolvedModule {
    pub fn new(module_id: ModuleId, version: Version) -> Self {
        Self {
            module_id,
            version,
            files: Vec::new(),
        }
    }

    pub fn versioned(&self) -> VersionedModule {
        self.module_id.with_version(self.version.clone())
    }
}

/// How a module was requested by its parent.
#[derive(Debug, Clone)]
pub struct DepEdge {
    pub requested: VersionRange,
    /// Scopes of a direct declaration; empty for transitive ones.
    pub declared_scopes: Vec<Scope>,
    /// The requested version lost against a nearer one.
    pub evicted: bool,
}

/// Resolved modules keyed by module id, one version each.
pub struct DependencyGraph {
    graph: DiGraph<ResolvedModule, DepEdge>,
    index: HashMap<ModuleId, NodeIndex>,
    root: Option<NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            root: None,
        }
    }

    /// Add or retrieve a node. If the module is already present, returns the existing index.
    pub fn add_node(&mut self, node: ResolvedModule) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.module_id) {
            return idx;
        }
        let key = node.module_id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    /// The module being resolved; not indexed, so a dependency on a module
    /// with the same id is still walked.
    pub fn set_root(&mut self, node: ResolvedModule) -> NodeIndex {
        let idx = self.graph.add_node(node);
        self.root = Some(idx);
        idx
    }

    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: DepEdge) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    pub fn find(&self, module_id: &ModuleId) -> Option<NodeIndex> {
        self.index.get(module_id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &ResolvedModule {
        &self.graph[idx]
    }

    /// Direct dependencies of a node, in the order they were added.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut edges: Vec<_> = self.graph.edges_directed(idx, Direction::Outgoing).collect();
        edges.sort_by_key(|e| e.id());
        edges.into_iter().map(|e| (e.target(), e.weight())).collect()
    }

    /// Path from the root down to `module_id`, both ends included.
    pub fn find_path(&self, module_id: &ModuleId) -> Option<Vec<&ResolvedModule>> {
        let root = self.root?;
        let target = self.find(module_id)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (child, _) in self.dependencies_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// The tree seen from the root. A module reached again is listed
    /// under each parent but its dependencies are expanded only once.
    pub fn to_tree(&self) -> Option<DependencyNode> {
        let root = self.root?;
        let mut expanded = HashSet::new();
        expanded.insert(root);
        let children = self.subtrees(root, &mut expanded);
        Some(DependencyNode::root(self.graph[root].versioned()).with_children(children))
    }

    fn subtrees(&self, idx: NodeIndex, expanded: &mut HashSet<NodeIndex>) -> Vec<DependencyNode> {
        let mut result = Vec::new();
        for (child, edge) in self.dependencies_of(idx) {
            let module = &self.graph[child];
            if edge.evicted {
                let info = ModuleNodeInfo::evicted(module.module_id.clone(), edge.requested.clone())
                    .with_scopes(edge.declared_scopes.clone());
                result.push(DependencyNode::module(info, Vec::new()));
                continue;
            }
            let info = ModuleNodeInfo::new(
                module.module_id.clone(),
                edge.requested.clone(),
                module.version.clone(),
            )
            .with_scopes(edge.declared_scopes.clone())
            .with_files(module.files.clone());
            let grandchildren = if expanded.insert(child) {
                self.subtrees(child, expanded)
            } else {
                Vec::new()
            };
            result.push(DependencyNode::module(info, grandchildren));
        }
        result
    }

    /// Number of nodes (excluding root).
    pub fn len(&self) -> usize {
        let total = self.graph.node_count();
        if self.root.is_some() {
            total.saturating_sub(1)
        } else {
            total
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_node(module: &str, version: &str) -> ResolvedModule {
        ResolvedModule::new(ModuleId::parse(module).unwrap(), Version::new(version))
    }

    fn edge(requested: &str) -> DepEdge {
        DepEdge {
            requested: VersionRange::of(requested).unwrap(),
            declared_scopes: Vec::new(),
            evicted: false,
        }
    }

    fn sample() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        let root = g.set_root(make_node("com.example:app", "1.0"));
        let a = g.add_node(make_node("org.a:a", "1.0"));
        let b = g.add_node(make_node("org.b:b", "2.0"));
        let c = g.add_node(make_node("org.c:c", "3.0"));
        g.add_edge(root, a, edge("1.0"));
        g.add_edge(root, b, edge("2.0"));
        g.add_edge(a, c, edge("3.0"));
        g.add_edge(
            b,
            c,
            DepEdge {
                evicted: true,
                ..edge("2.5")
            },
        );
        g
    }

    #[test]
    fn add_and_find() {
        let mut g = DependencyGraph::new();
        let idx = g.add_node(make_node("org.example:lib", "1.0"));
        assert_eq!(g.find(&ModuleId::parse("org.example:lib").unwrap()), Some(idx));
        assert_eq!(g.node(idx).version, Version::new("1.0"));
    }

    #[test]
    fn duplicate_add_returns_same_index() {
        let mut g = DependencyGraph::new();
        let idx1 = g.add_node(make_node("org.example:lib", "1.0"));
        let idx2 = g.add_node(make_node("org.example:lib", "1.1"));
        assert_eq!(idx1, idx2);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn dependencies_keep_insertion_order() {
        let g = sample();
        let root = g.root().unwrap();
        let names: Vec<&str> = g
            .dependencies_of(root)
            .iter()
            .map(|(idx, _)| g.node(*idx).module_id.name())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn find_path_from_root() {
        let g = sample();
        let path = g.find_path(&ModuleId::parse("org.c:c").unwrap()).unwrap();
        let names: Vec<&str> = path.iter().map(|n| n.module_id.name()).collect();
        assert_eq!(names, vec!["app", "a", "c"]);
        assert!(g.find_path(&ModuleId::parse("org.missing:lib").unwrap()).is_none());
    }

    #[test]
    fn tree_shows_evictions() {
        let tree = sample().to_tree().unwrap();
        assert_eq!(
            tree.to_strings(),
            vec![
                "com.example:app:1.0",
                "├── org.a:a:1.0",
                "│   └── org.c:c:3.0",
                "└── org.b:b:2.0",
                "    └── org.c:c:2.5 (evicted)",
            ]
        );
    }
}
