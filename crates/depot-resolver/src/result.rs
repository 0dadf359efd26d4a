//! What a resolution hands back to its caller.

use std::path::PathBuf;

use depot_core::module::{ModuleId, VersionedModule};
use depot_core::version_provider::VersionProvider;
use depot_util::errors::{DepotError, DepotResult};

use crate::node::DependencyNode;
use crate::report::ErrorReport;

/// Resolved tree and the problems met building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveResult {
    tree: DependencyNode,
    error_report: ErrorReport,
}

impl ResolveResult {
    pub fn new(tree: DependencyNode, error_report: ErrorReport) -> Self {
        Self { tree, error_report }
    }

    /// Artifact files in declaration order, each listed once.
    pub fn files(&self) -> Vec<PathBuf> {
        self.tree.all_files()
    }

    pub fn tree(&self) -> &DependencyNode {
        &self.tree
    }

    pub fn error_report(&self) -> &ErrorReport {
        &self.error_report
    }

    /// Versions the modules were resolved to.
    pub fn version_provider(&self) -> VersionProvider {
        self.tree.resolved_versions()
    }

    pub fn contains_module(&self, module_id: &ModuleId) -> bool {
        self.tree.contains(module_id)
    }

    pub fn involved_modules(&self) -> Vec<VersionedModule> {
        self.tree.involved_modules()
    }

    /// Both trees merged under this result's root, problems of both.
    pub fn and(&self, other: &ResolveResult) -> Self {
        Self {
            tree: self.tree.merge(&other.tree),
            error_report: self.error_report.merge(&other.error_report),
        }
    }

    /// Fails with the error report followed by the partial tree.
    pub fn assert_no_error(&self) -> DepotResult<&Self> {
        if !self.error_report.has_errors() {
            return Ok(self);
        }
        Err(DepotError::Resolution {
            message: format!("{}\n{}", self.error_report, self.tree),
        }
        .into())
    }
}
