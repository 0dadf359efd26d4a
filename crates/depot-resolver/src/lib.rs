//! Dependency resolution: turns a dependency set into artifact files and a
//! dependency tree, through a pluggable module resolver.

pub mod coordinator;
pub mod graph;
pub mod node;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod result;

pub use coordinator::DependencyResolver;
pub use resolver::{ModuleResolver, ResolutionParameters};
pub use result::ResolveResult;
