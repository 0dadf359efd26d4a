//! Core data types for depot.
//!
//! This crate defines the vocabulary shared by resolution and publication:
//! scopes and scope mappings, module identities, versions and version ranges,
//! dependencies and dependency sets, version providers, publications, and
//! user configuration.
//!
//! Every value type here is immutable once built; "mutators" return new
//! values. This crate is free of network I/O.

pub mod config;
pub mod dependency;
pub mod dependency_set;
pub mod module;
pub mod publication;
pub mod scope;
pub mod version;
pub mod version_provider;
