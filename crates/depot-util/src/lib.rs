//! Shared utilities for depot.
//!
//! This crate provides the cross-cutting pieces used by the other depot crates:
//! the unified error type, file and byte digests, external process spawning,
//! and a handful of filesystem helpers.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;
