//! Repository protocol: layouts, maven-metadata.xml, POM and ivy.xml
//! descriptors, transports, checksums, signing and the publication engine.

pub mod auth;
pub mod cache;
pub mod checksum;
pub mod ivy;
pub mod layout;
pub mod metadata;
pub mod pom;
pub mod publish;
pub mod repository;
pub mod signer;
pub mod transport;
pub mod xml;
