//! Checksum sidecars: computing them for publication and verifying
//! downloaded content against them.

use std::path::Path;

use depot_core::config::ChecksumAlgorithm;
use depot_util::errors::{DepotError, DepotResult};
use depot_util::hash;

use crate::transport::Transport;

/// Lowercase hex digest of a file.
pub fn digest_file(path: &Path, algorithm: ChecksumAlgorithm) -> DepotResult<String> {
    let digest = match algorithm {
        ChecksumAlgorithm::Md5 => hash::md5_file(path),
        ChecksumAlgorithm::Sha1 => hash::sha1_file(path),
        ChecksumAlgorithm::Sha256 => hash::sha256_file(path),
        ChecksumAlgorithm::Sha512 => hash::sha512_file(path),
    };
    digest.map_err(|e| {
        DepotError::Generic {
            message: format!("Failed to compute {} of {}: {e}", algorithm.suffix(), path.display()),
        }
        .into()
    })
}

pub fn digest_bytes(data: &[u8], algorithm: ChecksumAlgorithm) -> String {
    match algorithm {
        ChecksumAlgorithm::Md5 => hash::md5_bytes(data),
        ChecksumAlgorithm::Sha1 => hash::sha1_bytes(data),
        ChecksumAlgorithm::Sha256 => hash::sha256_bytes(data),
        ChecksumAlgorithm::Sha512 => hash::sha512_bytes(data),
    }
}

/// Verify downloaded data against the sidecars next to `path`.
///
/// Tries SHA-256 first, then SHA-1, then MD5. Logs a warning if no
/// sidecar is available.
pub fn verify(transport: &dyn Transport, path: &str, data: &[u8]) -> DepotResult<()> {
    for algorithm in [
        ChecksumAlgorithm::Sha256,
        ChecksumAlgorithm::Sha1,
        ChecksumAlgorithm::Md5,
    ] {
        let sidecar = format!("{path}.{}", algorithm.suffix());
        let content = match transport.read_bytes(&sidecar) {
            Ok(Some(content)) => content,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Unreadable checksum {sidecar}: {e}");
                continue;
            }
        };
        let expected = extract_hash(&String::from_utf8_lossy(&content));
        let actual = digest_bytes(data, algorithm);
        return check(&actual, &expected, algorithm, path);
    }
    tracing::warn!("No checksum sidecar found for {path}");
    Ok(())
}

fn check(actual: &str, expected: &str, algorithm: ChecksumAlgorithm, path: &str) -> DepotResult<()> {
    if actual.eq_ignore_ascii_case(expected) {
        tracing::debug!("{} ok for {path}", algorithm.suffix());
        Ok(())
    } else {
        Err(DepotError::Transport {
            message: format!(
                "{} mismatch for {path}: expected {expected}, got {actual}",
                algorithm.suffix()
            ),
        }
        .into())
    }
}

/// Checksum files may contain just the hash, or `hash  filename`.
fn extract_hash(content: &str) -> String {
    content.split_whitespace().next().unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FsTransport;

    #[test]
    fn extract_hash_simple() {
        assert_eq!(extract_hash("abc123\n"), "abc123");
    }

    #[test]
    fn extract_hash_with_filename() {
        assert_eq!(extract_hash("abc123  my-lib-1.0.jar\n"), "abc123");
    }

    #[test]
    fn sha256_computation() {
        assert_eq!(
            digest_bytes(b"hello world", ChecksumAlgorithm::Sha256),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn md5_computation() {
        assert_eq!(
            digest_bytes(b"hello world", ChecksumAlgorithm::Md5),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[test]
    fn verify_against_sidecar() {
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(
            repo.path().join("a.jar.sha1"),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed  a.jar\n",
        )
        .unwrap();
        let transport = FsTransport::new(repo.path());
        assert!(verify(&transport, "a.jar", b"hello world").is_ok());
        assert!(verify(&transport, "a.jar", b"tampered").is_err());
        assert!(verify(&transport, "other.jar", b"anything").is_ok());
    }
}
