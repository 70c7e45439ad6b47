//! Artifact download + checksum verification. A deliberately excluded
//! collaborator (§1): this crate ships only the contract and one blocking
//! default implementation to link against; a production deployment may
//! swap in a caching/retrying downloader without touching the Listener.
//! Ported from `zokrates_eth_file_downloader.py`.

use std::path::Path;

use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to download {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("checksum mismatch for {path}")]
    ChecksumMismatch { path: String },
}

/// Fetch one artifact and verify its SHA-256 against the on-chain
/// published digest. Mirrors `ZokratesEthFileDownloader.download_required_files`
/// (one file at a time) plus `file_checksum`.
pub trait ArtifactDownloader: Send + Sync {
    fn fetch(&self, url: &str, destination: &Path, expected_sha2: &BigUint) -> Result<(), DownloadError>;
}

/// `use_existing_data`-aware default: skip the HTTP round-trip if the
/// destination already exists, always re-verify the checksum.
pub struct HttpArtifactDownloader {
    pub use_existing_data: bool,
    client: reqwest::blocking::Client,
}

impl HttpArtifactDownloader {
    pub fn new(use_existing_data: bool) -> Self {
        Self {
            use_existing_data,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl ArtifactDownloader for HttpArtifactDownloader {
    fn fetch(&self, url: &str, destination: &Path, expected_sha2: &BigUint) -> Result<(), DownloadError> {
        if !(self.use_existing_data && destination.exists()) {
            let response = self
                .client
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|source| DownloadError::Request {
                    url: url.to_string(),
                    source,
                })?;
            let bytes = response.bytes().map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?;
            std::fs::write(destination, &bytes).map_err(|source| DownloadError::Write {
                path: destination.display().to_string(),
                source,
            })?;
        }
        verify_checksum(destination, expected_sha2)
    }
}

fn verify_checksum(path: &Path, expected: &BigUint) -> Result<(), DownloadError> {
    let bytes = std::fs::read(path).map_err(|source| DownloadError::Write {
        path: path.display().to_string(),
        source,
    })?;
    let digest = Sha256::digest(&bytes);
    let computed = BigUint::from_bytes_be(&digest);
    if &computed == expected {
        Ok(())
    } else {
        Err(DownloadError::ChecksumMismatch {
            path: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_matches_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, b"hello world").unwrap();
        let digest = Sha256::digest(b"hello world");
        let expected = BigUint::from_bytes_be(&digest);
        assert!(verify_checksum(&path, &expected).is_ok());
    }

    #[test]
    fn checksum_rejects_tampered_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, b"hello world").unwrap();
        let wrong = BigUint::from(1u32);
        assert!(matches!(
            verify_checksum(&path, &wrong),
            Err(DownloadError::ChecksumMismatch { .. })
        ));
    }
}
