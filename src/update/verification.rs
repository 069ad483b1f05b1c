use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::core::UpdaterError;

/// Verifies downloaded release archives against published SHA-256 sums.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Compute the hex-encoded SHA-256 of a file.
    pub async fn compute_sha256(file_path: &Path) -> Result<String> {
        debug!("Computing SHA256 checksum for: {:?}", file_path);

        let contents = fs::read(file_path)
            .await
            .with_context(|| format!("Failed to read file: {file_path:?}"))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Verify a file against an expected checksum.
    ///
    /// The expected value may carry a `sha256:` prefix and is compared
    /// case-insensitively.
    pub async fn verify_checksum(file_path: &Path, expected_checksum: &str) -> Result<()> {
        info!("Verifying checksum for: {:?}", file_path);

        let actual = Self::compute_sha256(file_path).await?;
        let expected = normalize(expected_checksum);

        if actual != expected {
            return Err(UpdaterError::ChecksumMismatch {
                file: file_path.display().to_string(),
                expected,
                actual,
            }
            .into());
        }

        info!("Checksum verification successful");
        Ok(())
    }
}

fn normalize(checksum: &str) -> String {
    let trimmed = checksum.trim();
    trimmed.strip_prefix("sha256:").unwrap_or(trimmed).to_lowercase()
}
