//! Dataset file persistence.
//!
//! Datasets cross stage boundaries as JSON files so every collaborator can
//! read them. Each file embeds a SHA-256 checksum over the numeric payload;
//! reads verify it, so truncated or corrupted stage outputs fail closed
//! instead of flowing downstream.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::dataset::schema::Dataset;
use crate::error::StoreError;

/// On-disk dataset representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile {
    pub created_at: DateTime<Utc>,
    pub feature_dim: usize,
    pub checksum: String,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<i64>,
}

/// Payload view hashed into the checksum. Field order matters: the writer
/// and the verifier must serialize identically.
#[derive(Serialize)]
struct ChecksumPayload<'a> {
    features: &'a [Vec<f64>],
    labels: &'a [i64],
}

fn payload_checksum(features: &[Vec<f64>], labels: &[i64]) -> Result<String, StoreError> {
    let payload = serde_json::to_vec(&ChecksumPayload { features, labels })?;
    let mut hasher = Sha256::new();
    hasher.update(&payload);
    Ok(hex::encode(hasher.finalize()))
}

/// Write `dataset` to `path` as JSON, creating parent directories.
pub async fn write_dataset(path: impl AsRef<Path>, dataset: &Dataset) -> Result<(), StoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let features = dataset.to_rows();
    let labels = dataset.labels().to_vec();
    let checksum = payload_checksum(&features, &labels)?;

    let file = DatasetFile {
        created_at: Utc::now(),
        feature_dim: dataset.feature_dim(),
        checksum,
        features,
        labels,
    };

    let json = serde_json::to_string_pretty(&file)?;
    let mut handle = File::create(path).await?;
    handle.write_all(json.as_bytes()).await?;
    handle.sync_all().await?;

    debug!(path = %path.display(), samples = dataset.len(), "saved dataset");
    Ok(())
}

/// Read a dataset file, verifying its checksum and structure.
pub async fn read_dataset(path: impl AsRef<Path>) -> Result<Dataset, StoreError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path).await?;
    let file: DatasetFile =
        serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let computed = payload_checksum(&file.features, &file.labels)?;
    if computed != file.checksum {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!(
                "checksum mismatch: recorded {}, computed {}",
                file.checksum, computed
            ),
        });
    }

    let dataset = Dataset::from_rows(file.features, file.labels)?;
    if dataset.feature_dim() != file.feature_dim && !dataset.is_empty() {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!(
                "recorded feature_dim {} does not match row width {}",
                file.feature_dim,
                dataset.feature_dim()
            ),
        });
    }

    Ok(dataset)
}
