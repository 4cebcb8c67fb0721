//! File-level augmentation.
//!
//! Reads a dataset file, runs the engine, persists the result and returns
//! the [`AugmentationResult`] record. This is the same operation the
//! augmenter collaborator performs, available in-process for the CLI and
//! for tests.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::augment::engine::AugmentationEngine;
use crate::dataset::store;
use crate::error::{AugmentError, StoreError};
use crate::stage::AugmentationResult;

/// Errors from a file-level augmentation run.
#[derive(Debug, Error)]
pub enum AugmentRunError {
    #[error("augmentation failed: {0}")]
    Augment(#[from] AugmentError),

    #[error("dataset store error: {0}")]
    Store(#[from] StoreError),
}

/// Run one augmentation over dataset files.
///
/// `seed` fixes the engine's random stream; `None` draws a fresh seed.
pub async fn augment_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    technique: &str,
    params: &serde_json::Value,
    seed: Option<u64>,
) -> Result<AugmentationResult, AugmentRunError> {
    let input = input.as_ref();
    let output = output.as_ref();

    let dataset = store::read_dataset(input).await?;

    let mut engine = match seed {
        Some(seed) => AugmentationEngine::with_seed(seed),
        None => AugmentationEngine::new(),
    };
    let batch = engine.apply_named(&dataset, technique, params)?;

    store::write_dataset(output, &batch.dataset).await?;

    info!(
        technique,
        seed = engine.seed(),
        samples = batch.dataset.len(),
        mix_ratio = batch.mix_ratio,
        output = %output.display(),
        "augmentation complete"
    );

    Ok(AugmentationResult::success(
        batch.mix_ratio,
        output.display().to_string(),
        batch.dataset.len(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use tempfile::TempDir;

    async fn write_input(dir: &TempDir, samples: usize) -> std::path::PathBuf {
        let rows: Vec<Vec<f64>> = (0..samples)
            .map(|i| (0..20).map(|j| ((i + j) % 10) as f64 / 10.0).collect())
            .collect();
        let labels = (0..samples).map(|i| (i % 5) as i64).collect();
        let dataset = Dataset::from_rows(rows, labels).unwrap();
        let path = dir.path().join("input.json");
        store::write_dataset(&path, &dataset).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_augment_file_mixing() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, 8).await;
        let output = dir.path().join("augmented.json");

        let result = augment_file(
            &input,
            &output,
            "mixing",
            &serde_json::json!({ "beta": 1.0 }),
            Some(42),
        )
        .await
        .unwrap();

        assert!(result.is_success());
        assert_eq!(result.output_samples, 8);
        assert!((0.0..=1.0).contains(&result.mix_ratio));

        let augmented = store::read_dataset(&output).await.unwrap();
        assert_eq!(augmented.len(), 8);
    }

    #[tokio::test]
    async fn test_augment_file_seeded_runs_match() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, 6).await;
        let out_a = dir.path().join("a.json");
        let out_b = dir.path().join("b.json");
        let params = serde_json::json!({ "beta": 0.5 });

        let a = augment_file(&input, &out_a, "mixing", &params, Some(7))
            .await
            .unwrap();
        let b = augment_file(&input, &out_b, "mixing", &params, Some(7))
            .await
            .unwrap();

        assert_eq!(a.mix_ratio, b.mix_ratio);
        let dataset_a = store::read_dataset(&out_a).await.unwrap();
        let dataset_b = store::read_dataset(&out_b).await.unwrap();
        assert_eq!(dataset_a, dataset_b);
    }

    #[tokio::test]
    async fn test_augment_file_unknown_technique() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, 4).await;
        let output = dir.path().join("augmented.json");

        let result =
            augment_file(&input, &output, "cutout", &serde_json::json!({}), None).await;
        match result {
            Err(AugmentRunError::Augment(AugmentError::UnknownTechnique(name))) => {
                assert_eq!(name, "cutout")
            }
            other => panic!("expected UnknownTechnique, got {:?}", other),
        }
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_augment_file_missing_input() {
        let dir = TempDir::new().unwrap();
        let result = augment_file(
            dir.path().join("absent.json"),
            dir.path().join("out.json"),
            "basic",
            &serde_json::Value::Null,
            None,
        )
        .await;
        assert!(matches!(
            result,
            Err(AugmentRunError::Store(StoreError::NotFound(_)))
        ));
    }
}
