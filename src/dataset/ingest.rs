//! CSV ingestion.
//!
//! The single place where raw continuous labels become class indices. The
//! converter reads a CSV with a `target` column, maps each target through
//! [`DatasetContract::map_raw_label`] once, enforces a uniform feature
//! width, and persists the result as a dataset file.

use std::path::Path;

use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::dataset::schema::{Dataset, DatasetContract};
use crate::dataset::store;
use crate::error::StoreError;

/// Column holding the raw continuous label.
pub const TARGET_COLUMN: &str = "target";

/// Summary of one CSV conversion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub samples: usize,
    pub feature_dim: usize,
    pub classes: Vec<i64>,
}

/// Convert a CSV at `input` into a dataset file at `output`.
///
/// Fails on a missing `target` column, ragged lines, non-numeric or
/// non-finite values, and any dataset that violates `contract` (including
/// a feature width the model tensor cannot be reshaped from).
pub async fn ingest_csv(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    contract: &DatasetContract,
) -> Result<IngestReport, StoreError> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(StoreError::NotFound(input.to_path_buf()));
    }
    let contents = fs::read_to_string(input).await?;

    let mut lines = contents.lines();
    let header = lines
        .next()
        .ok_or_else(|| StoreError::MalformedCsv("file is empty".to_string()))?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let target_idx = columns
        .iter()
        .position(|c| *c == TARGET_COLUMN)
        .ok_or_else(|| {
            StoreError::MalformedCsv(format!("missing '{}' column", TARGET_COLUMN))
        })?;

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (offset, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Header is line 1, so data starts at line 2.
        let line_no = offset + 2;

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != columns.len() {
            return Err(StoreError::MalformedCsv(format!(
                "line {}: {} fields, header has {}",
                line_no,
                fields.len(),
                columns.len()
            )));
        }

        let mut row = Vec::with_capacity(columns.len() - 1);
        let mut raw_label = 0.0;
        for (idx, field) in fields.iter().enumerate() {
            let value: f64 = field.parse().map_err(|_| {
                StoreError::MalformedCsv(format!(
                    "line {}: '{}' is not a number",
                    line_no, field
                ))
            })?;
            if !value.is_finite() {
                return Err(StoreError::MalformedCsv(format!(
                    "line {}: non-finite value '{}'",
                    line_no, field
                )));
            }
            if idx == target_idx {
                raw_label = value;
            } else {
                row.push(value);
            }
        }

        labels.push(contract.map_raw_label(raw_label));
        rows.push(row);
    }

    let dataset = Dataset::from_rows(rows, labels)?;
    contract.validate(&dataset)?;
    // Element-count check before any (N, feature_dim, 1) reshape downstream.
    contract.model_tensor(&dataset)?;

    store::write_dataset(output, &dataset).await?;

    let mut classes: Vec<i64> = dataset.labels().to_vec();
    classes.sort_unstable();
    classes.dedup();

    info!(
        input = %input.display(),
        output = %output.display(),
        samples = dataset.len(),
        "converted CSV to dataset file"
    );

    Ok(IngestReport {
        samples: dataset.len(),
        feature_dim: dataset.feature_dim(),
        classes,
    })
}
