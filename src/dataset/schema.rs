//! In-memory dataset representation and the contract enforced at every
//! stage boundary.
//!
//! A dataset is an N x D feature matrix plus one integer class label per
//! row. The contract pins the model-facing feature width to 20 and the
//! class set to {0..4}; raw continuous labels are mapped to classes exactly
//! once, at the CSV boundary ([`DatasetContract::map_raw_label`]).

use ndarray::{Array2, Array3};

use crate::error::ContractError;

/// Feature width every model-bound dataset must satisfy.
pub const FEATURE_DIM: usize = 20;

/// Number of label classes; valid labels are `0..=CLASS_COUNT - 1`.
pub const CLASS_COUNT: i64 = 5;

/// A numeric dataset: features plus aligned class labels.
///
/// Construction goes through [`Dataset::from_rows`] or [`Dataset::new`],
/// both of which enforce feature/label alignment, so a `Dataset` value is
/// always rectangular.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f64>,
    labels: Vec<i64>,
}

impl Dataset {
    /// Build a dataset from per-sample feature rows.
    ///
    /// Every row must have the same width as the first; ragged input is a
    /// shape mismatch, not a silent truncation.
    pub fn from_rows(rows: Vec<Vec<f64>>, labels: Vec<i64>) -> Result<Self, ContractError> {
        let n = rows.len();
        if n != labels.len() {
            return Err(ContractError::ShapeMismatch(format!(
                "{} feature rows but {} labels",
                n,
                labels.len()
            )));
        }

        let width = rows.first().map(|row| row.len()).unwrap_or(0);
        let mut flat = Vec::with_capacity(n * width);
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(ContractError::ShapeMismatch(format!(
                    "row {} has {} features, expected {}",
                    row_idx,
                    row.len(),
                    width
                )));
            }
            flat.extend_from_slice(row);
        }

        let features = Array2::from_shape_vec((n, width), flat)
            .map_err(|e| ContractError::ShapeMismatch(e.to_string()))?;

        Ok(Self { features, labels })
    }

    /// Wrap an existing feature matrix and labels.
    pub fn new(features: Array2<f64>, labels: Vec<i64>) -> Result<Self, ContractError> {
        if features.nrows() != labels.len() {
            return Err(ContractError::ShapeMismatch(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        Ok(Self { features, labels })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Feature width (columns per sample).
    pub fn feature_dim(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    /// Per-sample feature rows, for serialization.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.features
            .outer_iter()
            .map(|row| row.to_vec())
            .collect()
    }
}

/// Structural rules a dataset must satisfy before crossing a stage boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetContract {
    pub feature_dim: usize,
    pub class_count: i64,
}

impl Default for DatasetContract {
    fn default() -> Self {
        Self {
            feature_dim: FEATURE_DIM,
            class_count: CLASS_COUNT,
        }
    }
}

impl DatasetContract {
    /// Validate sample presence and label classes.
    ///
    /// Feature/label alignment is already guaranteed by the `Dataset`
    /// constructors; this adds the emptiness and class range checks.
    pub fn validate(&self, dataset: &Dataset) -> Result<(), ContractError> {
        if dataset.is_empty() {
            return Err(ContractError::EmptyDataset);
        }

        let max_class = self.class_count - 1;
        for (row, &label) in dataset.labels().iter().enumerate() {
            if label < 0 || label > max_class {
                return Err(ContractError::LabelOutOfRange {
                    row,
                    label,
                    max_class,
                });
            }
        }

        Ok(())
    }

    /// Map one raw continuous label in [0, 1] to a class index.
    ///
    /// `floor(raw * 4)` under the default contract, so 1.0 maps to class 4.
    /// This runs exactly once, at the CSV boundary. Applying it a second
    /// time pushes classes >= 2 outside the valid range, which
    /// [`DatasetContract::validate`] then reports.
    pub fn map_raw_label(&self, raw: f64) -> i64 {
        (raw * (self.class_count - 1) as f64).floor() as i64
    }

    /// Reshape the features into the (N, feature_dim, 1) tensor the trainer
    /// consumes.
    ///
    /// The element count must divide exactly; anything else is a fatal shape
    /// mismatch, never a truncation or padding.
    pub fn model_tensor(&self, dataset: &Dataset) -> Result<Array3<f64>, ContractError> {
        let n = dataset.len();
        let total = dataset.features().len();
        if total != n * self.feature_dim {
            return Err(ContractError::ShapeMismatch(format!(
                "cannot reshape {} values into ({}, {}, 1)",
                total, n, self.feature_dim
            )));
        }

        dataset
            .features()
            .clone()
            .into_shape_with_order((n, self.feature_dim, 1))
            .map_err(|e| ContractError::ShapeMismatch(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_dataset(samples: usize, width: usize) -> Dataset {
        let rows: Vec<Vec<f64>> = (0..samples)
            .map(|i| (0..width).map(|j| (i * width + j) as f64 * 0.001).collect())
            .collect();
        let labels = (0..samples).map(|i| (i % 5) as i64).collect();
        Dataset::from_rows(rows, labels).unwrap()
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let rows = vec![vec![0.1, 0.2], vec![0.3]];
        let result = Dataset::from_rows(rows, vec![0, 1]);
        assert!(matches!(result, Err(ContractError::ShapeMismatch(_))));
    }

    #[test]
    fn test_from_rows_rejects_label_count_mismatch() {
        let rows = vec![vec![0.1, 0.2], vec![0.3, 0.4]];
        let result = Dataset::from_rows(rows, vec![0]);
        assert!(matches!(result, Err(ContractError::ShapeMismatch(_))));
    }

    #[test]
    fn test_validate_empty_dataset() {
        let dataset = Dataset::from_rows(vec![], vec![]).unwrap();
        let result = DatasetContract::default().validate(&dataset);
        assert!(matches!(result, Err(ContractError::EmptyDataset)));
    }

    #[test]
    fn test_validate_accepts_full_class_range() {
        let dataset = create_dataset(5, 20);
        assert!(DatasetContract::default().validate(&dataset).is_ok());
    }

    #[test]
    fn test_validate_rejects_label_above_range() {
        let dataset = Dataset::from_rows(vec![vec![0.0; 20], vec![0.0; 20]], vec![0, 5]).unwrap();
        let result = DatasetContract::default().validate(&dataset);
        match result {
            Err(ContractError::LabelOutOfRange { row, label, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(label, 5);
            }
            other => panic!("expected LabelOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_negative_label() {
        let dataset = Dataset::from_rows(vec![vec![0.0; 20]], vec![-1]).unwrap();
        let result = DatasetContract::default().validate(&dataset);
        assert!(matches!(
            result,
            Err(ContractError::LabelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_map_raw_label_boundaries() {
        let contract = DatasetContract::default();
        assert_eq!(contract.map_raw_label(0.0), 0);
        assert_eq!(contract.map_raw_label(0.24), 0);
        assert_eq!(contract.map_raw_label(0.25), 1);
        assert_eq!(contract.map_raw_label(0.3), 1);
        assert_eq!(contract.map_raw_label(0.6), 2);
        assert_eq!(contract.map_raw_label(0.9), 3);
        assert_eq!(contract.map_raw_label(1.0), 4);
    }

    #[test]
    fn test_double_label_mapping_is_flagged() {
        let contract = DatasetContract::default();
        let raws = [0.0, 0.3, 0.6, 0.9, 1.0];

        let once: Vec<i64> = raws.iter().map(|&r| contract.map_raw_label(r)).collect();
        let dataset =
            Dataset::from_rows(vec![vec![0.0; 20]; raws.len()], once.clone()).unwrap();
        assert!(contract.validate(&dataset).is_ok());

        // A second application treats class indices as raw labels again.
        let twice: Vec<i64> = once
            .iter()
            .map(|&label| contract.map_raw_label(label as f64))
            .collect();
        let dataset = Dataset::from_rows(vec![vec![0.0; 20]; raws.len()], twice).unwrap();
        assert!(matches!(
            contract.validate(&dataset),
            Err(ContractError::LabelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_model_tensor_shape() {
        let dataset = create_dataset(3, 20);
        let tensor = DatasetContract::default().model_tensor(&dataset).unwrap();
        assert_eq!(tensor.shape(), &[3, 20, 1]);
        assert!((tensor[[0, 0, 0]] - 0.0).abs() < f64::EPSILON);
        assert!((tensor[[1, 0, 0]] - 0.020).abs() < 1e-12);
    }

    #[test]
    fn test_model_tensor_rejects_wrong_width() {
        let dataset = create_dataset(4, 10);
        let result = DatasetContract::default().model_tensor(&dataset);
        assert!(matches!(result, Err(ContractError::ShapeMismatch(_))));
    }

    #[test]
    fn test_to_rows_round_trips() {
        let dataset = create_dataset(2, 3);
        let rows = dataset.to_rows();
        let rebuilt = Dataset::from_rows(rows, dataset.labels().to_vec()).unwrap();
        assert_eq!(rebuilt, dataset);
    }
}
