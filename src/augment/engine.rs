//! The augmentation engine.
//!
//! Numeric transforms over in-memory datasets. Randomness comes from a
//! per-engine ChaCha8 stream: a seeded engine reproduces byte-identical
//! output, and independent runs construct independent engines so no state
//! is ever shared.

use ndarray::Array2;
use rand::{RngExt, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Beta;
use tracing::debug;

use crate::augment::techniques::{TechniqueConfig, BASIC, MIXING};
use crate::dataset::schema::{Dataset, DatasetContract};
use crate::error::AugmentError;

/// Output of one augmentation pass: transformed features with untouched
/// labels, plus the mix ratio drawn for the batch.
#[derive(Debug, Clone)]
pub struct AugmentedBatch {
    pub dataset: Dataset,
    pub mix_ratio: f64,
}

/// Applies augmentation techniques to datasets.
pub struct AugmentationEngine {
    contract: DatasetContract,
    rng: ChaCha8Rng,
    seed: u64,
}

impl AugmentationEngine {
    /// Engine with a fresh entropy-derived seed.
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    /// Engine with a fixed seed for reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            contract: DatasetContract::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed backing this engine's random stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Apply `config` to `dataset`.
    ///
    /// The input is validated against the dataset contract first. Labels
    /// pass through untouched for every technique, and the output always
    /// has the same sample count as the input.
    pub fn apply(
        &mut self,
        dataset: &Dataset,
        config: &TechniqueConfig,
    ) -> Result<AugmentedBatch, AugmentError> {
        self.contract.validate(dataset)?;

        match *config {
            TechniqueConfig::Basic {
                rotate,
                flip,
                brightness,
            } => self.apply_basic(dataset, rotate, flip, brightness),
            TechniqueConfig::Mixing { beta } => self.apply_mixing(dataset, beta),
        }
    }

    /// Parse-then-apply convenience for by-name invocations.
    pub fn apply_named(
        &mut self,
        dataset: &Dataset,
        technique: &str,
        params: &serde_json::Value,
    ) -> Result<AugmentedBatch, AugmentError> {
        let config = TechniqueConfig::from_name_params(technique, params)?;
        self.apply(dataset, &config)
    }

    fn apply_basic(
        &mut self,
        dataset: &Dataset,
        rotate: i32,
        flip: bool,
        brightness: f64,
    ) -> Result<AugmentedBatch, AugmentError> {
        if !brightness.is_finite() {
            return Err(AugmentError::InvalidParams {
                technique: BASIC.to_string(),
                message: format!("brightness must be finite, got {}", brightness),
            });
        }

        if rotate != 0 || flip {
            debug!(rotate, flip, "rotation and flip are recorded but not applied");
        }

        let features = if brightness != 0.0 {
            dataset
                .features()
                .mapv(|pixel| (pixel * (1.0 + brightness)).clamp(0.0, 1.0))
        } else {
            dataset.features().clone()
        };

        // Diagnostic only; no blending happens for this technique.
        let mix_ratio = self.rng.random_range(0.5..=1.0);

        let dataset = Dataset::new(features, dataset.labels().to_vec())?;
        Ok(AugmentedBatch { dataset, mix_ratio })
    }

    fn apply_mixing(&mut self, dataset: &Dataset, beta: f64) -> Result<AugmentedBatch, AugmentError> {
        let n = dataset.len();
        if n < 2 {
            return Err(AugmentError::InsufficientSamples(n));
        }

        if !beta.is_finite() || beta <= 0.0 {
            return Err(AugmentError::InvalidParams {
                technique: MIXING.to_string(),
                message: format!("beta must be positive and finite, got {}", beta),
            });
        }
        let dist = Beta::new(beta, beta).map_err(|e| AugmentError::InvalidParams {
            technique: MIXING.to_string(),
            message: format!("beta = {}: {}", beta, e),
        })?;

        // One ratio for the whole batch.
        let lambda: f64 = self.rng.sample(dist);

        let source = dataset.features();
        let mut mixed = Array2::zeros(source.raw_dim());
        for i in 0..n {
            let mut partner = self.rng.random_range(0..n);
            while partner == i {
                partner = self.rng.random_range(0..n);
            }
            let blended = &source.row(i) * lambda + &source.row(partner) * (1.0 - lambda);
            mixed.row_mut(i).assign(&blended);
        }

        let dataset = Dataset::new(mixed, dataset.labels().to_vec())?;
        Ok(AugmentedBatch {
            dataset,
            mix_ratio: lambda,
        })
    }
}

impl Default for AugmentationEngine {
    fn default() -> Self {
        Self::new()
    }
}
