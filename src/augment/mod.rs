//! Dataset augmentation.
//!
//! Two techniques ship today. `basic` rescales pixel brightness and clamps
//! to [0, 1]; its rotation and flip switches are recorded but not applied
//! numerically. `mixing` blends every sample with a distinct partner using
//! one Beta-distributed ratio per batch and passes labels through.
//!
//! The engine is invoked in-process by the augmenter collaborator and by
//! the `augment` CLI command; both paths resolve techniques by name and
//! reject unknown names outright.

pub mod engine;
pub mod runner;
pub mod techniques;

pub use engine::{AugmentationEngine, AugmentedBatch};
pub use runner::{augment_file, AugmentRunError};
pub use techniques::{TechniqueConfig, BASIC, MIXING, PUZZLEMIX};
