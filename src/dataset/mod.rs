//! Dataset representation, contract enforcement and persistence.
//!
//! Datasets move through the pipeline as files; every stage boundary
//! revalidates them against the contract (sample presence, feature/label
//! alignment, label classes, model tensor shape) so a bad stage output
//! never flows downstream.

pub mod ingest;
pub mod schema;
pub mod store;

pub use ingest::{ingest_csv, IngestReport, TARGET_COLUMN};
pub use schema::{Dataset, DatasetContract, CLASS_COUNT, FEATURE_DIM};
pub use store::{read_dataset, write_dataset, DatasetFile};
