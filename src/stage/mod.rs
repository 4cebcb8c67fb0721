//! Stage collaborator layer.
//!
//! The pipeline delegates its four stages to external HTTP services. This
//! module holds the wire types they exchange and the transport seam the
//! orchestrator talks through.

pub mod client;
pub mod types;

pub use client::{HttpStageBackend, StageBackend, DEFAULT_REQUEST_TIMEOUT};
pub use types::{
    AugmentRequest, AugmentationResult, EvaluateRequest, EvaluateResponse, LoadRequest,
    LoadResponse, StageDescriptor, StageEndpoints, StageKind, TrainRequest, TrainResponse,
    STATUS_ERROR, STATUS_SUCCESS,
};
