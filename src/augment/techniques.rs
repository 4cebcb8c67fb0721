//! Augmentation technique configuration.
//!
//! Techniques arrive at the augmentation boundary by name plus a raw params
//! object. Parsing is closed: known names map to a tagged variant whose
//! params reject unknown fields, missing fields take documented defaults,
//! and unknown names are an error, never a fallback.

use serde::{Deserialize, Serialize};

use crate::error::AugmentError;

/// Canonical name of the pixel-adjustment technique.
pub const BASIC: &str = "basic";

/// Canonical name of the batch-mixing technique.
pub const MIXING: &str = "mixing";

/// Historical alias for [`MIXING`].
pub const PUZZLEMIX: &str = "puzzlemix";

fn default_beta() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BasicParams {
    #[serde(default)]
    rotate: i32,
    #[serde(default)]
    flip: bool,
    #[serde(default)]
    brightness: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MixingParams {
    #[serde(default = "default_beta")]
    beta: f64,
}

/// Closed configuration for one augmentation technique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "technique", content = "params", rename_all = "snake_case")]
pub enum TechniqueConfig {
    /// Pixel-level adjustments.
    ///
    /// `rotate` and `flip` are accepted and recorded but not applied
    /// numerically; only `brightness` changes pixel values.
    Basic {
        #[serde(default)]
        rotate: i32,
        #[serde(default)]
        flip: bool,
        #[serde(default)]
        brightness: f64,
    },
    /// Batch mixing: one Beta(beta, beta) ratio per batch, every sample
    /// blended with a distinct partner.
    Mixing {
        #[serde(default = "default_beta")]
        beta: f64,
    },
}

impl TechniqueConfig {
    /// Parse a technique by name plus a raw params object.
    ///
    /// A `null` params value means "all defaults". Unknown fields inside
    /// params are rejected; unknown names are [`AugmentError::UnknownTechnique`].
    pub fn from_name_params(
        name: &str,
        params: &serde_json::Value,
    ) -> Result<Self, AugmentError> {
        let params = if params.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            params.clone()
        };

        match name {
            BASIC => {
                let parsed: BasicParams =
                    serde_json::from_value(params).map_err(|e| AugmentError::InvalidParams {
                        technique: BASIC.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(TechniqueConfig::Basic {
                    rotate: parsed.rotate,
                    flip: parsed.flip,
                    brightness: parsed.brightness,
                })
            }
            MIXING | PUZZLEMIX => {
                let parsed: MixingParams =
                    serde_json::from_value(params).map_err(|e| AugmentError::InvalidParams {
                        technique: MIXING.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(TechniqueConfig::Mixing { beta: parsed.beta })
            }
            other => Err(AugmentError::UnknownTechnique(other.to_string())),
        }
    }

    /// Canonical name of this technique.
    pub fn name(&self) -> &'static str {
        match self {
            TechniqueConfig::Basic { .. } => BASIC,
            TechniqueConfig::Mixing { .. } => MIXING,
        }
    }

    /// Params object in the collaborators' wire shape.
    pub fn params_json(&self) -> serde_json::Value {
        match self {
            TechniqueConfig::Basic {
                rotate,
                flip,
                brightness,
            } => serde_json::json!({
                "rotate": rotate,
                "flip": flip,
                "brightness": brightness,
            }),
            TechniqueConfig::Mixing { beta } => serde_json::json!({ "beta": beta }),
        }
    }
}
