//! Pipeline configuration.
//!
//! Settings come from three layers: built-in defaults, environment
//! variables (`from_env`), and CLI flags applied on top by the caller.
//! Validation runs before any stage executes, so a bad value is a
//! configuration error and never a mid-run surprise.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::augment::techniques::{BASIC, MIXING, PUZZLEMIX};
use crate::stage::StageEndpoints;

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base URLs for the four stage collaborators
    pub endpoints: StageEndpoints,
    /// Raw source the loader ingests
    pub source_path: PathBuf,
    /// Where the augmenter writes its output dataset
    pub augmented_path: PathBuf,
    /// Holdout dataset the evaluator scores against
    pub holdout_path: PathBuf,
    /// Augmentation technique name, forwarded to the augmenter as-is
    pub technique: String,
    /// Rotation degrees for the basic technique (recorded, not applied)
    pub rotate: i32,
    /// Horizontal flip switch for the basic technique (recorded, not applied)
    pub flip: bool,
    /// Brightness adjustment for the basic technique
    pub brightness: f64,
    /// Beta distribution parameter for the mixing technique
    pub beta: f64,
    /// Per-stage readiness timeout
    pub readiness_timeout: Duration,
    /// Delay between readiness probes
    pub readiness_poll_interval: Duration,
    /// HTTP timeout for stage requests
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            // Stage endpoints
            endpoints: StageEndpoints::default(),

            // Dataset paths
            source_path: PathBuf::from("data/raw.csv"),
            augmented_path: PathBuf::from("data/augmented.json"),
            holdout_path: PathBuf::from("data/holdout.json"),

            // Augmentation settings
            technique: BASIC.to_string(),
            rotate: 0,
            flip: false,
            brightness: 0.0,
            beta: 1.0,

            // Timing
            readiness_timeout: Duration::from_secs(30),
            readiness_poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a variable cannot be parsed
    /// and `ConfigError::ValidationFailed` when the resulting configuration
    /// is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Stage endpoints
        if let Ok(val) = std::env::var("PIPELINE_LOADER_URL") {
            config.endpoints.loader = val;
        }

        if let Ok(val) = std::env::var("PIPELINE_AUGMENTER_URL") {
            config.endpoints.augmenter = val;
        }

        if let Ok(val) = std::env::var("PIPELINE_TRAINER_URL") {
            config.endpoints.trainer = val;
        }

        if let Ok(val) = std::env::var("PIPELINE_EVALUATOR_URL") {
            config.endpoints.evaluator = val;
        }

        // Dataset paths
        if let Ok(val) = std::env::var("DATA_INPUT_PATH") {
            config.source_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("DATA_OUTPUT_PATH") {
            config.augmented_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("TEST_DATA_PATH") {
            config.holdout_path = PathBuf::from(val);
        }

        // Augmentation settings
        if let Ok(val) = std::env::var("AUG_TECHNIQUE") {
            config.technique = val;
        }

        if let Ok(val) = std::env::var("AUG_ROTATION") {
            config.rotate = parse_env_value(&val, "AUG_ROTATION")?;
        }

        if let Ok(val) = std::env::var("AUG_FLIP") {
            config.flip = parse_env_bool(&val, "AUG_FLIP")?;
        }

        if let Ok(val) = std::env::var("AUG_BRIGHTNESS_ADJUST") {
            config.brightness = parse_env_value(&val, "AUG_BRIGHTNESS_ADJUST")?;
        }

        if let Ok(val) = std::env::var("AUG_BETA") {
            config.beta = parse_env_value(&val, "AUG_BETA")?;
        }

        // Timing
        if let Ok(val) = std::env::var("PIPELINE_READY_TIMEOUT_SECS") {
            config.readiness_timeout =
                Duration::from_secs(parse_env_value(&val, "PIPELINE_READY_TIMEOUT_SECS")?);
        }

        if let Ok(val) = std::env::var("PIPELINE_READY_POLL_MILLIS") {
            config.readiness_poll_interval =
                Duration::from_millis(parse_env_value(&val, "PIPELINE_READY_POLL_MILLIS")?);
        }

        if let Ok(val) = std::env::var("PIPELINE_REQUEST_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_env_value(&val, "PIPELINE_REQUEST_TIMEOUT_SECS")?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Endpoint validation
        for (name, url) in [
            ("loader", &self.endpoints.loader),
            ("augmenter", &self.endpoints.augmenter),
            ("trainer", &self.endpoints.trainer),
            ("evaluator", &self.endpoints.evaluator),
        ] {
            if url.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} endpoint cannot be empty",
                    name
                )));
            }
            if !url.contains("://") {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} endpoint must be a URL, got '{}'",
                    name, url
                )));
            }
        }

        // Path validation
        if self.source_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "source_path cannot be empty".to_string(),
            ));
        }

        if self.augmented_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "augmented_path cannot be empty".to_string(),
            ));
        }

        if self.holdout_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "holdout_path cannot be empty".to_string(),
            ));
        }

        // Augmentation validation
        if self.technique.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "technique cannot be empty".to_string(),
            ));
        }

        if !self.brightness.is_finite() {
            return Err(ConfigError::ValidationFailed(
                "brightness must be finite".to_string(),
            ));
        }

        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "beta must be greater than 0".to_string(),
            ));
        }

        // Timing validation
        if self.readiness_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "readiness_timeout must be greater than 0".to_string(),
            ));
        }

        if self.readiness_poll_interval.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "readiness_poll_interval must be greater than 0".to_string(),
            ));
        }

        if self.readiness_poll_interval > self.readiness_timeout {
            return Err(ConfigError::ValidationFailed(
                "readiness_poll_interval cannot exceed readiness_timeout".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Params object for the configured technique, in the augmenter's wire
    /// shape. Unknown technique names get the basic-shaped params; the
    /// augmenter rejects the name before reading them.
    pub fn technique_params(&self) -> serde_json::Value {
        match self.technique.as_str() {
            MIXING | PUZZLEMIX => serde_json::json!({ "beta": self.beta }),
            _ => serde_json::json!({
                "rotate": self.rotate,
                "flip": self.flip,
                "brightness": self.brightness,
            }),
        }
    }

    /// Builder method to set the stage endpoints.
    pub fn with_endpoints(mut self, endpoints: StageEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Builder method to set the raw source path.
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Builder method to set the augmented dataset path.
    pub fn with_augmented_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.augmented_path = path.into();
        self
    }

    /// Builder method to set the holdout dataset path.
    pub fn with_holdout_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.holdout_path = path.into();
        self
    }

    /// Builder method to set the augmentation technique.
    pub fn with_technique(mut self, technique: impl Into<String>) -> Self {
        self.technique = technique.into();
        self
    }

    /// Builder method to set the rotation parameter.
    pub fn with_rotation(mut self, rotate: i32) -> Self {
        self.rotate = rotate;
        self
    }

    /// Builder method to set the flip parameter.
    pub fn with_flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    /// Builder method to set the brightness adjustment.
    pub fn with_brightness(mut self, brightness: f64) -> Self {
        self.brightness = brightness;
        self
    }

    /// Builder method to set the mixing beta parameter.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Builder method to set the readiness timeout.
    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = timeout;
        self
    }

    /// Builder method to set the readiness poll interval.
    pub fn with_readiness_poll_interval(mut self, interval: Duration) -> Self {
        self.readiness_poll_interval = interval;
        self
    }

    /// Builder method to set the stage request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.endpoints.loader, "http://localhost:5001");
        assert_eq!(config.endpoints.evaluator, "http://localhost:5004");
        assert_eq!(config.technique, "basic");
        assert_eq!(config.rotate, 0);
        assert!(!config.flip);
        assert!((config.brightness - 0.0).abs() < f64::EPSILON);
        assert!((config.beta - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.readiness_timeout, Duration::from_secs(30));
        assert_eq!(config.readiness_poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new()
            .with_source_path("/data/raw.csv")
            .with_augmented_path("/data/aug.json")
            .with_holdout_path("/data/holdout.json")
            .with_technique("mixing")
            .with_beta(0.5)
            .with_brightness(0.2)
            .with_rotation(90)
            .with_flip(true)
            .with_readiness_timeout(Duration::from_secs(10))
            .with_readiness_poll_interval(Duration::from_millis(100))
            .with_request_timeout(Duration::from_secs(60));

        assert_eq!(config.source_path, PathBuf::from("/data/raw.csv"));
        assert_eq!(config.technique, "mixing");
        assert!((config.beta - 0.5).abs() < f64::EPSILON);
        assert!((config.brightness - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.rotate, 90);
        assert!(config.flip);
        assert_eq!(config.readiness_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_validation_valid_config() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_endpoint() {
        let mut config = PipelineConfig::default();
        config.endpoints.trainer = String::new();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("trainer"));
    }

    #[test]
    fn test_validation_non_url_endpoint() {
        let mut config = PipelineConfig::default();
        config.endpoints.augmenter = "localhost:5002".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("augmenter"));
    }

    #[test]
    fn test_validation_empty_source_path() {
        let config = PipelineConfig::default().with_source_path("");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("source_path"));
    }

    #[test]
    fn test_validation_empty_technique() {
        let config = PipelineConfig::default().with_technique("");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("technique"));
    }

    #[test]
    fn test_validation_non_finite_brightness() {
        let config = PipelineConfig::default().with_brightness(f64::NAN);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("brightness"));
    }

    #[test]
    fn test_validation_invalid_beta() {
        let config = PipelineConfig::default().with_beta(0.0);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("beta"));
    }

    #[test]
    fn test_validation_zero_readiness_timeout() {
        let config = PipelineConfig::default().with_readiness_timeout(Duration::ZERO);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("readiness_timeout"));
    }

    #[test]
    fn test_validation_poll_exceeds_timeout() {
        let config = PipelineConfig::default()
            .with_readiness_timeout(Duration::from_secs(1))
            .with_readiness_poll_interval(Duration::from_secs(5));
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("readiness_poll_interval cannot exceed"));
    }

    #[test]
    fn test_validation_zero_request_timeout() {
        let config = PipelineConfig::default().with_request_timeout(Duration::ZERO);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("request_timeout"));
    }

    #[test]
    fn test_technique_params_shapes() {
        let basic = PipelineConfig::default().with_brightness(0.3);
        let params = basic.technique_params();
        assert!((params["brightness"].as_f64().unwrap() - 0.3).abs() < f64::EPSILON);
        assert!(params.get("beta").is_none());

        let mixing = PipelineConfig::default()
            .with_technique("mixing")
            .with_beta(0.7);
        let params = mixing.technique_params();
        assert!((params["beta"].as_f64().unwrap() - 0.7).abs() < f64::EPSILON);
        assert!(params.get("rotate").is_none());
    }

    #[test]
    fn test_unknown_technique_passes_validation() {
        // Unknown names are resolved by the augmenter at run time, not here.
        let config = PipelineConfig::default().with_technique("nonexistent");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_env_bool() {
        assert!(parse_env_bool("true", "test").unwrap());
        assert!(parse_env_bool("1", "test").unwrap());
        assert!(parse_env_bool("yes", "test").unwrap());
        assert!(parse_env_bool("on", "test").unwrap());
        assert!(parse_env_bool("TRUE", "test").unwrap());

        assert!(!parse_env_bool("false", "test").unwrap());
        assert!(!parse_env_bool("0", "test").unwrap());
        assert!(!parse_env_bool("no", "test").unwrap());
        assert!(!parse_env_bool("off", "test").unwrap());

        assert!(parse_env_bool("invalid", "test").is_err());
    }

    #[test]
    fn test_parse_env_value_numbers() {
        let parsed: u64 = parse_env_value("30", "test").unwrap();
        assert_eq!(parsed, 30);

        let parsed: f64 = parse_env_value("0.4", "test").unwrap();
        assert!((parsed - 0.4).abs() < f64::EPSILON);

        let result: Result<u64, _> = parse_env_value("not-a-number", "test");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "KEY".to_string(),
            message: "bad value".to_string(),
        };
        assert!(err.to_string().contains("KEY"));
        assert!(err.to_string().contains("bad value"));

        let err = ConfigError::ValidationFailed("test failure".to_string());
        assert!(err.to_string().contains("test failure"));
    }
}
