//! Configuration for the extraction pipeline

use serde::{Deserialize, Serialize};

/// Configuration for batch extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Maximum text slice per unit, in code points (before boundary snapping)
    pub text_chunk_size: usize,

    /// Target knowledge point count requested per worker
    pub batch_target: usize,

    /// Concurrent extraction workers per batch (1 or 2)
    pub worker_count: usize,

    /// OCR output shorter than this is flagged as a possible misrecognition
    pub min_ocr_chars: usize,
}

impl ExtractorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.text_chunk_size == 0 {
            return Err("text_chunk_size must be greater than 0".to_string());
        }
        if self.batch_target == 0 {
            return Err("batch_target must be greater than 0".to_string());
        }
        if !(1..=2).contains(&self.worker_count) {
            return Err(format!(
                "worker_count must be 1 or 2, got {}",
                self.worker_count
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }

    /// Preset for two-worker batches with a larger per-batch yield.
    pub fn dual_worker() -> Self {
        Self {
            worker_count: 2,
            ..Self::default()
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            text_chunk_size: 3000,
            batch_target: 10,
            worker_count: 1,
            min_ocr_chars: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_dual_worker_config_is_valid() {
        let config = ExtractorConfig::dual_worker();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_count, 2);
    }

    #[test]
    fn test_invalid_worker_count() {
        let mut config = ExtractorConfig::default();
        config.worker_count = 0;
        assert!(config.validate().is_err());
        config.worker_count = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_chunk_size() {
        let mut config = ExtractorConfig::default();
        config.text_chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.text_chunk_size, parsed.text_chunk_size);
        assert_eq!(config.batch_target, parsed.batch_target);
        assert_eq!(config.worker_count, parsed.worker_count);
    }
}
