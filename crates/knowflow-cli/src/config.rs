//! CLI configuration
//!
//! Loaded from `knowflow/config.toml` in the user config directory (or a
//! path given with `--config`). Every section has defaults, so a partial
//! file works; a missing file yields the defaults with an empty API key.

use crate::error::{CliError, Result};
use knowflow_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// API endpoint and model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Full chat-completions URL
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Model used for extraction and question generation
    pub text_model: String,
    /// Vision model used for OCR
    pub vision_model: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.siliconflow.cn/v1/chat/completions".to_string(),
            api_key: String::new(),
            text_model: "deepseek-ai/DeepSeek-V3".to_string(),
            vision_model: "Qwen/Qwen2.5-VL-72B-Instruct".to_string(),
        }
    }
}

/// Question generation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionConfig {
    /// Questions per requested type
    pub count_per_type: usize,
    /// Difficulty 1-3
    pub difficulty: u8,
}

impl Default for QuestionConfig {
    fn default() -> Self {
        Self {
            count_per_type: 3,
            difficulty: 2,
        }
    }
}

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// API endpoint and models
    pub api: ApiConfig,
    /// Extraction pipeline settings
    pub extraction: ExtractorConfig,
    /// Question generation settings
    pub questions: QuestionConfig,
}

impl CliConfig {
    /// Default config file location.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| CliError::Config("no user config directory".to_string()))?;
        Ok(base.join("knowflow").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`. A missing
    /// file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        toml::from_str(&text)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Write to the default location, creating parent directories.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("serialize config: {}", e)))?;
        std::fs::write(&path, text)?;
        Ok(())
    }
}
