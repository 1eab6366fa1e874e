//! Model configuration

use sentilens_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which model implementation backs the classification engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelBackend {
    /// XLM-RoBERTa sequence classifier run with Candle
    #[default]
    XlmRoberta,

    /// Built-in cue-word lexicon
    Lexicon,
}

/// Configuration for the pretrained sentiment model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model backend
    pub backend: ModelBackend,

    /// Local model directory or Hugging Face repo id
    pub name_or_path: String,

    /// Hugging Face revision
    pub revision: String,

    /// Repo to take `tokenizer.json` from when the model repo ships none
    pub tokenizer_fallback: Option<String>,

    /// Device to run on (cpu, cuda, metal)
    pub device: String,

    /// Maximum sequence length in tokens
    pub max_length: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            name_or_path: "cardiffnlp/twitter-xlm-roberta-base-sentiment".to_string(),
            revision: "main".to_string(),
            tokenizer_fallback: Some("FacebookAI/xlm-roberta-base".to_string()),
            device: "cpu".to_string(),
            max_length: 512,
        }
    }
}

impl ModelSettings {
    /// Settings for the built-in lexicon model
    pub fn lexicon() -> Self {
        Self {
            backend: ModelBackend::Lexicon,
            name_or_path: "sentiment-lexicon".to_string(),
            ..Default::default()
        }
    }

    /// Check settings for values that can never load
    pub fn validate(&self) -> Result<()> {
        if self.name_or_path.trim().is_empty() {
            return Err(Error::config("model.name_or_path must not be empty"));
        }
        if self.max_length == 0 {
            return Err(Error::config("model.max_length must be at least 1"));
        }
        match self.device.to_lowercase().as_str() {
            "cpu" | "cuda" | "cuda:0" | "metal" | "mps" => Ok(()),
            other => Err(Error::config(format!("unsupported model.device '{other}'"))),
        }
    }

    /// Whether `name_or_path` points at a local directory
    pub fn is_local(&self) -> bool {
        Path::new(&self.name_or_path).is_dir()
    }
}
