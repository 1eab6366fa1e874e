//! Server configuration

use crate::cli::Cli;
use sentilens_classifiers::{EngineConfig, ModelSettings};
use sentilens_core::Error;
use sentilens_jobs::RunnerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Sentiment model
    #[serde(default)]
    pub model: ModelSettings,

    /// Classification engine batching
    #[serde(default)]
    pub engine: EngineConfig,

    /// Job execution
    #[serde(default)]
    pub jobs: RunnerConfig,

    /// Allow cross-origin requests from any origin
    #[serde(default)]
    pub cors_allow_any_origin: bool,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)
                .map_err(|e| Error::config(format!("{config_path}: {e}")))?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }

        if let Some(port) = cli.port {
            config.port = port;
        }

        if let Some(backend) = cli.model_backend {
            config.model.backend = backend.into();
        }

        if let Some(model) = &cli.model {
            config.model.name_or_path = model.clone();
        }

        if let Some(device) = &cli.device {
            config.model.device = device.clone();
        }

        if let Some(batch_size) = cli.batch_size {
            config.engine.batch_size = batch_size;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that can never work
    pub fn validate(&self) -> sentilens_core::Result<()> {
        self.model.validate()?;
        self.engine.validate()?;
        self.jobs.validate()?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            model: ModelSettings::default(),
            engine: EngineConfig::default(),
            jobs: RunnerConfig::default(),
            cors_allow_any_origin: false,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}
