use crate::config::ServerConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use sentilens_classifiers::{loader_for, ClassificationEngine, ModelLoader, TextNormalizer};
use sentilens_jobs::{JobRunner, JobStore};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Submits and tracks classification jobs
    pub runner: JobRunner,

    /// Standalone normalizer for the normalize endpoint
    pub normalizer: Arc<TextNormalizer>,

    /// Prometheus handle for rendering `/metrics`
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Build state for `config`, selecting the model loader it names
    pub fn new(config: &ServerConfig, metrics_handle: PrometheusHandle) -> sentilens_core::Result<Self> {
        let loader = loader_for(&config.model)?;
        Self::with_loader(config, loader, metrics_handle)
    }

    /// Build state around an explicit model loader
    pub fn with_loader(
        config: &ServerConfig,
        loader: Arc<dyn ModelLoader>,
        metrics_handle: PrometheusHandle,
    ) -> sentilens_core::Result<Self> {
        let engine = Arc::new(ClassificationEngine::new(loader, config.engine.clone())?);
        let normalizer = Arc::new(TextNormalizer::new()?);
        let runner = JobRunner::new(
            JobStore::new(),
            engine,
            Arc::clone(&normalizer),
            config.jobs.clone(),
        )?;

        Ok(Self {
            runner,
            normalizer,
            metrics_handle,
        })
    }

    pub fn store(&self) -> &JobStore {
        self.runner.store()
    }
}
