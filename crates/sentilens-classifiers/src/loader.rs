//! Extension points for model loading.

use crate::classifier::SentimentModel;
use crate::lexicon::LexiconSentimentModel;
use crate::model_config::{ModelBackend, ModelSettings};
use sentilens_core::{Error, Result};
use std::sync::Arc;

/// Pluggable backend that produces the engine's model on first use.
///
/// Implement this trait to provide other inference backends without coupling
/// the engine to heavyweight dependencies.
#[async_trait::async_trait]
pub trait ModelLoader: Send + Sync {
    /// Load the model. Called at most once per engine.
    async fn load(&self) -> Result<Arc<dyn SentimentModel>>;

    /// Human-readable description of what will be loaded
    fn describe(&self) -> String;
}

/// Loader handing out an already-constructed model
pub struct StaticModelLoader {
    model: Arc<dyn SentimentModel>,
}

impl StaticModelLoader {
    pub fn new(model: Arc<dyn SentimentModel>) -> Self {
        Self { model }
    }
}

#[async_trait::async_trait]
impl ModelLoader for StaticModelLoader {
    async fn load(&self) -> Result<Arc<dyn SentimentModel>> {
        Ok(Arc::clone(&self.model))
    }

    fn describe(&self) -> String {
        format!("static model '{}'", self.model.name())
    }
}

/// Loader for the built-in lexicon model
pub struct LexiconLoader;

#[async_trait::async_trait]
impl ModelLoader for LexiconLoader {
    async fn load(&self) -> Result<Arc<dyn SentimentModel>> {
        Ok(Arc::new(LexiconSentimentModel::new()?))
    }

    fn describe(&self) -> String {
        "built-in sentiment lexicon".to_string()
    }
}

/// Loader for the Candle XLM-RoBERTa model; loading runs on a blocking thread
#[cfg(feature = "ml-models")]
pub struct XlmRobertaLoader {
    settings: ModelSettings,
}

#[cfg(feature = "ml-models")]
impl XlmRobertaLoader {
    pub fn new(settings: ModelSettings) -> Self {
        Self { settings }
    }
}

#[cfg(feature = "ml-models")]
#[async_trait::async_trait]
impl ModelLoader for XlmRobertaLoader {
    async fn load(&self) -> Result<Arc<dyn SentimentModel>> {
        let settings = self.settings.clone();
        let model = tokio::task::spawn_blocking(move || {
            crate::xlm_roberta::XlmRobertaSentimentModel::load(&settings)
        })
        .await
        .map_err(|e| Error::model_unavailable(format!("Model load task failed: {e}")))??;

        Ok(Arc::new(model))
    }

    fn describe(&self) -> String {
        format!(
            "xlm-roberta '{}' @ {} on {}",
            self.settings.name_or_path, self.settings.revision, self.settings.device
        )
    }
}

/// Build the loader selected by `settings`
pub fn loader_for(settings: &ModelSettings) -> Result<Arc<dyn ModelLoader>> {
    settings.validate()?;

    match settings.backend {
        ModelBackend::Lexicon => Ok(Arc::new(LexiconLoader)),
        #[cfg(feature = "ml-models")]
        ModelBackend::XlmRoberta => Ok(Arc::new(XlmRobertaLoader::new(settings.clone()))),
        #[cfg(not(feature = "ml-models"))]
        ModelBackend::XlmRoberta => Err(Error::config(
            "xlm-roberta backend requires the 'ml-models' feature",
        )),
    }
}
