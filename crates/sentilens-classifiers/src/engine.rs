//! Batched classification over a lazily loaded sentiment model
//!
//! The model is loaded on first use, at most once per engine. A failed load
//! leaves the engine permanently unavailable; every later call fails with
//! `ModelUnavailable` without retrying.

use crate::classifier::{prediction_from_logits, SentimentModel};
use crate::loader::ModelLoader;
use sentilens_core::{Error, Prediction, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, error, info};

/// Batching and concurrency settings for the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Texts per model call
    pub batch_size: usize,

    /// Batches allowed through the model at once (forced to 1 for models that
    /// are not safe for concurrent use)
    pub max_concurrent_batches: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            max_concurrent_batches: 1,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("engine.batch_size must be at least 1"));
        }
        if self.max_concurrent_batches == 0 {
            return Err(Error::config(
                "engine.max_concurrent_batches must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Observable engine lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineStatus {
    /// No load attempted yet
    Uninitialized,
    /// Model loaded
    Ready { model: String },
    /// Load failed; the engine will not retry
    Unavailable { reason: String },
}

struct LoadedModel {
    model: Arc<dyn SentimentModel>,
    permits: Semaphore,
}

/// Stateful wrapper over the sentiment model exposing batched inference
pub struct ClassificationEngine {
    loader: Arc<dyn ModelLoader>,
    config: EngineConfig,
    state: OnceCell<std::result::Result<LoadedModel, String>>,
}

impl ClassificationEngine {
    /// Create an engine; nothing is loaded until first use
    pub fn new(loader: Arc<dyn ModelLoader>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            loader,
            config,
            state: OnceCell::new(),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status(&self) -> EngineStatus {
        match self.state.get() {
            None => EngineStatus::Uninitialized,
            Some(Ok(loaded)) => EngineStatus::Ready {
                model: loaded.model.name().to_string(),
            },
            Some(Err(reason)) => EngineStatus::Unavailable {
                reason: reason.clone(),
            },
        }
    }

    /// Load the model now instead of on first classification
    pub async fn initialize(&self) -> Result<()> {
        self.loaded().await.map(|_| ())
    }

    async fn loaded(&self) -> Result<&LoadedModel> {
        let state = self
            .state
            .get_or_init(|| async {
                info!("Loading sentiment model: {}", self.loader.describe());
                let start = Instant::now();

                match self.loader.load().await {
                    Ok(model) => {
                        let permits = if model.supports_concurrent_inference() {
                            self.config.max_concurrent_batches
                        } else {
                            1
                        };
                        info!(
                            "Sentiment model '{}' ready in {:?} ({} concurrent batches)",
                            model.name(),
                            start.elapsed(),
                            permits
                        );
                        Ok(LoadedModel {
                            model,
                            permits: Semaphore::new(permits),
                        })
                    }
                    Err(e) => {
                        error!("Sentiment model failed to load, engine unavailable: {}", e);
                        Err(e.to_string())
                    }
                }
            })
            .await;

        state
            .as_ref()
            .map_err(|reason| Error::model_unavailable(reason.clone()))
    }

    /// Classify texts, one prediction per input in input order.
    ///
    /// Input of any length is split into `batch_size` model calls.
    pub async fn classify(&self, texts: &[String]) -> Result<Vec<Prediction>> {
        let loaded = self.loaded().await?;

        let mut predictions = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            predictions.extend(self.run_batch(loaded, batch.to_vec()).await?);
        }

        Ok(predictions)
    }

    async fn run_batch(&self, loaded: &LoadedModel, batch: Vec<String>) -> Result<Vec<Prediction>> {
        let _permit = loaded
            .permits
            .acquire()
            .await
            .map_err(|_| Error::model_unavailable("inference permits closed"))?;

        let expected = batch.len();
        let model = Arc::clone(&loaded.model);
        let start = Instant::now();

        let rows = tokio::task::spawn_blocking(move || model.logits(&batch))
            .await
            .map_err(|e| Error::model_unavailable(format!("Inference task failed: {e}")))??;

        if rows.len() != expected {
            return Err(Error::model_unavailable(format!(
                "model returned {} results for {} texts",
                rows.len(),
                expected
            )));
        }

        debug!(
            "Classified batch of {} texts in {}us",
            expected,
            start.elapsed().as_micros()
        );

        Ok(rows.iter().map(|row| prediction_from_logits(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LexiconLoader, StaticModelLoader};
    use sentilens_core::Label;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        loads: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn SentimentModel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            if self.fail {
                Err(Error::model_unavailable("weights missing"))
            } else {
                Ok(Arc::new(crate::lexicon::LexiconSentimentModel::new()?))
            }
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    struct ShortModel;

    impl SentimentModel for ShortModel {
        fn logits(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![0.0, 1.0, 0.0]).collect())
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("текст {i}")).collect()
    }

    #[tokio::test]
    async fn test_lazy_initialization() {
        let engine = ClassificationEngine::new(Arc::new(LexiconLoader), EngineConfig::default()).unwrap();
        assert_eq!(engine.status(), EngineStatus::Uninitialized);

        let predictions = engine.classify(&texts(3)).await.unwrap();
        assert_eq!(predictions.len(), 3);
        assert_eq!(
            engine.status(),
            EngineStatus::Ready {
                model: "sentiment-lexicon".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_loads_once_under_concurrency() {
        let loader = Arc::new(CountingLoader {
            loads: AtomicUsize::new(0),
            fail: false,
        });
        let engine = Arc::new(
            ClassificationEngine::new(loader.clone(), EngineConfig::default()).unwrap(),
        );

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move { engine.classify(&texts(2)).await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_permanent() {
        let loader = Arc::new(CountingLoader {
            loads: AtomicUsize::new(0),
            fail: true,
        });
        let engine = ClassificationEngine::new(loader.clone(), EngineConfig::default()).unwrap();

        for _ in 0..3 {
            let err = engine.classify(&texts(1)).await.unwrap_err();
            assert!(matches!(err, Error::ModelUnavailable(_)));
        }
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(matches!(engine.status(), EngineStatus::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_batches_preserve_order_and_length() {
        let config = EngineConfig {
            batch_size: 4,
            ..Default::default()
        };
        let engine = ClassificationEngine::new(Arc::new(LexiconLoader), config).unwrap();

        let mut input = texts(10);
        input[0] = "Отлично!".to_string();
        input[5] = "Ужасно".to_string();
        input[9] = String::new();

        let predictions = engine.classify(&input).await.unwrap();
        assert_eq!(predictions.len(), 10);
        assert_eq!(predictions[0].label, Label::Positive);
        assert_eq!(predictions[5].label, Label::Negative);
        assert_eq!(predictions[9].label, Label::Neutral);
        assert!(predictions
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.confidence)));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let engine = ClassificationEngine::new(Arc::new(LexiconLoader), EngineConfig::default()).unwrap();
        assert!(engine.classify(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_row_count_mismatch_is_model_error() {
        let engine = ClassificationEngine::new(
            Arc::new(StaticModelLoader::new(Arc::new(ShortModel))),
            EngineConfig::default(),
        )
        .unwrap();

        let err = engine.classify(&texts(3)).await.unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
    }

    #[test]
    fn test_config_validation() {
        let config = EngineConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(ClassificationEngine::new(Arc::new(LexiconLoader), config).is_err());
    }
}
