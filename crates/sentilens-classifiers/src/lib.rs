//! Sentilens Classifiers
//!
//! Text normalization and batched three-class sentiment classification.
//!
//! - [`TextNormalizer`]: deterministic cleanup of social-media text
//! - [`SentimentModel`]: blocking model producing per-text class logits
//! - [`ModelLoader`]: produces the model on first use
//! - [`ClassificationEngine`]: lazy one-time load plus batched inference
//!
//! The XLM-RoBERTa backend is compiled with the `ml-models` feature (on by
//! default). The lexicon backend is always available.

pub mod classifier;
pub mod engine;
pub mod lexicon;
pub mod loader;
pub mod model_config;
pub mod normalizer;
#[cfg(feature = "ml-models")]
pub mod xlm_roberta;

pub use classifier::{prediction_from_logits, softmax, SentimentModel};
pub use engine::{ClassificationEngine, EngineConfig, EngineStatus};
pub use lexicon::LexiconSentimentModel;
pub use loader::{loader_for, LexiconLoader, ModelLoader, StaticModelLoader};
pub use model_config::{ModelBackend, ModelSettings};
pub use normalizer::{NormalizationReport, TextNormalizer};
#[cfg(feature = "ml-models")]
pub use xlm_roberta::XlmRobertaSentimentModel;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::SentimentModel;
    pub use crate::engine::{ClassificationEngine, EngineConfig};
    pub use crate::loader::ModelLoader;
    pub use crate::normalizer::TextNormalizer;
}
