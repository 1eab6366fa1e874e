//! Lightweight lexicon sentiment model
//!
//! Used when no transformer model is configured, and as an offline fallback.
//! Cue words are matched as lowercase substrings so Russian stems cover their
//! inflected forms.

use crate::classifier::SentimentModel;
use aho_corasick::AhoCorasick;
use sentilens_core::{Error, Result};

const POSITIVE_CUES: &[&str] = &[
    "хорош",
    "отлич",
    "прекрасн",
    "замечательн",
    "супер",
    "класс",
    "люблю",
    "нрав",
    "спасибо",
    "рекоменд",
    "восторг",
    "good",
    "great",
    "excellent",
    "love",
    "amazing",
    "wonderful",
    "happy",
    "fantastic",
    "awesome",
    "best",
];

const NEGATIVE_CUES: &[&str] = &[
    "плох",
    "ужас",
    "отврат",
    "ненави",
    "разочаров",
    "кошмар",
    "хуже",
    "обман",
    "груб",
    "bad",
    "terrible",
    "awful",
    "hate",
    "horrible",
    "worst",
    "sad",
    "angry",
    "disappointed",
    "poor",
];

pub struct LexiconSentimentModel {
    name: String,
    positive: AhoCorasick,
    negative: AhoCorasick,
}

impl LexiconSentimentModel {
    pub fn new() -> Result<Self> {
        Self::with_name("sentiment-lexicon")
    }

    pub fn with_name(name: impl Into<String>) -> Result<Self> {
        let positive = AhoCorasick::new(POSITIVE_CUES).map_err(|e| {
            Error::model_unavailable(format!("Failed to build positive sentiment matcher: {e}"))
        })?;

        let negative = AhoCorasick::new(NEGATIVE_CUES).map_err(|e| {
            Error::model_unavailable(format!("Failed to build negative sentiment matcher: {e}"))
        })?;

        Ok(Self {
            name: name.into(),
            positive,
            negative,
        })
    }

    /// Pseudo-logits `[negative, neutral, positive]` from cue counts.
    ///
    /// Balanced (including zero) counts favour neutral.
    fn score(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let positive_hits = self.positive.find_iter(&lowered).count() as f32;
        let negative_hits = self.negative.find_iter(&lowered).count() as f32;

        let neutral = if positive_hits == negative_hits {
            positive_hits + 1.0
        } else {
            0.5
        };

        vec![negative_hits, neutral, positive_hits]
    }
}

impl SentimentModel for LexiconSentimentModel {
    fn logits(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.score(text)).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
