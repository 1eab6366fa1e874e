//! Sentiment model trait and logit post-processing

use sentilens_core::{Label, Prediction, Result};

/// A sequence-classification model producing 3-class sentiment logits.
///
/// Implementations are blocking: the engine runs them on a worker thread.
pub trait SentimentModel: Send + Sync {
    /// Raw class logits, one row per input text, in input order
    fn logits(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn name(&self) -> &str;

    /// Whether several batches may run through this model at once
    fn supports_concurrent_inference(&self) -> bool {
        true
    }
}

/// Numerically stable softmax over one logit row
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.iter().map(|e| e / sum).collect()
    } else {
        vec![0.0; logits.len()]
    }
}

/// Turn one logit row into a label and its probability.
///
/// Ties resolve to the lowest class index; an argmax outside the three known
/// classes becomes neutral.
pub fn prediction_from_logits(logits: &[f32]) -> Prediction {
    let probs = softmax(logits);

    let mut best: Option<(usize, f32)> = None;
    for (idx, &p) in probs.iter().enumerate() {
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((idx, p)),
        }
    }

    match best {
        Some((idx, confidence)) => Prediction::new(Label::from_model_index(idx), confidence),
        None => Prediction::new(Label::Neutral, 0.0),
    }
}
