//! XLM-RoBERTa sequence classification with Candle

use crate::classifier::SentimentModel;
use crate::model_config::ModelSettings;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{
    Config as XlmRobertaConfig, XLMRobertaForSequenceClassification,
};
use hf_hub::{api::sync::Api, Repo, RepoType};
use sentilens_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

const DEFAULT_NUM_LABELS: usize = 3;

/// Model weights file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightsFormat {
    /// SafeTensors format (recommended)
    SafeTensors,
    /// PyTorch format
    PyTorch,
}

/// Resolved on-disk locations of everything a model load needs
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
    pub format: WeightsFormat,
}

impl ModelFiles {
    /// Resolve files from a local directory or the Hugging Face Hub
    pub fn resolve(settings: &ModelSettings) -> Result<Self> {
        if settings.is_local() {
            Self::from_dir(Path::new(&settings.name_or_path))
        } else {
            Self::download(settings)
        }
    }

    fn from_dir(dir: &Path) -> Result<Self> {
        let config = dir.join("config.json");
        if !config.exists() {
            return Err(Error::model_unavailable(format!(
                "config.json not found in {}",
                dir.display()
            )));
        }

        let tokenizer = dir.join("tokenizer.json");
        if !tokenizer.exists() {
            return Err(Error::model_unavailable(format!(
                "tokenizer.json not found in {}",
                dir.display()
            )));
        }

        let (weights, format) = [
            ("model.safetensors", WeightsFormat::SafeTensors),
            ("pytorch_model.bin", WeightsFormat::PyTorch),
        ]
        .into_iter()
        .map(|(file, format)| (dir.join(file), format))
        .find(|(path, _)| path.exists())
        .ok_or_else(|| {
            Error::model_unavailable(format!(
                "No weights found in {} (tried model.safetensors, pytorch_model.bin)",
                dir.display()
            ))
        })?;

        Ok(Self {
            config,
            tokenizer,
            weights,
            format,
        })
    }

    fn download(settings: &ModelSettings) -> Result<Self> {
        tracing::info!(
            "Downloading model from HuggingFace: {} @ {}",
            settings.name_or_path,
            settings.revision
        );

        let api = Api::new().map_err(|e| {
            Error::model_unavailable(format!("Failed to initialize HuggingFace API: {}", e))
        })?;
        let repo = api.repo(Repo::with_revision(
            settings.name_or_path.clone(),
            RepoType::Model,
            settings.revision.clone(),
        ));

        let config = repo.get("config.json").map_err(|e| {
            Error::model_unavailable(format!("Failed to download config.json: {}", e))
        })?;

        let (weights, format) = match repo.get("model.safetensors") {
            Ok(path) => (path, WeightsFormat::SafeTensors),
            Err(e) => {
                tracing::debug!("model.safetensors unavailable ({}), trying pytorch_model.bin", e);
                let path = repo.get("pytorch_model.bin").map_err(|e| {
                    Error::model_unavailable(format!("Failed to download model weights: {}", e))
                })?;
                (path, WeightsFormat::PyTorch)
            }
        };

        let tokenizer = match repo.get("tokenizer.json") {
            Ok(path) => path,
            Err(e) => {
                let fallback = settings.tokenizer_fallback.as_deref().ok_or_else(|| {
                    Error::model_unavailable(format!("Failed to download tokenizer.json: {}", e))
                })?;
                tracing::info!("Model repo has no tokenizer.json, using tokenizer from {}", fallback);
                api.model(fallback.to_string())
                    .get("tokenizer.json")
                    .map_err(|e| {
                        Error::model_unavailable(format!(
                            "Failed to download tokenizer.json from {}: {}",
                            fallback, e
                        ))
                    })?
            }
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
            format,
        })
    }
}

/// XLM-RoBERTa based 3-class sentiment model
pub struct XlmRobertaSentimentModel {
    name: String,
    tokenizer: Tokenizer,
    model: XLMRobertaForSequenceClassification,
    device: Device,
    num_labels: usize,
}

impl XlmRobertaSentimentModel {
    /// Resolve, download if needed, and load the model. Blocking.
    pub fn load(settings: &ModelSettings) -> Result<Self> {
        let files = ModelFiles::resolve(settings)?;
        let device = get_device(&settings.device)?;

        let config: XlmRobertaConfig = parse_json_config(&files.config)?;
        let num_labels = read_num_labels(&files.config)?;
        let vb = load_var_builder(&files, &device)?;
        let model = load_sequence_model(&vb, num_labels, &config)?;
        let tokenizer = load_tokenizer(&files.tokenizer, settings.max_length)?;

        tracing::info!(
            "Loaded XLM-RoBERTa sentiment model '{}' ({} labels)",
            settings.name_or_path,
            num_labels
        );

        Ok(Self {
            name: settings.name_or_path.clone(),
            tokenizer,
            model,
            device,
            num_labels,
        })
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn tensor(&self, data: Vec<u32>, shape: (usize, usize), what: &str) -> Result<Tensor> {
        Tensor::from_vec(data, shape, &self.device).map_err(|e| {
            Error::model_unavailable(format!("Failed to create {} tensor: {}", what, e))
        })
    }
}

impl SentimentModel for XlmRobertaSentimentModel {
    fn logits(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::model_unavailable(format!("Tokenization failed: {}", e)))?;

        let batch = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch * seq_len);
        let mut attention_mask = Vec::with_capacity(batch * seq_len);
        let mut token_type_ids = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            if encoding.get_ids().len() != seq_len {
                return Err(Error::model_unavailable(
                    "Tokenizer produced ragged batch; padding is not configured",
                ));
            }
            input_ids.extend_from_slice(encoding.get_ids());
            attention_mask.extend_from_slice(encoding.get_attention_mask());
            token_type_ids.extend_from_slice(encoding.get_type_ids());
        }

        let input_ids = self.tensor(input_ids, (batch, seq_len), "input ids")?;
        let attention_mask = self.tensor(attention_mask, (batch, seq_len), "attention mask")?;
        let token_type_ids = self.tensor(token_type_ids, (batch, seq_len), "token type ids")?;

        let logits = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids)
            .map_err(|e| Error::model_unavailable(format!("Model forward pass failed: {}", e)))?;

        logits
            .to_dtype(DType::F32)
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(|e| Error::model_unavailable(format!("Failed to read logits: {}", e)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| Error::model_unavailable(format!("Failed to initialize CUDA: {}", e))),
        "mps" | "metal" => Device::new_metal(0)
            .map_err(|e| Error::model_unavailable(format!("Failed to initialize Metal: {}", e))),
        _ => Ok(Device::Cpu),
    }
}

fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::model_unavailable(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::model_unavailable(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

/// Number of classes from `id2label`, falling back to 3
fn read_num_labels(config_path: &Path) -> Result<usize> {
    let raw: serde_json::Value = parse_json_config(config_path)?;
    Ok(raw
        .get("id2label")
        .and_then(|v| v.as_object())
        .map(|labels| labels.len())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_NUM_LABELS))
}

fn load_var_builder(files: &ModelFiles, device: &Device) -> Result<VarBuilder<'static>> {
    match files.format {
        WeightsFormat::SafeTensors => unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, device)
                .map_err(|e| Error::model_unavailable(format!("Failed to load SafeTensors: {}", e)))
        },
        WeightsFormat::PyTorch => VarBuilder::from_pth(&files.weights, DType::F32, device)
            .map_err(|e| Error::model_unavailable(format!("Failed to load PyTorch weights: {}", e))),
    }
}

fn load_sequence_model(
    vb: &VarBuilder,
    num_labels: usize,
    config: &XlmRobertaConfig,
) -> Result<XLMRobertaForSequenceClassification> {
    let mut errors = Vec::new();

    for prefix in ["", "model"] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match XLMRobertaForSequenceClassification::new(num_labels, config, vb_prefix) {
            Ok(model) => {
                let effective_prefix = if prefix.is_empty() { "<root>" } else { prefix };
                tracing::debug!("Loaded XLM-RoBERTa weights from '{}'", effective_prefix);
                return Ok(model);
            }
            Err(e) => {
                errors.push(format!(
                    "{}: {}",
                    if prefix.is_empty() { "<root>" } else { prefix },
                    e
                ));
            }
        }
    }

    Err(Error::model_unavailable(format!(
        "Failed to load XLM-RoBERTa sequence model with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

fn load_tokenizer(path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| Error::model_unavailable(format!("Failed to load tokenizer.json: {}", e)))?;

    let pad_token = "<pad>".to_string();
    let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(1);
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id,
        pad_token,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| Error::model_unavailable(format!("Failed to configure truncation: {}", e)))?;

    Ok(tokenizer)
}
