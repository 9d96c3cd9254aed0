//! BGE-M3 through candle. A batch is tokenized together, padded to its longest
//! member and run through a single forward pass.
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use shadow_core::traits::Embedder;

use crate::pool::{masked_mean_l2, pooled_rows};
use crate::tokenize::encode_batch;

pub const MODEL_DIM: usize = 1024;
const MODEL_MAX_LEN: usize = 256;

pub struct EmbeddingModel { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device, id: String }

impl EmbeddingModel {
    /// Loads from `APP_MODEL_DIR`, `MODEL_DIR` or a `models/bge-m3` directory nearby.
    pub fn new() -> Result<Self> { Self::from_dir(&resolve_model_dir()?) }

    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        tracing::info!("BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device, id: format!("bge-m3:d{MODEL_DIM}") })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_texts(&[text])?.pop().ok_or_else(|| anyhow!("model returned no embedding"))
    }

    pub fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let encoded = encode_batch(&self.tokenizer, texts, MODEL_MAX_LEN)?;
        let (input_ids, attention_mask) = encoded.to_tensors(&self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let rows = pooled_rows(&masked_mean_l2(&hidden, &attention_mask)?)?;
        if let Some(bad) = rows.iter().find(|r| r.len() != MODEL_DIM) {
            bail!("model produced {} dims, expected {}", bad.len(), MODEL_DIM);
        }
        tracing::debug!(batch = texts.len(), seq_len = encoded.seq_len, elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(rows)
    }
}

impl Embedder for EmbeddingModel {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { MODEL_DIM }
    fn max_len(&self) -> usize { MODEL_MAX_LEN }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.embed_texts(&refs)
    }
}

/// Metal when the `metal` feature is on and a GPU is available, CPU otherwise.
fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => { tracing::info!("embedding device: Metal"); return dev; }
            Err(e) => tracing::warn!(error = %e, "no Metal device; using CPU"),
        }
    }
    tracing::info!("embedding device: CPU");
    Device::Cpu
}

fn resolve_model_dir() -> Result<PathBuf> {
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { tracing::info!(var, dir = %p.display(), "using model dir from env"); return Ok(p); }
        }
    }
    ["../models/bge-m3", "models/bge-m3"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Could not locate BGE-M3 model directory (set APP_MODEL_DIR or APP_USE_FAKE_EMBEDDINGS=1)"))
}
