//! Embedding providers: a candle-backed MiniLM model and a deterministic
//! fake for model-free environments.
//!
//! Both produce L2-normalized vectors of [`EMBEDDING_DIM`], so an index
//! built with one dimension stays consistent regardless of provider.
//! Swapping the *model* behind an existing index is unsupported: the
//! vectors would be incomparable even at the same dimension.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::info;

use docchat_core::config::Config;
use docchat_core::traits::Embedder;

/// Output dimension of all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;
const MAX_LEN: usize = 256;

/// sentence-transformers/all-MiniLM-L6-v2 on CPU via candle.
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl MiniLmEmbedder {
    /// Load tokenizer, config and weights from `model_dir`. Absence of
    /// any piece is a construction-time error; callers treat it as fatal
    /// at startup rather than deferring to query time.
    pub fn new(model_dir: &Path) -> Result<Self> {
        let device = Device::Cpu;
        info!(dir = %model_dir.display(), "loading MiniLM embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            anyhow!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e)
        })?;

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        if !weights_path.exists() {
            return Err(anyhow!("embedding weights missing at {}", weights_path.display()));
        }
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> =
            weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        info!("embedding model ready");
        Ok(Self { model, tokenizer, device })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let enc =
            self.tokenizer.encode(text, true).map_err(|e| anyhow!("tokenization failed: {}", e))?;
        let mut ids: Vec<u32> = enc.get_ids().to_vec();
        let mut mask: Vec<u32> = enc.get_attention_mask().to_vec();
        ids.truncate(MAX_LEN);
        mask.truncate(MAX_LEN);
        let len = ids.len();

        let input_ids = Tensor::from_vec(ids, (1, len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (1, len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over non-padding positions, then L2 normalization.
        let mask_f = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask_f)?.sum(1)?;
        let counts = mask_f.sum(1)?;
        let emb = summed.broadcast_div(&counts)?;
        let eps = Tensor::new(1e-12f32, &self.device)?;
        let norm = emb.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
        let emb = emb.broadcast_div(&norm)?;

        let v: Vec<f32> = emb.squeeze(0)?.to_vec1()?;
        if v.len() != EMBEDDING_DIM {
            return Err(anyhow!("unexpected embedding dim {} (wanted {})", v.len(), EMBEDDING_DIM));
        }
        Ok(v)
    }
}

impl Embedder for MiniLmEmbedder {
    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text)
    }
}

/// Hash-bucket embedder: deterministic, normalized, no model files.
/// Word overlap still produces nonzero cosine similarity, which is all
/// the tests and model-free dev environments need.
struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

/// Build the deployment's embedder. `APP_USE_FAKE_EMBEDDINGS=1` selects
/// the fake; otherwise the MiniLM model directory is resolved from the
/// environment or configuration and must exist.
pub fn default_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        info!("using fake embedder");
        return Ok(Box::new(FakeEmbedder::new(EMBEDDING_DIM)));
    }
    let model_dir = resolve_model_dir(config)?;
    Ok(Box::new(MiniLmEmbedder::new(&model_dir)?))
}

fn resolve_model_dir(config: &Config) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_EMBED_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    let dir: String = config.get("embed.model_dir")?;
    let p = docchat_core::config::expand_path(&dir);
    if p.exists() {
        Ok(p)
    } else {
        Err(anyhow!("embedding model directory not found at {}", p.display()))
    }
}
