//! BERT sentence-embedding backend using candle-transformers.
//!
//! Follows the sentence-transformers pipeline: tokenize with padding and
//! truncation, BERT forward pass, mean pooling weighted by the attention
//! mask, then L2 normalization to unit vectors. Model files come from
//! HuggingFace Hub and are cached locally; weights are loaded once per
//! process and shared between ingestion and query embedding.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use tokenizers::Tokenizer;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingModel;
use crate::domain::ports::EmbeddingService;

/// Embedding service backed by a locally-loaded BERT model.
///
/// The inner state is reference-counted so inference can move onto the
/// blocking thread pool while callers keep a cheap handle.
pub struct BertEmbedder {
    inner: Arc<BertInner>,
}

struct BertInner {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_type: EmbeddingModel,
    dimensions: usize,
    max_seq_length: usize,
}

impl BertEmbedder {
    /// Load the model, downloading weights from HuggingFace Hub on first
    /// use.
    ///
    /// # Arguments
    /// * `model_type` - MiniLm or MpNet (Hashed has its own backend)
    /// * `cache_dir` - Optional override for the hub cache directory;
    ///   defaults to `~/.cache/huggingface/hub`
    pub fn new(model_type: EmbeddingModel, cache_dir: Option<PathBuf>) -> DomainResult<Self> {
        if !model_type.requires_download() {
            return Err(DomainError::Configuration(format!(
                "{model_type} is not a downloadable BERT model"
            )));
        }

        let device = Self::select_device();
        let dimensions = model_type.dimensions();
        let repo_id = model_type.identity();

        tracing::info!(model = repo_id, ?device, "loading embedding model");

        let cache_dir = cache_dir
            .or_else(|| dirs::cache_dir().map(|d| d.join("huggingface").join("hub")))
            .ok_or_else(|| {
                DomainError::Configuration("could not determine a model cache directory".to_string())
            })?;

        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_cache_dir(cache_dir)
            .build()
            .map_err(|e| DomainError::Configuration(format!("hub api init failed: {e}")))?;
        let repo = api.model(repo_id.to_string());

        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| DomainError::Configuration(format!("tokenizer download failed: {e}")))?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            DomainError::Configuration(format!("failed to load tokenizer {tokenizer_path:?}: {e}"))
        })?;

        let config_path = repo
            .get("config.json")
            .map_err(|e| DomainError::Configuration(format!("config download failed: {e}")))?;
        let config_file = std::fs::File::open(&config_path)
            .map_err(|e| DomainError::Configuration(format!("failed to open config.json: {e}")))?;
        let config: Config = serde_json::from_reader(config_file)
            .map_err(|e| DomainError::Configuration(format!("failed to parse config.json: {e}")))?;

        // A model whose hidden size disagrees with the declared identity
        // would silently produce incomparable vectors.
        if config.hidden_size != dimensions {
            return Err(DomainError::Configuration(format!(
                "model dimension mismatch for {repo_id}: expected {dimensions}, config says {}",
                config.hidden_size
            )));
        }

        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| DomainError::Configuration(format!("weights download failed: {e}")))?;

        #[allow(unsafe_code)]
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| DomainError::Configuration(format!("failed to map weights: {e}")))?
        };

        let max_seq_length = config.max_position_embeddings;
        let model = BertModel::load(vb, &config)
            .map_err(|e| DomainError::Configuration(format!("failed to build BERT model: {e}")))?;

        tracing::info!(model = repo_id, dimensions, "embedding model ready");

        Ok(Self {
            inner: Arc::new(BertInner {
                model,
                tokenizer,
                device,
                model_type,
                dimensions,
                max_seq_length,
            }),
        })
    }

    /// CUDA, then Metal, then CPU.
    fn select_device() -> Device {
        if candle_core::utils::cuda_is_available() {
            if let Ok(device) = Device::new_cuda(0) {
                tracing::info!("using CUDA for embedding inference");
                return device;
            }
        }
        if candle_core::utils::metal_is_available() {
            if let Ok(device) = Device::new_metal(0) {
                tracing::info!("using Metal for embedding inference");
                return device;
            }
        }
        tracing::info!("using CPU for embedding inference");
        Device::Cpu
    }
}

impl BertInner {
    fn embed_batch_sync(&self, texts: &[&str]) -> DomainResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let (input_ids, attention_mask) = self.tokenize(texts)?;

        // Sentence-transformer models use a single segment.
        let token_type_ids = Tensor::zeros_like(&input_ids).map_err(embed_err)?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, None)
            .map_err(embed_err)?;

        let pooled = self.mean_pool(&hidden_states, &attention_mask)?;
        let normalized = self.normalize_l2(&pooled)?;
        self.tensor_to_vec2d(&normalized)
    }

    fn tokenize(&self, texts: &[&str]) -> DomainResult<(Tensor, Tensor)> {
        use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams};

        let mut tokenizer = self.tokenizer.clone();

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            direction: tokenizers::PaddingDirection::Right,
            pad_to_multiple_of: None,
            pad_id: 0,
            pad_type_id: 0,
            pad_token: "[PAD]".to_string(),
        }));

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: self.max_seq_length,
                strategy: tokenizers::TruncationStrategy::LongestFirst,
                stride: 0,
                direction: tokenizers::TruncationDirection::Right,
            }))
            .map_err(|e| DomainError::Embedding(format!("truncation config failed: {e}")))?;

        let encodings = tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| DomainError::Embedding(format!("tokenization failed: {e}")))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let input_ids_flat: Vec<u32> = encodings
            .iter()
            .flat_map(|e| e.get_ids().iter().copied())
            .collect();
        let attention_mask_flat: Vec<u32> = encodings
            .iter()
            .flat_map(|e| e.get_attention_mask().iter().copied())
            .collect();

        let input_ids = Tensor::from_vec(input_ids_flat, (batch_size, seq_len), &self.device)
            .map_err(embed_err)?;
        let attention_mask =
            Tensor::from_vec(attention_mask_flat, (batch_size, seq_len), &self.device)
                .map_err(embed_err)?
                .to_dtype(DType::F32)
                .map_err(embed_err)?;

        Ok((input_ids, attention_mask))
    }

    /// Mean pooling over token embeddings, weighted by the attention mask so
    /// padding tokens contribute nothing.
    fn mean_pool(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> DomainResult<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)
            .map_err(embed_err)?
            .broadcast_as(hidden_states.shape())
            .map_err(embed_err)?;

        let weighted = hidden_states.mul(&mask_expanded).map_err(embed_err)?;
        let sum_hidden = weighted.sum(1).map_err(embed_err)?;

        let sum_mask = mask_expanded
            .sum(1)
            .map_err(embed_err)?
            .clamp(1e-9, f32::MAX)
            .map_err(embed_err)?;

        sum_hidden.div(&sum_mask).map_err(embed_err)
    }

    /// L2 normalization so cosine similarity reduces to a dot product.
    fn normalize_l2(&self, embeddings: &Tensor) -> DomainResult<Tensor> {
        let norm = embeddings
            .sqr()
            .map_err(embed_err)?
            .sum_keepdim(1)
            .map_err(embed_err)?
            .sqrt()
            .map_err(embed_err)?
            .clamp(1e-12, f32::MAX)
            .map_err(embed_err)?;

        embeddings.div(&norm).map_err(embed_err)
    }

    fn tensor_to_vec2d(&self, tensor: &Tensor) -> DomainResult<Vec<Vec<f32>>> {
        let dims = tensor.shape().dims();
        let (batch_size, hidden_size) = (dims[0], dims[1]);

        let flat: Vec<f32> = tensor
            .flatten_all()
            .map_err(embed_err)?
            .to_vec1()
            .map_err(embed_err)?;

        Ok(flat
            .chunks_exact(hidden_size)
            .take(batch_size)
            .map(<[f32]>::to_vec)
            .collect())
    }
}

fn embed_err(err: candle_core::Error) -> DomainError {
    DomainError::Embedding(err.to_string())
}

#[async_trait]
impl EmbeddingService for BertEmbedder {
    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        let text = text.to_string();
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || {
            let embeddings = inner.embed_batch_sync(&[&text])?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| DomainError::Embedding("expected 1 embedding, got 0".to_string()))
        })
        .await
        .map_err(|e| DomainError::Embedding(format!("blocking task join failed: {e}")))?
    }

    async fn embed_batch(&self, texts: &[&str]) -> DomainResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let owned: Vec<String> = texts.iter().map(ToString::to_string).collect();
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
            inner.embed_batch_sync(&refs)
        })
        .await
        .map_err(|e| DomainError::Embedding(format!("blocking task join failed: {e}")))?
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions
    }

    fn model(&self) -> EmbeddingModel {
        self.inner.model_type
    }
}
