//! ONNX-based embedding generation
//!
//! Runs sentence-transformers `all-MiniLM-L6-v2` locally and produces
//! 384-dimensional, mean-pooled, L2-normalized embeddings.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use super::embedding::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// ONNX-based text embedder
///
/// The session is shared behind a mutex and inference runs on the
/// blocking pool so the async runtime is never stalled.
pub struct OnnxEmbedder {
    model: Arc<Mutex<OnnxModel>>,
    dimensions: usize,
    name: String,
}

struct OnnxModel {
    /// ONNX Runtime session
    session: Session,
    /// HuggingFace tokenizer
    tokenizer: Tokenizer,
    /// Embedding dimensions
    dimensions: usize,
    /// Inference batch size
    batch_size: usize,
}

impl OnnxEmbedder {
    /// Load the model, downloading it into the cache directory if needed
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        let model_dir = config.cache_dir.join(&config.model);
        tokio::fs::create_dir_all(&model_dir).await.map_err(|e| {
            Error::Config(format!("Failed to create cache directory: {}", e))
        })?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            download(&config.model, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download(&config.model, "tokenizer.json", &tokenizer_path).await?;
        }

        let session = Session::builder()
            .map_err(|e| Error::embedding(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::embedding(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::embedding(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| Error::embedding(format!("Failed to load model: {}", e)))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::embedding(format!("Failed to load tokenizer: {}", e)))?;
        configure_tokenizer(&mut tokenizer, config.max_length)?;

        tracing::info!("ONNX embedder initialized ({} dimensions)", config.dimensions);

        Ok(Self {
            model: Arc::new(Mutex::new(OnnxModel {
                session,
                tokenizer,
                dimensions: config.dimensions,
                batch_size: config.batch_size.max(1),
            })),
            dimensions: config.dimensions,
            name: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::embedding("Empty embedding result"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            model.lock().embed_batch(&refs)
        })
        .await
        .map_err(|e| Error::internal(format!("Embedding task failed: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl OnnxModel {
    fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let inputs = encode_inputs(&self.tokenizer, batch)?;
            all_embeddings.extend(self.run_model(inputs)?);
        }
        Ok(all_embeddings)
    }

    fn run_model(&mut self, inputs: EncodedBatch) -> Result<Vec<Vec<f32>>> {
        let shape = vec![inputs.batch_size, inputs.seq_len];
        let tensor = |name: &str, data: Vec<i64>| {
            Tensor::from_array((shape.clone(), data.into_boxed_slice()))
                .map(|t| t.into_dyn())
                .map_err(|e| Error::embedding(format!("Failed to build {} tensor: {}", name, e)))
        };

        let session_inputs = vec![
            ("input_ids", tensor("input_ids", inputs.input_ids)?),
            ("attention_mask", tensor("attention_mask", inputs.attention_mask.clone())?),
            ("token_type_ids", tensor("token_type_ids", inputs.token_type_ids)?),
        ];

        let outputs = self
            .session
            .run(session_inputs)
            .map_err(|e| Error::embedding(format!("Inference failed: {}", e)))?;

        // last_hidden_state, or the first output for exports that rename it
        let named: Vec<_> = outputs.iter().collect();
        let hidden_state = named
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| named.first())
            .map(|(_, value)| value)
            .ok_or_else(|| Error::embedding("Model produced no output"))?;

        let (dims, hidden) = hidden_state
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::embedding(format!("Failed to read hidden state: {}", e)))?;
        let hidden_size = dims
            .get(2)
            .map(|&d| d as usize)
            .unwrap_or(self.dimensions);

        Ok(mean_pool(
            hidden,
            &inputs.attention_mask,
            inputs.batch_size,
            inputs.seq_len,
            hidden_size,
        ))
    }
}

/// Row-major `[batch, seq_len]` model inputs
#[derive(Debug)]
struct EncodedBatch {
    batch_size: usize,
    seq_len: usize,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

/// Truncate at `max_length` tokens, keeping `[CLS]` and `[SEP]`, and pad
/// each batch to its longest member.
fn configure_tokenizer(tokenizer: &mut Tokenizer, max_length: usize) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..TruncationParams::default()
        }))
        .map_err(|e| Error::embedding(format!("Failed to configure truncation: {}", e)))?;

    let pad_token = "[PAD]".to_string();
    let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id,
        pad_token,
        ..PaddingParams::default()
    }));
    Ok(())
}

fn encode_inputs(tokenizer: &Tokenizer, texts: &[&str]) -> Result<EncodedBatch> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| Error::embedding(format!("Tokenization failed: {}", e)))?;

    let seq_len = encodings.first().map(|e| e.len()).unwrap_or(0);
    let widen = |values: &[u32]| values.iter().map(|&v| i64::from(v)).collect::<Vec<_>>();

    Ok(EncodedBatch {
        batch_size: encodings.len(),
        seq_len,
        input_ids: encodings.iter().flat_map(|e| widen(e.get_ids())).collect(),
        attention_mask: encodings
            .iter()
            .flat_map(|e| widen(e.get_attention_mask()))
            .collect(),
        token_type_ids: encodings.iter().flat_map(|e| widen(e.get_type_ids())).collect(),
    })
}

/// Attention-masked mean pooling followed by L2 normalization.
///
/// `hidden` is laid out `[batch, seq_len, hidden_size]`.
fn mean_pool(
    hidden: &[f32],
    attention_mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for i in 0..batch_size {
        let mut sum = vec![0.0f32; hidden_size];
        let mut count = 0.0f32;

        for j in 0..seq_len {
            let mask_val = attention_mask[i * seq_len + j] as f32;
            if mask_val > 0.0 {
                for (k, slot) in sum.iter_mut().enumerate() {
                    let idx = i * seq_len * hidden_size + j * hidden_size + k;
                    if let Some(v) = hidden.get(idx) {
                        *slot += v * mask_val;
                    }
                }
                count += mask_val;
            }
        }

        if count > 0.0 {
            for val in &mut sum {
                *val /= count;
            }
        }

        let norm: f32 = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut sum {
                *val /= norm;
            }
        }

        embeddings.push(sum);
    }

    embeddings
}

/// Fetch one file of a sentence-transformers model from Hugging Face
async fn download(model_name: &str, file: &str, path: &Path) -> Result<()> {
    let url = format!(
        "https://huggingface.co/sentence-transformers/{}/resolve/main/{}",
        model_name, file
    );

    tracing::info!("Downloading {} from: {}", file, url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::embedding(format!("Failed to download {}: {}", file, e)))?;

    if !response.status().is_success() {
        return Err(Error::embedding(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::embedding(format!("Failed to read {} bytes: {}", file, e)))?;

    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| Error::embedding(format!("Failed to save {}: {}", file, e)))?;

    tracing::info!("Downloaded {} ({} bytes)", file, bytes.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    /// Word-level BERT-style tokenizer: [CLS]=0 [SEP]=1 [UNK]=2 [PAD]=3
    fn word_tokenizer() -> Tokenizer {
        Tokenizer::from_str(
            r#"{
                "version": "1.0",
                "truncation": null,
                "padding": null,
                "added_tokens": [],
                "normalizer": null,
                "pre_tokenizer": { "type": "Whitespace" },
                "post_processor": { "type": "BertProcessing", "sep": ["[SEP]", 1], "cls": ["[CLS]", 0] },
                "decoder": null,
                "model": {
                    "type": "WordLevel",
                    "vocab": { "[CLS]": 0, "[SEP]": 1, "[UNK]": 2, "[PAD]": 3, "fever": 4, "cough": 5 },
                    "unk_token": "[UNK]"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_long_input_keeps_sep_when_truncated() {
        let mut tokenizer = word_tokenizer();
        configure_tokenizer(&mut tokenizer, 6).unwrap();

        let long = "fever cough ".repeat(20);
        let inputs = encode_inputs(&tokenizer, &[long.as_str(), "cough"]).unwrap();

        assert_eq!(inputs.batch_size, 2);
        assert_eq!(inputs.seq_len, 6);
        assert_eq!(&inputs.input_ids[..6], &[0, 4, 5, 4, 5, 1]);
        assert_eq!(&inputs.input_ids[6..], &[0, 5, 1, 3, 3, 3]);
        assert_eq!(&inputs.attention_mask[6..], &[1, 1, 1, 0, 0, 0]);
        assert!(inputs.token_type_ids.iter().all(|&t| t == 0));
    }

    #[test]
    fn test_short_batch_pads_to_longest() {
        let mut tokenizer = word_tokenizer();
        configure_tokenizer(&mut tokenizer, 256).unwrap();

        let inputs = encode_inputs(&tokenizer, &["fever", "fever cough fever"]).unwrap();
        assert_eq!(inputs.seq_len, 5);
        assert_eq!(inputs.input_ids, vec![0, 4, 1, 3, 3, 0, 4, 5, 4, 1]);
        assert_eq!(inputs.attention_mask, vec![1, 1, 1, 0, 0, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        // batch 1, seq 3, hidden 2; last token is padding
        let hidden = [3.0, 0.0, 1.0, 0.0, 100.0, 100.0];
        let mask = [1, 1, 0];
        let pooled = mean_pool(&hidden, &mask, 1, 3, 2);

        assert_eq!(pooled.len(), 1);
        // mean of (3,0) and (1,0) is (2,0), normalized to (1,0)
        assert!((pooled[0][0] - 1.0).abs() < 1e-6);
        assert!(pooled[0][1].abs() < 1e-6);
    }

    #[test]
    fn test_mean_pool_unit_length() {
        let hidden = [1.0, 2.0, 2.0, 0.0, 0.0, 5.0];
        let mask = [1, 1];
        let pooled = mean_pool(&hidden, &mask, 2, 1, 3);

        for v in pooled {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_mean_pool_all_masked_is_zero() {
        let pooled = mean_pool(&[1.0, 1.0], &[0], 1, 1, 2);
        assert_eq!(pooled, vec![vec![0.0, 0.0]]);
    }
}
