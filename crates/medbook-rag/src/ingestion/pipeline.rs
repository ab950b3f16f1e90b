//! Ingestion pipeline orchestration: load, split, embed, upsert

use indicatif::ProgressBar;
use std::path::Path;
use std::sync::Arc;

use super::parser::PdfLoader;
use super::splitter::RecursiveTextSplitter;
use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{Chunk, ChunkMetadata, Page, VectorRecord};

/// Summary of a completed ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks: usize,
    pub batches: usize,
    pub vectors_upserted: usize,
}

/// A loaded PDF and its chunks
#[derive(Debug, Clone)]
pub struct PreparedBook {
    pub pages: Vec<Page>,
    pub chunks: Vec<Chunk>,
}

/// Embeds chunks and upserts them into the vector index in batches
pub struct IngestPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    batch_size: usize,
    id_prefix: String,
    progress: ProgressBar,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            batch_size: config.batch_size.max(1),
            id_prefix: config.id_prefix.clone(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report progress (one tick per chunk) on the given bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Load a PDF and split it into chunks, ready for `upsert_chunks`
    pub fn prepare(path: &Path, splitter: &RecursiveTextSplitter) -> Result<PreparedBook> {
        tracing::info!("Loading {}...", path.display());
        let pages = PdfLoader::load(path)?;
        tracing::info!("Loaded {} pages", pages.len());

        let chunks = splitter.split_pages(&pages);
        tracing::info!("Split into {} chunks", chunks.len());

        Ok(PreparedBook { pages, chunks })
    }

    /// Embed and upsert chunks in order.
    ///
    /// Chunk `i` is stored under `{id_prefix}{i}`. The first failing batch
    /// stops the run; earlier batches stay in the index.
    pub async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<IngestReport> {
        let mut report = IngestReport {
            chunks: chunks.len(),
            ..IngestReport::default()
        };

        self.progress.set_length(chunks.len() as u64);
        let dimensions = self.embedder.dimensions();

        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            let start = batch_index * self.batch_size;
            let end = start + batch.len();

            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let records = batch
                .iter()
                .zip(embeddings)
                .enumerate()
                .map(|(offset, (chunk, values))| {
                    if values.len() != dimensions {
                        return Err(Error::embedding(format!(
                            "Embedding has {} dimensions, index expects {}",
                            values.len(),
                            dimensions
                        )));
                    }
                    Ok(VectorRecord {
                        id: format!("{}{}", self.id_prefix, start + offset),
                        values,
                        metadata: ChunkMetadata::from(chunk),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            report.vectors_upserted += self.store.upsert(&records).await?;
            report.batches += 1;

            self.progress.inc(batch.len() as u64);
            tracing::info!("Upserted batch {} to {}", start, end);
        }

        self.progress.finish_and_clear();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VectorMatch;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::io::Write;

    struct FakeEmbedder {
        dims: usize,
        output_dims: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0; self.output_dims];
            if let Some(first) = v.first_mut() {
                *first = text.len() as f32;
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            self.dims
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    #[derive(Default)]
    struct FakeStore {
        batches: Mutex<Vec<Vec<VectorRecord>>>,
        fail_on_call: Option<usize>,
    }

    #[async_trait]
    impl VectorStoreProvider for FakeStore {
        async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
            let mut batches = self.batches.lock();
            if self.fail_on_call == Some(batches.len()) {
                return Err(Error::vector_db("quota exceeded"));
            }
            batches.push(records.to_vec());
            Ok(records.len())
        }

        async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<VectorMatch>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk {
                text: format!("chunk text {}", i),
                page: (i / 10) as u32,
            })
            .collect()
    }

    fn pipeline(store: Arc<FakeStore>, output_dims: usize) -> IngestPipeline {
        let embedder = Arc::new(FakeEmbedder {
            dims: 4,
            output_dims,
        });
        IngestPipeline::new(embedder, store, &IngestConfig::default())
    }

    #[tokio::test]
    async fn test_batches_of_one_hundred_with_sequential_ids() {
        let store = Arc::new(FakeStore::default());
        let report = pipeline(store.clone(), 4)
            .upsert_chunks(&chunks(250))
            .await
            .unwrap();

        assert_eq!(
            report,
            IngestReport {
                chunks: 250,
                batches: 3,
                vectors_upserted: 250,
            }
        );

        let batches = store.batches.lock();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(batches[0][0].id, "chunk_0");
        assert_eq!(batches[1][0].id, "chunk_100");
        assert_eq!(batches[2][49].id, "chunk_249");
        assert_eq!(batches[2][49].metadata.text, "chunk text 249");
        assert_eq!(batches[2][49].metadata.page, 24);
    }

    #[tokio::test]
    async fn test_failed_batch_stops_run() {
        let store = Arc::new(FakeStore {
            fail_on_call: Some(1),
            ..FakeStore::default()
        });
        let err = pipeline(store.clone(), 4)
            .upsert_chunks(&chunks(250))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::VectorDb(_)));
        assert_eq!(store.batches.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let store = Arc::new(FakeStore::default());
        let err = pipeline(store.clone(), 3)
            .upsert_chunks(&chunks(5))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Embedding(_)));
        assert!(store.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_upserts_nothing() {
        let store = Arc::new(FakeStore::default());
        let report = pipeline(store.clone(), 4).upsert_chunks(&[]).await.unwrap();

        assert_eq!(report.batches, 0);
        assert!(store.batches.lock().is_empty());
    }

    #[test]
    fn test_prepare_missing_pdf() {
        let err = IngestPipeline::prepare(
            Path::new("missing/Medical_book.pdf"),
            &RecursiveTextSplitter::new(1000, 200),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "File 'missing/Medical_book.pdf' not found");
    }

    #[test]
    fn test_prepare_unreadable_pdf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4 truncated").unwrap();

        let err = IngestPipeline::prepare(file.path(), &RecursiveTextSplitter::new(1000, 200))
            .unwrap_err();
        assert!(matches!(err, Error::PdfParse { .. }));
    }
}
