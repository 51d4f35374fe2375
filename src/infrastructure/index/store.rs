//! Persisted vector index backed by SQLite.
//!
//! Each index is a single SQLite file holding the chunk rows (content plus
//! embedding as a little-endian f32 BLOB) and a meta table recording the
//! embedding model identity and dimensionality. Similarity search embeds the
//! query, computes cosine distance in Rust over the stored vectors, and
//! ranks ascending by distance with insertion order as the tie-break.
//!
//! Single-writer/multiple-reader discipline is organizational: ingestion is
//! an offline batch job, so queries never need a lock against it.

use std::path::Path;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, SearchHit};
use crate::domain::ports::EmbeddingService;

/// Oversampling factor for rerank: the rerank pass re-orders the top
/// `k * RERANK_OVERSAMPLE` candidates before truncating back to k, so
/// re-scoring cannot starve recall.
pub const RERANK_OVERSAMPLE: usize = 3;

const META_MODEL_KEY: &str = "embedding_model";
const META_DIMENSIONS_KEY: &str = "dimensions";

/// A persisted, similarity-searchable store of (embedding, chunk) pairs.
pub struct VectorIndex {
    pool: SqlitePool,
    embedder: Arc<dyn EmbeddingService>,
}

impl VectorIndex {
    /// Initialize storage at `path`, creating the file if needed.
    ///
    /// # Arguments
    /// * `path` - SQLite file backing the index
    /// * `embedder` - Embedding service whose identity becomes part of the
    ///   index schema
    ///
    /// # Returns
    /// * `Ok(Self)` - Index handle ready for `add` and `query`
    /// * `Err(Storage)` - The path already holds an index recorded under a
    ///   different embedding model identity
    pub async fn create(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingService>,
    ) -> DomainResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DomainError::Storage(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
        }

        let pool = open_pool(path.as_ref(), true).await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS index_meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            ",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS chunks (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                chunk_key  TEXT NOT NULL,
                content    TEXT NOT NULL,
                origin_id  TEXT NOT NULL,
                position   INTEGER NOT NULL,
                embedding  BLOB NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&pool)
        .await?;

        if let Some(stored_model) = read_meta(&pool, META_MODEL_KEY).await? {
            if stored_model != embedder.model().identity() {
                return Err(DomainError::Storage(format!(
                    "index at {} was created with embedding model '{stored_model}', \
                     refusing to reinitialize it as '{}'",
                    path.as_ref().display(),
                    embedder.model().identity()
                )));
            }
        }

        write_meta(&pool, META_MODEL_KEY, embedder.model().identity()).await?;
        write_meta(
            &pool,
            META_DIMENSIONS_KEY,
            &embedder.dimensions().to_string(),
        )
        .await?;

        tracing::debug!(path = %path.as_ref().display(), model = %embedder.model(), "index created");

        Ok(Self { pool, embedder })
    }

    /// Reopen prior storage without re-embedding anything.
    ///
    /// Fails with `NotFound` if the file is absent, `Storage` if it is not
    /// an index, and `Configuration` if the stored embedding model identity
    /// or dimensionality disagrees with the supplied embedder.
    pub async fn load(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingService>,
    ) -> DomainResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DomainError::NotFound(format!(
                "no vector index at {}",
                path.display()
            )));
        }

        let pool = open_pool(path, false).await?;

        let stored_model = read_meta(&pool, META_MODEL_KEY)
            .await
            .map_err(|_| not_an_index(path))?
            .ok_or_else(|| not_an_index(path))?;
        let stored_dimensions: usize = read_meta(&pool, META_DIMENSIONS_KEY)
            .await?
            .ok_or_else(|| not_an_index(path))?
            .parse()
            .map_err(|_| not_an_index(path))?;

        if stored_model != embedder.model().identity() {
            return Err(DomainError::Configuration(format!(
                "index at {} was built with embedding model '{stored_model}' but \
                 '{}' was supplied; similarity scores would be incomparable",
                path.display(),
                embedder.model().identity()
            )));
        }

        if stored_dimensions != embedder.dimensions() {
            return Err(DomainError::Configuration(format!(
                "index at {} stores {stored_dimensions}-dimensional vectors but the \
                 embedder produces {}",
                path.display(),
                embedder.dimensions()
            )));
        }

        Ok(Self { pool, embedder })
    }

    /// Embed and append chunks in one transaction.
    ///
    /// At-least-once semantics: duplicate chunk keys produce duplicate rows.
    /// Callers that need deduplication check [`Self::contains_key`] first.
    pub async fn add(&self, chunks: &[Chunk]) -> DomainResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&contents).await?;

        let mut tx = self.pool.begin().await?;
        let created_at = chrono::Utc::now().to_rfc3339();

        for (chunk, embedding) in chunks.iter().zip(&embeddings) {
            if embedding.len() != self.embedder.dimensions() {
                return Err(DomainError::Storage(format!(
                    "embedding for chunk '{}' has {} dimensions, index expects {}",
                    chunk.key,
                    embedding.len(),
                    self.embedder.dimensions()
                )));
            }

            sqlx::query(
                r"
                INSERT INTO chunks (chunk_key, content, origin_id, position, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&chunk.key)
            .bind(&chunk.content)
            .bind(&chunk.origin_id)
            .bind(chunk.position as i64)
            .bind(embedding_to_bytes(embedding))
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(count = chunks.len(), "chunks added to index");
        Ok(chunks.len())
    }

    /// Returns true when a chunk with this key is already stored.
    pub async fn contains_key(&self, key: &str) -> DomainResult<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM chunks WHERE chunk_key = ?) AS present")
            .bind(key)
            .fetch_one(&self.pool)
            .await?;
        let present: i64 = row.get("present");
        Ok(present != 0)
    }

    /// Number of stored chunks.
    pub async fn len(&self) -> DomainResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count as usize)
    }

    pub async fn is_empty(&self) -> DomainResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Return the k nearest chunks to `text` by cosine distance, ascending,
    /// ties broken by insertion order. `k == 0` yields an empty result.
    ///
    /// With `rerank`, the top `k * RERANK_OVERSAMPLE` candidates are
    /// re-scored by lexical overlap with the query and re-sorted before
    /// truncation to k; the candidate superset itself never changes.
    ///
    /// # Arguments
    /// * `text` - Query text, embedded with the index's own model
    /// * `k` - Number of results to return
    /// * `rerank` - Re-order the oversampled candidate set lexically
    pub async fn query(&self, text: &str, k: usize, rerank: bool) -> DomainResult<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(text).await?;

        let rows = sqlx::query(
            "SELECT id, chunk_key, content, origin_id, position, embedding FROM chunks ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(i64, Chunk, f32)> = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            let bytes: Vec<u8> = row.get("embedding");
            let embedding = bytes_to_embedding(&bytes)?;
            let distance = cosine_distance(&query_embedding, &embedding);

            let chunk = Chunk {
                key: row.get("chunk_key"),
                content: row.get("content"),
                origin_id: row.get("origin_id"),
                position: row.get::<i64, _>("position") as usize,
            };
            scored.push((id, chunk, distance));
        }

        scored.sort_by(|a, b| {
            a.2.partial_cmp(&b.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        if rerank {
            let superset = k.saturating_mul(RERANK_OVERSAMPLE);
            scored.truncate(superset);
            scored.sort_by(|a, b| {
                let score_a = lexical_overlap(text, &a.1.content);
                let score_b = lexical_overlap(text, &b.1.content);
                score_b
                    .partial_cmp(&score_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });
        }

        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(_, chunk, distance)| SearchHit::new(chunk, distance))
            .collect())
    }
}

async fn open_pool(path: &Path, create: bool) -> DomainResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create);

    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(|e| DomainError::Storage(format!("failed to open {}: {e}", path.display())))
}

async fn read_meta(pool: &SqlitePool, key: &str) -> DomainResult<Option<String>> {
    let row = sqlx::query("SELECT value FROM index_meta WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("value")))
}

async fn write_meta(pool: &SqlitePool, key: &str, value: &str) -> DomainResult<()> {
    sqlx::query("INSERT OR REPLACE INTO index_meta (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

fn not_an_index(path: &Path) -> DomainError {
    DomainError::Storage(format!(
        "{} exists but is not a medirec vector index",
        path.display()
    ))
}

/// Serialize an embedding as little-endian f32 bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize little-endian f32 bytes back into an embedding.
fn bytes_to_embedding(bytes: &[u8]) -> DomainResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(DomainError::Storage(
            "stored embedding has invalid byte length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Cosine distance between two vectors: `1 - cos(a, b)`.
///
/// Mismatched dimensions or a zero-magnitude operand rank last (`f32::MAX`)
/// rather than erroring, so one corrupt row cannot fail a whole query.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return f32::MAX;
    }

    1.0 - (dot / (mag_a * mag_b))
}

/// Share of query words present in the content, case-insensitive.
///
/// The rerank relevance function: cheap, deterministic, and only ever used
/// to re-order an already-retrieved candidate set.
pub fn lexical_overlap(query: &str, content: &str) -> f32 {
    let content_lower = content.to_lowercase();
    let query_lower = query.to_lowercase();
    let words: Vec<&str> = query_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        return 0.0;
    }

    let matches = words
        .iter()
        .filter(|word| content_lower.contains(**word))
        .count();

    matches as f32 / words.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_bytes_round_trip() {
        let embedding = vec![0.1, -0.2, 0.3, 0.4, -0.5];
        let restored = bytes_to_embedding(&embedding_to_bytes(&embedding)).unwrap();

        assert_eq!(embedding.len(), restored.len());
        for (a, b) in embedding.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_invalid_byte_length_rejected() {
        assert!(bytes_to_embedding(&[0u8; 7]).is_err());
    }

    #[test]
    fn test_cosine_distance_identity_and_orthogonality() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_distance(&a, &a) - 0.0).abs() < 1e-6);

        let b = vec![0.0, 1.0, 0.0];
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_degenerate_inputs_rank_last() {
        let a = vec![1.0, 0.0];
        assert_eq!(cosine_distance(&a, &[1.0, 0.0, 0.0]), f32::MAX);
        assert_eq!(cosine_distance(&a, &[0.0, 0.0]), f32::MAX);
    }

    #[test]
    fn test_lexical_overlap() {
        assert!((lexical_overlap("hypertension dizziness", "medical_history:hypertension") - 0.5).abs() < 1e-6);
        assert!((lexical_overlap("", "anything") - 0.0).abs() < 1e-6);
        assert!((lexical_overlap("gout", "history of GOUT and asthma") - 1.0).abs() < 1e-6);
    }
}
