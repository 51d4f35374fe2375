//! Vector index build, query, and reload behavior.

mod common;

use std::sync::Arc;

use medirec::domain::errors::DomainError;
use medirec::domain::models::Chunk;
use medirec::{HashedEmbedder, VectorIndex};

use common::{populated_index, sample_chunks, MislabeledEmbedder};

#[tokio::test]
async fn probe_equal_to_content_returns_that_chunk_first() {
    let dir = tempfile::tempdir().unwrap();
    let index = populated_index(&dir.path().join("records.db")).await;

    // The hashed embedder maps identical text to identical vectors, so a
    // probe equal to a stored record's content must rank it first.
    let target = &sample_chunks()[1];
    let hits = index.query(&target.content, 3, false).await.unwrap();

    assert_eq!(hits[0].chunk.key, target.key);
    assert!(hits[0].distance.abs() < 1e-5);
    // Ascending distance ordering.
    assert!(hits[0].distance <= hits[1].distance);
}

#[tokio::test]
async fn query_with_k_zero_returns_empty() {
    let dir = tempfile::tempdir().unwrap();
    let index = populated_index(&dir.path().join("records.db")).await;

    let hits = index.query("anything at all", 0, false).await.unwrap();
    assert!(hits.is_empty());

    let hits = index.query("", 0, true).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn reload_yields_identical_query_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");

    let probe = "patient_id:426815";
    let before = {
        let index = populated_index(&path).await;
        index.query(probe, 3, false).await.unwrap()
    };

    let reloaded = VectorIndex::load(&path, Arc::new(HashedEmbedder::new()))
        .await
        .expect("reload should succeed without re-embedding");
    let after = reloaded.query(probe, 3, false).await.unwrap();

    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(after.iter()) {
        assert_eq!(a.chunk, b.chunk);
        assert!((a.distance - b.distance).abs() < 1e-6);
    }
}

#[tokio::test]
async fn load_missing_index_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let result = VectorIndex::load(
        dir.path().join("absent.db"),
        Arc::new(HashedEmbedder::new()),
    )
    .await;

    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn load_rejects_non_index_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not-an-index.db");
    std::fs::write(&path, b"plain bytes, not sqlite").unwrap();

    let result = VectorIndex::load(&path, Arc::new(HashedEmbedder::new())).await;
    assert!(matches!(result, Err(DomainError::Storage(_))));
}

#[tokio::test]
async fn load_rejects_mismatched_embedding_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    populated_index(&path).await;

    // Built with the hashed model; loading under a different identity would
    // make similarity scores incomparable.
    let result = VectorIndex::load(&path, Arc::new(MislabeledEmbedder)).await;
    assert!(matches!(result, Err(DomainError::Configuration(_))));
}

#[tokio::test]
async fn create_rejects_incompatible_existing_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    populated_index(&path).await;

    let result = VectorIndex::create(&path, Arc::new(MislabeledEmbedder)).await;
    assert!(matches!(result, Err(DomainError::Storage(_))));

    // Re-creating under the same model is fine and keeps the data.
    let index = VectorIndex::create(&path, Arc::new(medirec::HashedEmbedder::new()))
        .await
        .unwrap();
    assert_eq!(index.len().await.unwrap(), sample_chunks().len());
}

#[tokio::test]
async fn duplicate_keys_are_callers_responsibility() {
    let dir = tempfile::tempdir().unwrap();
    let index = populated_index(&dir.path().join("records.db")).await;

    // At-least-once semantics: adding the same chunk again duplicates it.
    let duplicate = sample_chunks().remove(0);
    assert!(index.contains_key(&duplicate.key).await.unwrap());

    index.add(std::slice::from_ref(&duplicate)).await.unwrap();
    assert_eq!(index.len().await.unwrap(), sample_chunks().len() + 1);

    // The key check is what a deduplicating caller uses before add.
    assert!(index.contains_key(&duplicate.key).await.unwrap());
    assert!(!index.contains_key("999999:0").await.unwrap());
}

#[tokio::test]
async fn ties_break_by_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(HashedEmbedder::new());
    let index = VectorIndex::create(dir.path().join("ties.db"), embedder)
        .await
        .unwrap();

    // Identical content embeds identically: all three are perfect ties.
    let chunks = vec![
        Chunk::new("a", "same text", 0),
        Chunk::new("b", "same text", 1),
        Chunk::new("c", "same text", 2),
    ];
    index.add(&chunks).await.unwrap();

    let hits = index.query("same text", 3, false).await.unwrap();
    let keys: Vec<&str> = hits.iter().map(|h| h.chunk.key.as_str()).collect();
    assert_eq!(keys, vec!["a:0", "b:1", "c:2"]);
}

#[tokio::test]
async fn rerank_reorders_but_never_changes_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let index = populated_index(&dir.path().join("records.db")).await;

    let plain = index.query("gout joint pain", 3, false).await.unwrap();
    let reranked = index.query("gout joint pain", 3, true).await.unwrap();

    // Same candidate set (all three records fit in the k*m superset here),
    // possibly different order.
    let mut plain_keys: Vec<&str> = plain.iter().map(|h| h.chunk.key.as_str()).collect();
    let mut reranked_keys: Vec<&str> = reranked.iter().map(|h| h.chunk.key.as_str()).collect();
    plain_keys.sort_unstable();
    reranked_keys.sort_unstable();
    assert_eq!(plain_keys, reranked_keys);

    // Lexical rerank must surface the record that actually mentions the
    // query words.
    assert!(reranked[0].chunk.content.contains("gout"));
}

#[tokio::test]
async fn empty_add_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(HashedEmbedder::new());
    let index = VectorIndex::create(dir.path().join("empty.db"), embedder)
        .await
        .unwrap();

    assert_eq!(index.add(&[]).await.unwrap(), 0);
    assert!(index.is_empty().await.unwrap());
}
