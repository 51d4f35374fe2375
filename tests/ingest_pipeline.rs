//! End-to-end ingestion: load, chunk, embed, persist, query.

use std::io::Write;
use std::sync::Arc;

use medirec::domain::models::ChunkerConfig;
use medirec::{HashedEmbedder, IngestService};

fn write_sources(dir: &tempfile::TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let records_path = dir.path().join("records.jsonl");
    let mut records = std::fs::File::create(&records_path).unwrap();
    writeln!(
        records,
        r#"{{"patient_id":"426815","gender":"male","age":50,"height":"172cm","weight":"80kg","medical_history":"hypertension","symptoms":"dizziness"}}"#
    )
    .unwrap();
    writeln!(
        records,
        r#"{{"patient_id":"183054","gender":"female","age":44,"height":"160cm","weight":"55kg","medical_history":"diabetes","symptoms":"thirst"}}"#
    )
    .unwrap();

    let knowledge_path = dir.path().join("knowledge.txt");
    let mut knowledge = std::fs::File::create(&knowledge_path).unwrap();
    write!(
        knowledge,
        "Hypertension calls for blood pressure monitoring and lipid panels.\n\n\
         Diabetes screening relies on fasting glucose and HbA1c."
    )
    .unwrap();

    (records_path, knowledge_path)
}

#[tokio::test]
async fn build_then_query_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (records_path, knowledge_path) = write_sources(&dir);

    let ingest = IngestService::new(Arc::new(HashedEmbedder::new()), ChunkerConfig::default()).unwrap();

    let records_index = ingest
        .build_records_index(&records_path, dir.path().join("records.db"))
        .await
        .unwrap();
    assert_eq!(records_index.len().await.unwrap(), 2);

    let knowledge_index = ingest
        .build_knowledge_index(&knowledge_path, dir.path().join("knowledge.db"))
        .await
        .unwrap();
    assert_eq!(knowledge_index.len().await.unwrap(), 2);

    // A probe equal to a stored record's merged content returns that chunk
    // first (hashed embeddings are content-exact).
    let hits = records_index
        .query(
            "patient_id:426815,gender:male,age:50,height:172cm,weight:80kg,\
             medical_history:hypertension,symptoms:dizziness",
            1,
            false,
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.origin_id, "426815");
}

#[tokio::test]
async fn reingesting_identical_input_adds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (records_path, _) = write_sources(&dir);

    let ingest = IngestService::new(Arc::new(HashedEmbedder::new()), ChunkerConfig::default()).unwrap();
    let persist = dir.path().join("records.db");

    let first = ingest
        .build_records_index(&records_path, &persist)
        .await
        .unwrap();
    assert_eq!(first.len().await.unwrap(), 2);

    // Deterministic chunk keys make the second pass a pure no-op.
    let second = ingest
        .build_records_index(&records_path, &persist)
        .await
        .unwrap();
    assert_eq!(second.len().await.unwrap(), 2);
}

#[tokio::test]
async fn missing_source_surfaces_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let ingest = IngestService::new(Arc::new(HashedEmbedder::new()), ChunkerConfig::default()).unwrap();

    let result = ingest
        .build_records_index(dir.path().join("absent.jsonl"), dir.path().join("out.db"))
        .await;
    assert!(matches!(
        result,
        Err(medirec::DomainError::NotFound(_))
    ));
}
