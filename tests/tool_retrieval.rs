//! Retrieval tool contracts over a real (hashed-embedder) index.

mod common;

use std::sync::Arc;

use serde_json::json;

use medirec::domain::errors::DomainError;
use medirec::domain::models::Record;
use medirec::domain::ports::RetrievalTool;
use medirec::services::tools::{
    LookupByIdTool, LookupByProfileTool, RecommendByAgeTool, RecommendByGenderTool,
    SearchKnowledgeTool, ToolRegistry, NOT_FOUND_SENTINEL, RESULT_SEPARATOR,
};
use medirec::{HashedEmbedder, VectorIndex};

use common::populated_index;

#[tokio::test]
async fn lookup_by_id_returns_exact_record() {
    let dir = tempfile::tempdir().unwrap();

    // A single-record index: the nearest neighbor for the probe is the
    // record itself, and verification must accept it.
    let embedder = Arc::new(HashedEmbedder::new());
    let index = VectorIndex::create(dir.path().join("one.db"), embedder)
        .await
        .unwrap();
    index
        .add(&[medirec::Chunk::new(
            "426815",
            "patient_id:426815,gender:male,age:50,medical_history:hypertension",
            0,
        )])
        .await
        .unwrap();

    let tool = LookupByIdTool::new(Arc::new(index));
    let result = tool.run(json!({"id": "426815"})).await.unwrap();

    assert!(result.starts_with("patient_id:426815"));
    assert!(result.contains("hypertension"));
}

#[tokio::test]
async fn lookup_by_id_unknown_id_returns_sentinel_never_a_wrong_record() {
    let dir = tempfile::tempdir().unwrap();
    let index = populated_index(&dir.path().join("records.db")).await;

    // Similarity search always returns *some* nearest neighbor; the
    // verification step is what keeps it from being trusted.
    let tool = LookupByIdTool::new(Arc::new(index));
    let result = tool.run(json!({"id": "999999"})).await.unwrap();

    assert_eq!(result, NOT_FOUND_SENTINEL);
}

#[tokio::test]
async fn lookup_by_id_rejects_malformed_ids() {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(populated_index(&dir.path().join("records.db")).await);

    for bad in ["12345", "1234567", "42a815", ""] {
        let tool = LookupByIdTool::new(Arc::clone(&index));
        let result = tool.run(json!({"id": bad})).await;
        assert!(
            matches!(result, Err(DomainError::ToolResolution(_))),
            "id '{bad}' should be rejected"
        );
    }

    let tool = LookupByIdTool::new(index);
    let result = tool.run(json!({})).await;
    assert!(matches!(result, Err(DomainError::ToolResolution(_))));
}

#[tokio::test]
async fn lookup_by_profile_returns_at_most_n_nonempty_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let index = populated_index(&dir.path().join("records.db")).await;

    let tool = LookupByProfileTool::new(Arc::new(index));
    let result = tool
        .run(json!({
            "count": 3,
            "profile": "gender:male,age:50,medical_history:hypertension,symptoms:dizziness"
        }))
        .await
        .unwrap();

    let blocks: Vec<&str> = result.split(RESULT_SEPARATOR).collect();
    assert!(blocks.len() <= 3);
    assert!(!blocks.is_empty());
    for block in blocks {
        assert!(!block.trim().is_empty());
        assert!(block.starts_with("patient_id:"));
    }
}

#[tokio::test]
async fn profile_count_is_clamped_to_five() {
    let dir = tempfile::tempdir().unwrap();

    let embedder = Arc::new(HashedEmbedder::new());
    let index = VectorIndex::create(dir.path().join("many.db"), embedder)
        .await
        .unwrap();
    let chunks: Vec<medirec::Chunk> = (0..8)
        .map(|i| {
            medirec::Chunk::new(
                format!("10000{i}"),
                format!("patient_id:10000{i},gender:male,age:{},height:170cm", 40 + i),
                i,
            )
        })
        .collect();
    index.add(&chunks).await.unwrap();

    let tool = LookupByProfileTool::new(Arc::new(index));
    let result = tool
        .run(json!({"count": 50, "profile": "gender:male"}))
        .await
        .unwrap();

    assert_eq!(result.split(RESULT_SEPARATOR).count(), 5);
}

#[tokio::test]
async fn demographic_variants_share_the_profile_contract() {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(populated_index(&dir.path().join("records.db")).await);

    let by_age = RecommendByAgeTool::new(Arc::clone(&index));
    let result = by_age.run(json!({"count": 2, "age": 50})).await.unwrap();
    assert!(result.split(RESULT_SEPARATOR).count() <= 2);
    assert!(result.contains("patient_id:"));

    let bad_age = by_age.run(json!({"count": 2, "age": 500})).await;
    assert!(matches!(bad_age, Err(DomainError::ToolResolution(_))));

    let by_gender = RecommendByGenderTool::new(index);
    let result = by_gender
        .run(json!({"count": 2, "gender": "female"}))
        .await
        .unwrap();
    assert!(result.split(RESULT_SEPARATOR).count() <= 2);
}

#[tokio::test]
async fn search_knowledge_reranks_toward_lexical_matches() {
    let dir = tempfile::tempdir().unwrap();

    let embedder = Arc::new(HashedEmbedder::new());
    let index = VectorIndex::create(dir.path().join("knowledge.db"), embedder)
        .await
        .unwrap();
    index
        .add(&[
            medirec::Chunk::new(
                "guide:page:0",
                "Hypertension increases cardiovascular risk; blood pressure monitoring \
                 and lipid panels are advised.",
                0,
            ),
            medirec::Chunk::new(
                "guide:page:1",
                "Gout stems from elevated uric acid; kidney function panels are advised.",
                1,
            ),
            medirec::Chunk::new(
                "guide:page:2",
                "Type 2 diabetes screening relies on fasting glucose and HbA1c.",
                2,
            ),
        ])
        .await
        .unwrap();

    let tool = SearchKnowledgeTool::new(Arc::new(index));
    let result = tool
        .run(json!({"count": 1, "query": "gout uric acid"}))
        .await
        .unwrap();

    assert!(result.contains("Gout"));
}

#[tokio::test]
async fn registry_resolves_known_and_rejects_unknown_names() {
    let dir = tempfile::tempdir().unwrap();
    let records = Arc::new(populated_index(&dir.path().join("records.db")).await);
    let knowledge = Arc::new(populated_index(&dir.path().join("knowledge.db")).await);

    let registry = ToolRegistry::standard(records, knowledge);
    assert_eq!(registry.len(), 5);

    assert!(registry.resolve("lookup_by_id").is_ok());
    assert!(registry.resolve("search_knowledge").is_ok());
    assert!(matches!(
        registry.resolve("drop_all_tables"),
        Err(DomainError::ToolResolution(_))
    ));

    let names: Vec<String> = registry
        .descriptors()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "lookup_by_id",
            "lookup_by_profile",
            "recommend_by_age",
            "recommend_by_gender",
            "search_knowledge"
        ]
    );
}
