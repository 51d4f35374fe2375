//! Retrieval tools exposed to the model, and the registry that resolves
//! tool-use requests against them.
//!
//! Every tool shapes its result the same way: the retrieved chunks' contents
//! concatenated with a blank-line separator in ranked order, because the
//! consuming model wants natural-language context rather than structured
//! fields.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::record::{ID_FIELD_PREFIX, ID_RANGE, ID_WIDTH};
use crate::domain::models::{ParameterType, SearchHit, ToolDescriptor, ToolParameter};
use crate::domain::ports::RetrievalTool;
use crate::infrastructure::index::VectorIndex;

/// Upper bound on requested result counts for profile-style lookups.
pub const MAX_RESULTS: usize = 5;

/// Fixed sentinel returned when identifier verification fails.
pub const NOT_FOUND_SENTINEL: &str = "no prior checkup records found for this patient id";

/// Separator between result blocks in a merged tool response.
pub const RESULT_SEPARATOR: &str = "\n\n";

/// Merge ranked hits into one flattened text blob.
fn merge_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(RESULT_SEPARATOR)
}

/// Extract a required string argument.
fn require_str(args: &Value, name: &str) -> DomainResult<String> {
    args.get(name)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            DomainError::ToolResolution(format!("missing or non-string argument '{name}'"))
        })
}

/// Extract a required integer argument; numeric strings are tolerated
/// because models sometimes quote numbers.
fn require_integer(args: &Value, name: &str) -> DomainResult<i64> {
    let value = args
        .get(name)
        .ok_or_else(|| DomainError::ToolResolution(format!("missing argument '{name}'")))?;

    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.trim().parse::<i64>() {
            return Ok(n);
        }
    }

    Err(DomainError::ToolResolution(format!(
        "argument '{name}' must be an integer, got {value}"
    )))
}

/// Clamp a requested result count into `1..=MAX_RESULTS`.
fn clamp_count(requested: i64) -> usize {
    requested.clamp(1, MAX_RESULTS as i64) as usize
}

/// Exact-match lookup of a patient's prior checkup record.
///
/// Similarity search can return a near-but-wrong record when no exact record
/// exists, so the single nearest neighbor is only trusted after its
/// identifier substring (at the fixed offset of the canonical content
/// layout) equals the requested identifier. Verification failure returns the
/// fixed sentinel, never a low-confidence match.
pub struct LookupByIdTool {
    index: Arc<VectorIndex>,
    descriptor: ToolDescriptor,
}

impl LookupByIdTool {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            descriptor: ToolDescriptor::new(
                "lookup_by_id",
                "Look up a patient's prior checkup record by their six-digit patient id. \
                 Returns the record content, or a not-found message when no record with \
                 that exact id exists.",
                vec![ToolParameter::new(
                    "id",
                    ParameterType::String,
                    true,
                    "Six-digit patient id",
                )],
            ),
        }
    }
}

#[async_trait]
impl RetrievalTool for LookupByIdTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: Value) -> DomainResult<String> {
        let id = require_str(&args, "id")?;
        if id.len() != ID_WIDTH || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::ToolResolution(format!(
                "'id' must be exactly {ID_WIDTH} digits, got '{id}'"
            )));
        }

        let probe = format!("{ID_FIELD_PREFIX}{id}");
        let hits = self.index.query(&probe, 1, false).await?;

        match hits.first() {
            Some(hit) if hit.chunk.content.get(ID_RANGE) == Some(id.as_str()) => {
                Ok(hit.chunk.content.clone())
            }
            _ => Ok(NOT_FOUND_SENTINEL.to_string()),
        }
    }
}

/// Approximate lookup of checkup records similar to a free-text profile.
pub struct LookupByProfileTool {
    index: Arc<VectorIndex>,
    descriptor: ToolDescriptor,
}

impl LookupByProfileTool {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            descriptor: ToolDescriptor::new(
                "lookup_by_profile",
                "Find checkup records of patients similar to the given profile. The profile \
                 should describe gender, age, height, weight, medical history and symptoms.",
                vec![
                    ToolParameter::new(
                        "count",
                        ParameterType::Integer,
                        true,
                        "Number of similar records to return, at most 5",
                    ),
                    ToolParameter::new(
                        "profile",
                        ParameterType::String,
                        true,
                        "Free-text patient profile excluding the id",
                    ),
                ],
            ),
        }
    }
}

#[async_trait]
impl RetrievalTool for LookupByProfileTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: Value) -> DomainResult<String> {
        let count = clamp_count(require_integer(&args, "count")?);
        let profile = require_str(&args, "profile")?;

        let hits = self.index.query(&profile, count, false).await?;
        Ok(merge_hits(&hits))
    }
}

/// Profile lookup restricted to the age axis.
pub struct RecommendByAgeTool {
    index: Arc<VectorIndex>,
    descriptor: ToolDescriptor,
}

impl RecommendByAgeTool {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            descriptor: ToolDescriptor::new(
                "recommend_by_age",
                "Find checkup records of patients in the same age bracket.",
                vec![
                    ToolParameter::new(
                        "count",
                        ParameterType::Integer,
                        true,
                        "Number of records to return, at most 5",
                    ),
                    ToolParameter::new("age", ParameterType::Integer, true, "Patient age in years"),
                ],
            ),
        }
    }
}

#[async_trait]
impl RetrievalTool for RecommendByAgeTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: Value) -> DomainResult<String> {
        let count = clamp_count(require_integer(&args, "count")?);
        let age = require_integer(&args, "age")?;
        if !(0..=130).contains(&age) {
            return Err(DomainError::ToolResolution(format!(
                "'age' must be a plausible age in years, got {age}"
            )));
        }

        let probe = format!("age:{age}");
        let hits = self.index.query(&probe, count, false).await?;
        Ok(merge_hits(&hits))
    }
}

/// Profile lookup restricted to the gender axis.
pub struct RecommendByGenderTool {
    index: Arc<VectorIndex>,
    descriptor: ToolDescriptor,
}

impl RecommendByGenderTool {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            descriptor: ToolDescriptor::new(
                "recommend_by_gender",
                "Find checkup records of patients of the same gender.",
                vec![
                    ToolParameter::new(
                        "count",
                        ParameterType::Integer,
                        true,
                        "Number of records to return, at most 5",
                    ),
                    ToolParameter::new("gender", ParameterType::String, true, "Patient gender"),
                ],
            ),
        }
    }
}

#[async_trait]
impl RetrievalTool for RecommendByGenderTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: Value) -> DomainResult<String> {
        let count = clamp_count(require_integer(&args, "count")?);
        let gender = require_str(&args, "gender")?;

        let probe = format!("gender:{gender}");
        let hits = self.index.query(&probe, count, false).await?;
        Ok(merge_hits(&hits))
    }
}

/// Disease-information search over the knowledge index.
///
/// Knowledge pages are prose rather than canonical records, so retrieval
/// runs with rerank: the oversampled candidates are re-ordered by lexical
/// overlap with the query before truncation.
pub struct SearchKnowledgeTool {
    index: Arc<VectorIndex>,
    descriptor: ToolDescriptor,
}

impl SearchKnowledgeTool {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            descriptor: ToolDescriptor::new(
                "search_knowledge",
                "Search the disease knowledge base for information related to a medical \
                 history or symptoms.",
                vec![
                    ToolParameter::new(
                        "count",
                        ParameterType::Integer,
                        true,
                        "Number of passages to return, at most 5",
                    ),
                    ToolParameter::new(
                        "query",
                        ParameterType::String,
                        true,
                        "Medical history or symptoms to search for",
                    ),
                ],
            ),
        }
    }
}

#[async_trait]
impl RetrievalTool for SearchKnowledgeTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: Value) -> DomainResult<String> {
        let count = clamp_count(require_integer(&args, "count")?);
        let query = require_str(&args, "query")?;

        let hits = self.index.query(&query, count, true).await?;
        Ok(merge_hits(&hits))
    }
}

/// Closed set of tools resolved by name.
///
/// Built once at agent construction; unregistered names are rejected
/// explicitly rather than reflected into arbitrary callables.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn RetrievalTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full tool set over the two production indexes.
    pub fn standard(records: Arc<VectorIndex>, knowledge: Arc<VectorIndex>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LookupByIdTool::new(Arc::clone(&records))));
        registry.register(Arc::new(LookupByProfileTool::new(Arc::clone(&records))));
        registry.register(Arc::new(RecommendByAgeTool::new(Arc::clone(&records))));
        registry.register(Arc::new(RecommendByGenderTool::new(records)));
        registry.register(Arc::new(SearchKnowledgeTool::new(knowledge)));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn RetrievalTool>) {
        self.tools.push(tool);
    }

    /// Resolve a model-supplied tool name.
    pub fn resolve(&self, name: &str) -> DomainResult<Arc<dyn RetrievalTool>> {
        self.tools
            .iter()
            .find(|tool| tool.descriptor().name == name)
            .cloned()
            .ok_or_else(|| DomainError::ToolResolution(format!("unknown tool '{name}'")))
    }

    /// Descriptors in registration order, for the completion request.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|tool| tool.descriptor().clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}
