//! Domain models for the recommender.

pub mod chunking;
pub mod embedding;
pub mod message;
pub mod record;
pub mod tool;

pub use chunking::{Chunk, ChunkerConfig};
pub use embedding::{EmbeddingModel, SearchHit};
pub use message::{Conversation, Message, MessageContent, Role};
pub use record::{Record, UserProfile};
pub use tool::{ParameterType, ToolDescriptor, ToolParameter};
