//! Messages-API completion transport.

mod client;
mod error;
mod types;

pub use client::{AnthropicClient, CompletionConfig};
pub use error::ApiError;
pub use types::{Usage, WireBlock, WireContent, WireMessage, WireRequest, WireResponse, WireTool};
