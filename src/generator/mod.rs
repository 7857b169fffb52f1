mod gemini;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
pub use gemini::GeminiGenerator;

use crate::config::ModelConfig;
use crate::error::ChatError;
use crate::protocol::Conversation;

/// Produces the next model turn for a conversation. The returned text is
/// passed back to callers as-is.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, conversation: &Conversation) -> Result<String>;
}

pub fn build_generator(config: ModelConfig) -> Result<Arc<dyn Generator>> {
    let generator = GeminiGenerator::new(config)
        .map_err(|error| ChatError::Configuration(format!("{error:#}")))?;
    Ok(Arc::new(generator))
}
