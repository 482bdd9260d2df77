use crate::errors::GenerationError;
use crate::model::LlmResponse;
use async_trait::async_trait;

pub mod fake;
pub mod openrouter;

/// Text generation boundary used by the grading policy.
///
/// Implementations make a single attempt per call; retry policy belongs to
/// the caller.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, GenerationError>;
    fn provider_name(&self) -> &'static str;
}
