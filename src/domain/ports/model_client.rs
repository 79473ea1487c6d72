//! Model Client Port
//!
//! Abstraction over the text-completion service that writes candidate tests.

use async_trait::async_trait;

use crate::domain::errors::PipelineResult;
use crate::domain::models::{GenerationRequest, GenerationResponse};

/// Text-completion service used by the test generator.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Identifier of the model requests are sent to.
    fn model_name(&self) -> &str;

    /// Send one generation request.
    ///
    /// # Errors
    /// * `PipelineError::ServiceAuth` when no credential is configured or it is rejected
    /// * `PipelineError::ServiceCall` on transport failure, timeout, or non-success status
    async fn complete(&self, request: &GenerationRequest) -> PipelineResult<GenerationResponse>;
}
