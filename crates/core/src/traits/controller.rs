//! Orchestrator trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Architecture, ConversationRequest, ConversationResponse};

/// Turns one conversation request into a reply.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Handle a single request end to end.
    async fn handle(&self, request: ConversationRequest) -> Result<ConversationResponse>;

    /// Which architecture this orchestrator implements.
    fn architecture(&self) -> Architecture;
}
