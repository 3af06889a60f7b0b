//! The business tool seam.

use async_trait::async_trait;
use serde_json::{Map, Value};

use concierge_core::{FunctionResult, Result, ToolDefinition, ToolName};

use crate::context::ToolContext;
use crate::validation::{json_schema, FieldSpec};

/// A named business function the orchestrators can dispatch to.
///
/// `execute` receives arguments that already passed validation against
/// `specs()`. Business outcomes (missing data, fully booked, awaiting input)
/// are `Ok` results; `Err` is reserved for failures of external services.
#[async_trait]
pub trait BusinessTool: Send + Sync {
    fn name(&self) -> ToolName;

    fn description(&self) -> &'static str;

    /// Parameter list shared by validation and the exposed schema.
    fn specs(&self) -> Vec<FieldSpec>;

    async fn execute(&self, ctx: &ToolContext, args: Map<String, Value>) -> Result<FunctionResult>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().as_str().to_string(),
            description: self.description().to_string(),
            parameters: json_schema(&self.specs()),
        }
    }
}
