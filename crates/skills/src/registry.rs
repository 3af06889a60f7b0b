//! Tool registry and dispatch.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use concierge_core::{
    Error, FunctionResult, Result, ToolCallTrace, ToolDefinition, ToolName, ERR_EXTERNAL_SERVICE, ERR_UNKNOWN_TOOL,
};

use crate::builtin;
use crate::context::ToolContext;
use crate::tool::BusinessTool;
use crate::validation::validate;

/// Registered business tools, keyed by name.
pub struct ToolRegistry {
    tools: DashMap<ToolName, Arc<dyn BusinessTool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { tools: DashMap::new() }
    }

    /// Create a registry holding every built-in business tool.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        for tool in builtin::all() {
            // Built-in names are distinct, so registration cannot collide.
            let name = tool.name();
            registry.tools.insert(name, tool);
        }
        registry
    }

    /// Register a tool. Names must be unique.
    pub fn register(&self, tool: Arc<dyn BusinessTool>) -> Result<()> {
        let name = tool.name();
        if self.tools.contains_key(&name) {
            return Err(Error::Internal(format!("Tool '{}' is already registered", name)));
        }
        tracing::info!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &ToolName) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool definitions in stable order (known tools first, in prompt order).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut tools: Vec<Arc<dyn BusinessTool>> = self.tools.iter().map(|e| e.value().clone()).collect();
        tools.sort_by_key(|t| {
            let name = t.name();
            (
                ToolName::KNOWN.iter().position(|k| *k == name).unwrap_or(usize::MAX),
                name.as_str().to_string(),
            )
        });
        tools.iter().map(|t| t.definition()).collect()
    }

    /// Validate and run one tool.
    ///
    /// Never fails: unknown tools, invalid arguments and handler errors all
    /// come back as unsuccessful results, with a trace entry either way.
    pub async fn dispatch(&self, name: &ToolName, args: &Value, ctx: &ToolContext) -> (FunctionResult, ToolCallTrace) {
        let started = Instant::now();
        let result = self.run(name, args, ctx).await.normalize();
        let elapsed = started.elapsed();

        concierge_governance::track_tool_call(name.as_str(), result.success, elapsed.as_secs_f64());
        tracing::info!(
            tool = %name,
            store_id = %ctx.store_id,
            success = result.success,
            duration_ms = elapsed.as_millis() as u64,
            "Tool executed"
        );

        let trace = ToolCallTrace {
            tool: name.as_str().to_string(),
            arguments: args.clone(),
            duration_ms: elapsed.as_millis() as u64,
            success: result.success,
            error: result.error.clone(),
        };
        (result, trace)
    }

    async fn run(&self, name: &ToolName, args: &Value, ctx: &ToolContext) -> FunctionResult {
        let tool = match self.tools.get(name) {
            Some(entry) => entry.value().clone(),
            None => {
                tracing::warn!(tool = %name, "Dispatch to unknown tool");
                return FunctionResult::failure(ERR_UNKNOWN_TOOL, format!("I don't know how to do '{}'.", name));
            }
        };

        let validated = match validate(&tool.specs(), args) {
            Ok(validated) => validated,
            Err(errors) => {
                tracing::debug!(tool = %name, errors = ?errors, "Tool arguments rejected");
                return FunctionResult::invalid(errors);
            }
        };

        match tool.execute(ctx, validated).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool failed");
                FunctionResult::failure(
                    ERR_EXTERNAL_SERVICE,
                    "Something went wrong while contacting an external service. Please try again shortly.",
                )
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
