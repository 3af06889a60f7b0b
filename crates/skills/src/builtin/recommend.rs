use async_trait::async_trait;
use serde_json::{json, Map, Value};

use concierge_core::{ComponentSpec, FormField, FunctionResult, Result, ToolName};

use super::{arg_f64, arg_str, scored_services, service_card};
use crate::context::ToolContext;
use crate::tool::BusinessTool;
use crate::validation::{FieldKind, FieldSpec};

const LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];
const TOP_N: usize = 3;

/// Personalised service suggestions.
pub struct RecommendServicesTool;

fn intake_form() -> ComponentSpec {
    ComponentSpec::IntakeForm {
        title: "Help us find the right fit".into(),
        questions: vec![
            FormField::new("goal", "What would you like to achieve?", "text").required(),
            FormField::new("experience_level", "How experienced are you?", "select").with_options(LEVELS),
            FormField::new("budget", "Budget per session", "number"),
            FormField::new("preferences", "Anything else we should know?", "textarea"),
        ],
    }
}

#[async_trait]
impl BusinessTool for RecommendServicesTool {
    fn name(&self) -> ToolName {
        ToolName::RecommendServices
    }

    fn description(&self) -> &'static str {
        "Recommend services that fit the customer's goal, experience level and budget."
    }

    fn specs(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::optional("goal", FieldKind::String, "What the customer wants to achieve"),
            FieldSpec::optional("experience_level", FieldKind::Enum(LEVELS), "Customer's experience level"),
            FieldSpec::optional("budget", FieldKind::Number, "Maximum price per session"),
            FieldSpec::optional("preferences", FieldKind::String, "Other preferences (schedule, style, ...)"),
        ]
    }

    async fn execute(&self, ctx: &ToolContext, args: Map<String, Value>) -> Result<FunctionResult> {
        let goal = arg_str(&args, "goal");
        let preferences = arg_str(&args, "preferences");
        if goal.is_none() && preferences.is_none() {
            return Ok(FunctionResult::awaiting(
                "To point you to the right option, what would you like to achieve, and how much experience do you have?",
                intake_form(),
            )
            .clarifying());
        }

        let Some(mut services) = ctx.services().await else {
            return Ok(FunctionResult::unavailable("I couldn't load the list of services right now."));
        };

        let budget = arg_f64(&args, "budget");
        if let Some(max) = budget {
            services.retain(|s| s.price.is_some_and(|price| price <= max));
        }

        let level = arg_str(&args, "experience_level");
        let query: Vec<&str> = [level, goal, preferences].into_iter().flatten().collect();
        let query = query.join(" ");

        let mut ranked = ctx.matcher.rank(&query, services, &ctx.usage).await;
        ranked.truncate(TOP_N);

        let mut result = FunctionResult::ok(json!({
            "criteria": {
                "goal": goal,
                "experience_level": level,
                "budget": budget,
                "preferences": preferences,
            },
            "recommendations": scored_services(&ranked),
        }));
        if ranked.is_empty() {
            result = result.with_message("Nothing on the schedule fits those criteria right now.");
        } else {
            result = result.with_component(ComponentSpec::ServiceCards {
                items: ranked.iter().map(|m| service_card(&m.item)).collect(),
            });
        }
        Ok(result)
    }
}
