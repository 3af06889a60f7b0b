use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

use concierge_core::{FunctionResult, Result, ToolName};

use super::arg_str;
use crate::context::ToolContext;
use crate::tool::BusinessTool;
use crate::validation::{FieldKind, FieldSpec};

const TOPICS: &[&str] = &["hours", "services", "products", "general"];

/// Opening hours and a summary of the catalogue.
pub struct GetStoreInfoTool;

fn catalogue_summary<'a>(names: impl Iterator<Item = (&'a str, &'a str)>) -> Value {
    let mut count = 0;
    let mut categories = BTreeSet::new();
    let mut sample = Vec::new();
    for (name, category) in names {
        count += 1;
        if !category.is_empty() {
            categories.insert(category.to_string());
        }
        if sample.len() < 10 {
            sample.push(name.to_string());
        }
    }
    json!({"count": count, "categories": categories, "names": sample})
}

#[async_trait]
impl BusinessTool for GetStoreInfoTool {
    fn name(&self) -> ToolName {
        ToolName::GetStoreInfo
    }

    fn description(&self) -> &'static str {
        "Get the store's opening hours and an overview of its services and products."
    }

    fn specs(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::optional(
            "topic",
            FieldKind::Enum(TOPICS),
            "What the customer asked about; defaults to general",
        )]
    }

    async fn execute(&self, ctx: &ToolContext, args: Map<String, Value>) -> Result<FunctionResult> {
        let topic = arg_str(&args, "topic").unwrap_or("general");
        let mut data = Map::new();
        data.insert("topic".into(), json!(topic));

        if matches!(topic, "hours" | "general") {
            if let Some(hours) = ctx.hours().await {
                data.insert("hours".into(), serde_json::to_value(hours)?);
            }
        }
        if matches!(topic, "services" | "general") {
            if let Some(services) = ctx.services().await {
                let summary = catalogue_summary(services.iter().map(|s| (s.name.as_str(), s.category.as_str())));
                data.insert("services".into(), summary);
            }
        }
        if matches!(topic, "products" | "general") {
            if let Some(products) = ctx.products().await {
                let summary = catalogue_summary(products.iter().map(|p| (p.name.as_str(), p.category.as_str())));
                data.insert("products".into(), summary);
            }
        }

        if data.len() == 1 {
            let what = match topic {
                "hours" => "opening hours",
                "services" => "list of services",
                "products" => "product list",
                _ => "store information",
            };
            return Ok(FunctionResult::unavailable(format!(
                "I couldn't find the store's {} right now.",
                what
            )));
        }
        Ok(FunctionResult::ok(Value::Object(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context_with_tabs;
    use concierge_core::mocks::MockTabSource;
    use concierge_core::ERR_RESOURCE_UNAVAILABLE;

    #[tokio::test]
    async fn test_general_summary() {
        let tabs = MockTabSource::new()
            .with_tab("Opening Hours", &[], vec![json!({"Day": "Monday", "Open": "09:00", "Close": "17:00"})])
            .with_tab(
                "Services",
                &[],
                vec![
                    json!({"Name": "Pottery Basics", "Category": "Pottery"}),
                    json!({"Name": "Wheel Throwing", "Category": "Pottery"}),
                ],
            );
        let ctx = context_with_tabs(tabs);

        let result = GetStoreInfoTool.execute(&ctx, Map::new()).await.unwrap();
        let data = result.data.unwrap();
        assert_eq!(data["hours"][0]["day"], "Monday");
        assert_eq!(data["services"]["count"], 2);
        assert_eq!(data["services"]["categories"], json!(["Pottery"]));
        assert!(data.get("products").is_none());
    }

    #[tokio::test]
    async fn test_missing_hours_is_unavailable() {
        let ctx = context_with_tabs(MockTabSource::new());
        let mut args = Map::new();
        args.insert("topic".into(), json!("hours"));

        let result = GetStoreInfoTool.execute(&ctx, args).await.unwrap();
        assert!(result.has_error(ERR_RESOURCE_UNAVAILABLE));
        assert_eq!(result.message.as_deref(), Some("I couldn't find the store's opening hours right now."));
    }
}
