use async_trait::async_trait;
use serde_json::{json, Map, Value};

use concierge_core::{ComponentSpec, FunctionResult, Result, ToolName};

use super::{arg_f64, arg_str, scored_services, service_card};
use crate::context::ToolContext;
use crate::tool::BusinessTool;
use crate::validation::{FieldKind, FieldSpec};

/// Ranked search over the store's services.
pub struct SearchServicesTool;

#[async_trait]
impl BusinessTool for SearchServicesTool {
    fn name(&self) -> ToolName {
        ToolName::SearchServices
    }

    fn description(&self) -> &'static str {
        "Search the store's services, classes or treatments by what the customer is looking for."
    }

    fn specs(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("query", FieldKind::String, "What the customer is looking for, in a few words"),
            FieldSpec::optional("category", FieldKind::String, "Restrict results to this category"),
        ]
    }

    async fn execute(&self, ctx: &ToolContext, args: Map<String, Value>) -> Result<FunctionResult> {
        let query = arg_str(&args, "query").unwrap_or_default();
        let Some(mut services) = ctx.services().await else {
            return Ok(FunctionResult::unavailable("I couldn't load the list of services right now."));
        };

        if let Some(category) = arg_str(&args, "category") {
            let wanted = category.to_lowercase();
            services.retain(|s| {
                let have = s.category.to_lowercase();
                !have.is_empty() && (have == wanted || have.contains(&wanted) || wanted.contains(&have))
            });
        }

        let ranked = ctx.matcher.rank(query, services, &ctx.usage).await;
        let mut result = FunctionResult::ok(json!({
            "query": query,
            "category": arg_str(&args, "category"),
            "total": ranked.len(),
            "results": scored_services(&ranked),
        }));
        if ranked.is_empty() {
            result = result.with_message(format!("No services matched \"{}\".", query));
        } else {
            result = result.with_component(ComponentSpec::ServiceCards {
                items: ranked.iter().map(|m| service_card(&m.item)).collect(),
            });
        }
        Ok(result)
    }
}

/// Ranked search over the store's products.
pub struct SearchProductsTool;

#[async_trait]
impl BusinessTool for SearchProductsTool {
    fn name(&self) -> ToolName {
        ToolName::SearchProducts
    }

    fn description(&self) -> &'static str {
        "Search the store's products, optionally under a maximum price."
    }

    fn specs(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("query", FieldKind::String, "What the customer wants to buy"),
            FieldSpec::optional("max_price", FieldKind::Number, "Highest acceptable price"),
        ]
    }

    async fn execute(&self, ctx: &ToolContext, args: Map<String, Value>) -> Result<FunctionResult> {
        let query = arg_str(&args, "query").unwrap_or_default();
        let Some(mut products) = ctx.products().await else {
            return Ok(FunctionResult::unavailable("I couldn't load the product list right now."));
        };

        let max_price = arg_f64(&args, "max_price");
        if let Some(max) = max_price {
            // Products without a listed price cannot be shown to fit a budget.
            products.retain(|p| p.price.is_some_and(|price| price <= max));
        }

        let ranked = ctx.matcher.rank(query, products, &ctx.usage).await;
        let results: Vec<Value> = ranked
            .iter()
            .map(|m| {
                let p = &m.item;
                json!({
                    "id": p.id,
                    "name": p.name,
                    "description": p.description,
                    "category": p.category,
                    "tags": p.tags,
                    "price": p.price,
                    "in_stock": p.in_stock,
                    "image_url": p.image_url,
                    "score": (m.score * 10.0).round() / 10.0,
                })
            })
            .collect();

        let mut result = FunctionResult::ok(json!({
            "query": query,
            "max_price": max_price,
            "total": results.len(),
            "results": results,
        }));
        if ranked.is_empty() {
            result = result.with_message(format!("No products matched \"{}\".", query));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_with_tabs, studio_tabs};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_beginner_pottery_ranks_basics_first() {
        let ctx = context_with_tabs(studio_tabs());
        let result = SearchServicesTool
            .execute(&ctx, args(json!({"query": "beginner pottery"})))
            .await
            .unwrap();

        let data = result.data.unwrap();
        assert_eq!(data["results"][0]["name"], "Pottery Basics");
        assert!(matches!(result.ui_components[0], ComponentSpec::ServiceCards { .. }));
    }

    #[tokio::test]
    async fn test_category_filter_applies_first() {
        let ctx = context_with_tabs(studio_tabs());
        let result = SearchServicesTool
            .execute(&ctx, args(json!({"query": "evening", "category": "painting"})))
            .await
            .unwrap();

        let data = result.data.unwrap();
        assert_eq!(data["total"], 1);
        assert_eq!(data["results"][0]["name"], "Watercolour Evening");
    }

    #[tokio::test]
    async fn test_price_filter_excludes_unpriced_and_expensive() {
        let ctx = context_with_tabs(studio_tabs());
        let result = SearchProductsTool
            .execute(&ctx, args(json!({"query": "clay", "max_price": 20.0})))
            .await
            .unwrap();

        let data = result.data.unwrap();
        let names: Vec<&str> = data["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Air-Dry Clay"]);
    }
}
