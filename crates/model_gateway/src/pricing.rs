//! Static model pricing for cost accounting.
//!
//! Prices are per million tokens. Unknown model ids fall back to the
//! default model's price so every call is costed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use concierge_core::config::PricingConfig;

/// Pricing information for a model (per 1M tokens).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelPricing {
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model_id: String,
    /// Cost per 1M input tokens in USD.
    pub input_per_m: f64,
    /// Cost per 1M output tokens in USD.
    pub output_per_m: f64,
}

impl ModelPricing {
    /// Create new pricing info.
    pub fn new(model_id: impl Into<String>, input: f64, output: f64) -> Self {
        Self {
            model_id: model_id.into(),
            input_per_m: input,
            output_per_m: output,
        }
    }

    /// Estimate cost for a call.
    pub fn estimate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        let input_cost = (input_tokens as f64 / 1_000_000.0) * self.input_per_m;
        let output_cost = (output_tokens as f64 / 1_000_000.0) * self.output_per_m;
        input_cost + output_cost
    }
}

/// Model id to pricing, with a default fallback.
#[derive(Debug, Clone)]
pub struct PricingTable {
    models: HashMap<String, ModelPricing>,
    default_model: String,
}

impl PricingTable {
    /// Create an empty table.
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            models: HashMap::new(),
            default_model: default_model.into(),
        }
    }

    /// Create with built-in prices for common models.
    pub fn with_defaults(default_model: impl Into<String>) -> Self {
        let mut table = Self::new(default_model);

        // OpenAI
        table.register(ModelPricing::new("gpt-4o-mini", 0.15, 0.60));
        table.register(ModelPricing::new("gpt-4o", 2.50, 10.00));
        table.register(ModelPricing::new("gpt-4.1", 2.00, 8.00));
        table.register(ModelPricing::new("gpt-4.1-mini", 0.40, 1.60));
        table.register(ModelPricing::new("gpt-4.1-nano", 0.10, 0.40));
        table.register(ModelPricing::new("o4-mini", 1.10, 4.40));

        // Anthropic
        table.register(ModelPricing::new("claude-3-5-haiku", 0.80, 4.00));
        table.register(ModelPricing::new("claude-3-5-sonnet", 3.00, 15.00));

        // Google
        table.register(ModelPricing::new("gemini-2.0-flash", 0.10, 0.40));

        table
    }

    /// Build from configuration, applying overrides over the built-ins.
    pub fn from_config(config: &PricingConfig, completion_default: &str) -> Self {
        let default_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| completion_default.to_string());
        let mut table = Self::with_defaults(default_model);
        for (model, price) in &config.overrides {
            table.register(ModelPricing::new(model.clone(), price.input_per_m, price.output_per_m));
        }
        table
    }

    /// Register a model's pricing.
    pub fn register(&mut self, pricing: ModelPricing) {
        self.models.insert(pricing.model_id.clone(), pricing);
    }

    /// Pricing for a model, if listed.
    ///
    /// Provider prefixes ("openai/gpt-4o") and dated suffixes
    /// ("gpt-4o-2024-08-06") resolve to the base id.
    pub fn get(&self, model_id: &str) -> Option<&ModelPricing> {
        if let Some(p) = self.models.get(model_id) {
            return Some(p);
        }
        let bare = model_id.rsplit('/').next().unwrap_or(model_id);
        if let Some(p) = self.models.get(bare) {
            return Some(p);
        }
        self.models
            .values()
            .filter(|p| bare.starts_with(&format!("{}-", p.model_id)))
            .max_by_key(|p| p.model_id.len())
    }

    /// Pricing for a model, falling back to the default model.
    pub fn resolve(&self, model_id: &str) -> Option<&ModelPricing> {
        self.get(model_id).or_else(|| self.get(&self.default_model))
    }

    /// Cost of one call in USD. Zero when neither the model nor the default
    /// model is priced.
    pub fn cost(&self, model_id: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        self.resolve(model_id)
            .map(|p| p.estimate_cost(input_tokens, output_tokens))
            .unwrap_or(0.0)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults("gpt-4o-mini")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::config::ModelPriceConfig;

    #[test]
    fn test_model_pricing() {
        let pricing = ModelPricing::new("test", 1.0, 2.0);
        // 1M input + 500K output = $1 + $1
        let cost = pricing.estimate_cost(1_000_000, 500_000);
        assert!((cost - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_uses_default_pricing() {
        let table = PricingTable::with_defaults("gpt-4o-mini");
        let known = table.cost("gpt-4o-mini", 1000, 1000);
        let unknown = table.cost("some-new-model", 1000, 1000);
        assert!(known > 0.0);
        assert!((known - unknown).abs() < 1e-12);
    }

    #[test]
    fn test_prefixed_and_dated_ids() {
        let table = PricingTable::default();
        assert_eq!(table.get("openai/gpt-4o").unwrap().model_id, "gpt-4o");
        assert_eq!(table.get("gpt-4o-mini-2024-07-18").unwrap().model_id, "gpt-4o-mini");
        assert_eq!(table.get("gpt-4o-2024-08-06").unwrap().model_id, "gpt-4o");
    }

    #[test]
    fn test_config_overrides() {
        let mut config = PricingConfig::default();
        config.overrides.insert(
            "house-model".into(),
            ModelPriceConfig {
                input_per_m: 1.0,
                output_per_m: 1.0,
            },
        );
        config.default_model = Some("house-model".into());
        let table = PricingTable::from_config(&config, "gpt-4o-mini");
        assert!((table.cost("mystery", 1_000_000, 0) - 1.0).abs() < 1e-9);
    }
}
