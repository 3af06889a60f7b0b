//! Semantic matcher: ranks catalogue entries against a free-text query.
//!
//! The final score blends a model-derived relevance score with a
//! deterministic lexical score, so a ranking is still produced (and still
//! sensible) when the model is unavailable.

use serde_json::{json, Value};
use std::sync::Arc;

use concierge_core::{ChatMessage, CompletionRequest, LlmClient};

use crate::context::UsageMeter;
use crate::records::{ProductRecord, ServiceRecord};

/// Weight of the model score in the final blend.
pub const SEMANTIC_WEIGHT: f64 = 0.6;
/// Weight of the lexical score in the final blend.
pub const LEXICAL_WEIGHT: f64 = 0.4;
/// Semantic score used when the model cannot provide one.
pub const NEUTRAL_SEMANTIC: f64 = 50.0;
/// Maximum number of ranked results.
pub const MAX_RESULTS: usize = 10;

/// Something the matcher can rank.
pub trait Matchable {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> &str;
    fn tags(&self) -> &[String];
}

impl Matchable for ServiceRecord {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn category(&self) -> &str {
        &self.category
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Matchable for ProductRecord {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn category(&self) -> &str {
        &self.category
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// A candidate with its scores.
#[derive(Debug, Clone)]
pub struct ScoredMatch<T> {
    pub item: T,
    pub score: f64,
    pub semantic: f64,
    pub lexical: f64,
}

fn query_tokens(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 3)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Deterministic keyword score in `[0, 100]`.
pub fn lexical_score<T: Matchable + ?Sized>(query: &str, item: &T) -> f64 {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return 0.0;
    }
    let name = item.name().to_lowercase();
    let tokens = query_tokens(&query);
    let mut score = 0.0;

    if name == query {
        score += 40.0;
    } else if !name.is_empty() && (name.contains(&query) || query.contains(&name)) {
        score += 30.0;
    }

    let token_hits = tokens.iter().filter(|t| name.contains(t.as_str())).count();
    score += (token_hits as f64 * 10.0).min(30.0);

    let category = item.category().trim().to_lowercase();
    if !category.is_empty()
        && (query.contains(&category) || tokens.iter().any(|t| category.contains(t.as_str())))
    {
        score += 20.0;
    }

    for tag in item.tags() {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && (query.contains(&tag) || tokens.iter().any(|t| *t == tag)) {
            score += 15.0;
        }
    }

    if item.description().to_lowercase().contains(&query) {
        score += 10.0;
    }

    score.min(100.0)
}

/// Blend a semantic and a lexical score.
pub fn combine(semantic: f64, lexical: f64) -> f64 {
    (SEMANTIC_WEIGHT * semantic + LEXICAL_WEIGHT * lexical).clamp(0.0, 100.0)
}

/// Ranks candidates with one JSON-mode completion plus the lexical score.
pub struct SemanticMatcher {
    llm: Arc<dyn LlmClient>,
    model: Option<String>,
}

impl SemanticMatcher {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, model: None }
    }

    /// Use a specific model for scoring instead of the client default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Rank `candidates` against `query`, best first, at most
    /// [`MAX_RESULTS`]. Ties keep input order.
    pub async fn rank<T: Matchable>(&self, query: &str, candidates: Vec<T>, meter: &UsageMeter) -> Vec<ScoredMatch<T>> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let semantic = self.semantic_scores(query, &candidates, meter).await;

        let mut scored: Vec<ScoredMatch<T>> = candidates
            .into_iter()
            .zip(semantic)
            .map(|(item, semantic)| {
                let lexical = lexical_score(query, &item);
                ScoredMatch {
                    score: combine(semantic, lexical),
                    semantic,
                    lexical,
                    item,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(MAX_RESULTS);
        scored
    }

    async fn semantic_scores<T: Matchable>(&self, query: &str, candidates: &[T], meter: &UsageMeter) -> Vec<f64> {
        let neutral = vec![NEUTRAL_SEMANTIC; candidates.len()];
        let listing: Vec<Value> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                json!({
                    "index": i,
                    "name": c.name(),
                    "category": c.category(),
                    "description": truncate(c.description(), 160),
                })
            })
            .collect();

        let request = CompletionRequest::new(vec![
            ChatMessage::system(
                "You score how relevant catalogue entries are to a customer's request. \
                 Reply with a JSON object {\"scores\": {\"<index>\": <0-100>}} covering every index.",
            ),
            ChatMessage::user(format!(
                "Request: {}\nCandidates: {}",
                query,
                Value::Array(listing)
            )),
        ])
        .with_model(self.model.clone())
        .json()
        .with_temperature(0.0);

        let response = match self.llm.chat(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Semantic scoring failed, using neutral scores");
                return neutral;
            }
        };
        meter.record(&response.model, response.usage);

        match parse_scores(&response.content, candidates.len()) {
            Some(scores) => scores,
            None => {
                tracing::warn!(reply = %truncate(&response.content, 200), "Unparseable semantic scores");
                neutral
            }
        }
    }
}

/// Read `{"scores": {"0": 80, ...}}` (or the bare map). Missing indices get
/// the neutral score.
fn parse_scores(content: &str, count: usize) -> Option<Vec<f64>> {
    let value: Value = serde_json::from_str(strip_fences(content)).ok()?;
    let map = value.get("scores").unwrap_or(&value).as_object()?;
    Some(
        (0..count)
            .map(|i| {
                map.get(&i.to_string())
                    .and_then(crate::validation::parse_number)
                    .map(|s| s.clamp(0.0, 100.0))
                    .unwrap_or(NEUTRAL_SEMANTIC)
            })
            .collect(),
    )
}

/// Unwrap a reply wrapped in a Markdown code fence.
pub fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Truncate to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::mocks::MockLlm;

    fn service(name: &str, category: &str, tags: &[&str], description: &str) -> ServiceRecord {
        ServiceRecord {
            id: crate::records::slugify(name),
            name: name.into(),
            description: description.into(),
            category: category.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            price: None,
            duration_minutes: 60,
            capacity: 1,
            image_url: None,
            level: None,
        }
    }

    fn catalogue() -> Vec<ServiceRecord> {
        vec![
            service("Wheel Throwing", "Pottery", &["intermediate"], "Centre clay on the wheel"),
            service("Watercolour Evening", "Painting", &["relaxed"], "Loose washes and colour"),
            service("Pottery Basics", "Pottery", &["beginner", "clay"], "Hand-building for first timers"),
        ]
    }

    #[test]
    fn test_lexical_points() {
        let item = service("Pottery Basics", "Pottery", &["beginner", "clay"], "");
        // token "pottery" in name +10, category +20, tag "beginner" +15
        assert_eq!(lexical_score("beginner pottery", &item), 45.0);
        // exact name wins over substring
        assert_eq!(lexical_score("pottery basics", &item), 40.0 + 20.0 + 20.0);
        assert_eq!(lexical_score("", &item), 0.0);
    }

    #[test]
    fn test_lexical_is_capped() {
        let item = service(
            "yoga flow stretch",
            "yoga",
            &["yoga", "flow", "stretch"],
            "yoga flow stretch",
        );
        assert_eq!(lexical_score("yoga flow stretch", &item), 100.0);
    }

    #[test]
    fn test_combine_is_monotonic_and_bounded() {
        let mut previous = -1.0;
        for lexical in [0.0, 10.0, 45.0, 100.0] {
            let score = combine(50.0, lexical);
            assert!(score > previous);
            assert!((0.0..=100.0).contains(&score));
            previous = score;
        }
        assert_eq!(combine(500.0, 500.0), 100.0);
    }

    #[test]
    fn test_parse_scores_tolerates_fences_and_gaps() {
        let scores = parse_scores("```json\n{\"scores\": {\"0\": 90, \"2\": \"140\"}}\n```", 3).unwrap();
        assert_eq!(scores, vec![90.0, 50.0, 100.0]);
        assert!(parse_scores("not json", 2).is_none());
    }

    #[tokio::test]
    async fn test_rank_with_neutral_semantic_uses_lexical_order() {
        let matcher = SemanticMatcher::new(Arc::new(MockLlm::failing(Some(503), "down")));
        let meter = UsageMeter::default();
        let ranked = matcher.rank("beginner pottery", catalogue(), &meter).await;

        assert_eq!(ranked[0].item.name, "Pottery Basics");
        assert_eq!(ranked[0].semantic, NEUTRAL_SEMANTIC);
        assert_eq!(ranked[1].item.name, "Wheel Throwing");
        assert!(meter.is_empty());
    }

    #[tokio::test]
    async fn test_rank_blends_model_scores() {
        let llm = Arc::new(MockLlm::constant(r#"{"scores": {"0": 10, "1": 95, "2": 20}}"#));
        let matcher = SemanticMatcher::new(llm.clone());
        let meter = UsageMeter::default();
        let ranked = matcher.rank("something to relax", catalogue(), &meter).await;

        assert_eq!(ranked[0].item.name, "Watercolour Evening");
        assert!(llm.requests()[0].json_mode);
        assert_eq!(meter.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_ties_keep_input_order_and_truncate() {
        let llm = Arc::new(MockLlm::constant("{}"));
        let matcher = SemanticMatcher::new(llm);
        let items: Vec<ServiceRecord> = (0..12).map(|i| service(&format!("Item {}", i), "", &[], "")).collect();
        let ranked = matcher.rank("zzz", items, &UsageMeter::default()).await;
        assert_eq!(ranked.len(), MAX_RESULTS);
        assert_eq!(ranked[0].item.name, "Item 0");
        assert_eq!(ranked[9].item.name, "Item 9");
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
