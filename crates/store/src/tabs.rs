//! Tab loader: resolves logical tab names against a store's actual tab
//! titles and fetches their rows.

use std::sync::Arc;

use concierge_core::{
    normalize_header, DataType, Result, Row, StoreData, TabContents, TabSource,
};

/// Logical name of the lead capture tab.
pub const LEADS_TAB: &str = "Leads";

/// Alternative titles owners commonly use for each logical tab.
const ALIASES: &[(&str, &[&str])] = &[
    ("services", &["classes", "offerings", "menu", "treatments", "sessions"]),
    ("products", &["inventory", "shop", "items", "catalog", "merchandise"]),
    ("hours", &["opening hours", "schedule", "business hours", "opening times"]),
    ("leads", &["contacts", "inquiries", "enquiries", "signups"]),
];

/// A logical tab resolved to a concrete title.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTab {
    pub logical: String,
    pub title: String,
}

/// Pick the title that best matches a logical tab name.
///
/// Order: exact (normalized) match, containment of the logical name or its
/// singular, then the alias table.
pub fn resolve_title(titles: &[String], logical: &str) -> Option<String> {
    let wanted = normalize_header(logical);
    if wanted.is_empty() {
        return None;
    }
    let singular = wanted.strip_suffix('s').unwrap_or(&wanted).to_string();
    let normalized: Vec<(String, &String)> = titles.iter().map(|t| (normalize_header(t), t)).collect();

    if let Some((_, title)) = normalized.iter().find(|(n, _)| *n == wanted) {
        return Some((*title).clone());
    }

    if let Some((_, title)) = normalized
        .iter()
        .find(|(n, _)| !n.is_empty() && (n.contains(&singular) || wanted.contains(n.as_str())))
    {
        return Some((*title).clone());
    }

    let aliases = ALIASES
        .iter()
        .find(|(name, _)| normalize_header(name) == wanted)
        .map(|(_, aliases)| *aliases)
        .unwrap_or_default();
    for alias in aliases {
        let alias = normalize_header(alias);
        if let Some((_, title)) = normalized.iter().find(|(n, _)| *n == alias || n.contains(&alias)) {
            return Some((*title).clone());
        }
    }

    None
}

/// Fetches structured rows by logical tab name.
pub struct TabLoader {
    source: Arc<dyn TabSource>,
}

impl TabLoader {
    pub fn new(source: Arc<dyn TabSource>) -> Self {
        Self { source }
    }

    /// Resolve a logical tab for a store. `None` when no tab matches.
    pub async fn resolve(&self, store_id: &str, logical: &str) -> Result<Option<ResolvedTab>> {
        let titles = self.source.list_tabs(store_id).await?;
        let resolved = resolve_title(&titles, logical).map(|title| ResolvedTab {
            logical: logical.to_string(),
            title,
        });
        if resolved.is_none() {
            tracing::debug!(store_id = %store_id, logical = %logical, tabs = ?titles, "No tab matches");
        }
        Ok(resolved)
    }

    /// Headers and rows of a logical tab.
    pub async fn fetch_logical(&self, store_id: &str, logical: &str) -> Result<Option<(ResolvedTab, TabContents)>> {
        match self.resolve(store_id, logical).await? {
            Some(tab) => {
                let contents = self.source.fetch_tab(store_id, &tab.title).await?;
                Ok(Some((tab, contents)))
            }
            None => Ok(None),
        }
    }

    /// Rows of one business tab.
    pub async fn fetch(&self, store_id: &str, data_type: DataType) -> Result<Option<Vec<Row>>> {
        Ok(self
            .fetch_logical(store_id, data_type.tab_name())
            .await?
            .map(|(_, contents)| contents.rows))
    }

    /// Fetch the requested tabs concurrently.
    ///
    /// A tab that is missing or fails to load is left as `None`; the caller
    /// decides whether that matters.
    pub async fn load(&self, store_id: &str, wanted: &[DataType]) -> StoreData {
        let mut data = StoreData::default();
        if wanted.is_empty() {
            return data;
        }

        let titles = match self.source.list_tabs(store_id).await {
            Ok(titles) => titles,
            Err(e) => {
                tracing::warn!(store_id = %store_id, error = %e, "Failed to list tabs");
                return data;
            }
        };

        let fetch = |data_type: DataType| {
            let titles = &titles;
            async move {
                if !wanted.contains(&data_type) {
                    return None;
                }
                let title = resolve_title(titles, data_type.tab_name())?;
                match self.source.fetch_tab(store_id, &title).await {
                    Ok(contents) => Some(contents.rows),
                    Err(e) => {
                        tracing::warn!(store_id = %store_id, tab = %title, error = %e, "Failed to fetch tab");
                        None
                    }
                }
            }
        };

        let (services, products, hours) = tokio::join!(
            fetch(DataType::Services),
            fetch(DataType::Products),
            fetch(DataType::Hours),
        );
        data.services = services;
        data.products = products;
        data.hours = hours;
        data
    }

    /// Append a row to a resolved tab.
    pub async fn append_row(&self, store_id: &str, tab: &ResolvedTab, row: Row) -> Result<()> {
        tracing::info!(store_id = %store_id, tab = %tab.title, "Appending row");
        self.source.append_row(store_id, &tab.title, row).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::mocks::MockTabSource;
    use serde_json::json;

    fn titles(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_resolve_exact_then_containment_then_alias() {
        let tabs = titles(&["Our Classes", "Shop Items", "Opening Hours", "Contacts"]);
        assert_eq!(resolve_title(&tabs, "Hours").as_deref(), Some("Opening Hours"));
        assert_eq!(resolve_title(&tabs, "Services").as_deref(), Some("Our Classes"));
        assert_eq!(resolve_title(&tabs, "Products").as_deref(), Some("Shop Items"));
        assert_eq!(resolve_title(&tabs, "Leads").as_deref(), Some("Contacts"));

        let tabs = titles(&["services ", "Service List"]);
        assert_eq!(resolve_title(&tabs, "Services").as_deref(), Some("services "));
    }

    #[test]
    fn test_resolve_none() {
        assert_eq!(resolve_title(&titles(&["Staff"]), "Products"), None);
    }

    #[tokio::test]
    async fn test_load_fetches_only_wanted_tabs() {
        let source = Arc::new(
            MockTabSource::new()
                .with_tab("Services", &[], vec![json!({"Name": "Pottery Basics"})])
                .with_tab("Products", &[], vec![json!({"Name": "Clay"})])
                .with_tab("Hours", &[], vec![json!({"Day": "Monday"})]),
        );
        let loader = TabLoader::new(source.clone());

        let data = loader.load("s1", &[DataType::Services, DataType::Hours]).await;
        assert_eq!(data.services.as_ref().map(|r| r.len()), Some(1));
        assert!(data.products.is_none());
        assert_eq!(data.hours.as_ref().map(|r| r.len()), Some(1));
        assert!(!source.fetches().contains(&"Products".to_string()));
    }

    #[tokio::test]
    async fn test_missing_tab_is_none() {
        let source = Arc::new(MockTabSource::new().with_tab("Services", &[], vec![]));
        let loader = TabLoader::new(source);
        let data = loader.load("s1", &DataType::ALL).await;
        assert_eq!(data.services, Some(vec![]));
        assert!(data.products.is_none());
        assert!(data.hours.is_none());
    }
}
