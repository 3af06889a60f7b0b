//! Typed records parsed from tab rows.
//!
//! Owners name their columns freely, so every field accepts a handful of
//! header spellings. Rows without a name are skipped.

use serde::{Deserialize, Serialize};

use concierge_core::{row_bool, row_f64, row_list, row_str, Row};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub price: Option<f64>,
    pub duration_minutes: u32,
    pub capacity: u32,
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub price: Option<f64>,
    pub in_stock: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoursRecord {
    pub day: String,
    pub open: Option<String>,
    pub close: Option<String>,
    pub closed: bool,
}

/// Lowercase, dash-separated identifier.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

impl ServiceRecord {
    pub fn from_row(row: &Row, default_capacity: u32) -> Option<Self> {
        let name = row_str(row, &["name", "service", "service name", "class", "class name", "title"])?;
        Some(Self {
            id: row_str(row, &["id", "service id", "service_id", "code"]).unwrap_or_else(|| slugify(&name)),
            description: row_str(row, &["description", "details", "about", "summary"]).unwrap_or_default(),
            category: row_str(row, &["category", "type", "group"]).unwrap_or_default(),
            tags: row_list(row, &["tags", "keywords", "labels"]),
            price: row_f64(row, &["price", "cost", "fee", "rate"]),
            duration_minutes: row_f64(row, &["duration", "duration minutes", "duration (min)", "length", "minutes"])
                .filter(|d| *d > 0.0)
                .map(|d| d.round() as u32)
                .unwrap_or(60),
            capacity: row_f64(row, &["capacity", "max capacity", "spots", "seats", "max participants"])
                .filter(|c| *c >= 1.0)
                .map(|c| c as u32)
                .unwrap_or(default_capacity.max(1)),
            image_url: row_str(row, &["image", "image url", "image_url", "photo", "picture"]),
            level: row_str(row, &["level", "experience level", "difficulty"]).map(|l| l.to_lowercase()),
            name,
        })
    }

    pub fn parse_all(rows: &[Row], default_capacity: u32) -> Vec<Self> {
        rows.iter().filter_map(|r| Self::from_row(r, default_capacity)).collect()
    }

    /// Whether `reference` (an id or a name) designates this service.
    pub fn matches_reference(&self, reference: &str) -> bool {
        let reference = reference.trim();
        self.id.eq_ignore_ascii_case(reference)
            || self.name.eq_ignore_ascii_case(reference)
            || slugify(&self.name) == slugify(reference)
    }
}

/// Find a service by id or name, falling back to a unique partial name match.
pub fn find_service<'a>(services: &'a [ServiceRecord], reference: &str) -> Option<&'a ServiceRecord> {
    if let Some(exact) = services.iter().find(|s| s.matches_reference(reference)) {
        return Some(exact);
    }
    let needle = reference.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let mut partial = services.iter().filter(|s| {
        let name = s.name.to_lowercase();
        name.contains(&needle) || needle.contains(&name)
    });
    match (partial.next(), partial.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

impl ProductRecord {
    pub fn from_row(row: &Row) -> Option<Self> {
        let name = row_str(row, &["name", "product", "product name", "item", "title"])?;
        Some(Self {
            id: row_str(row, &["id", "sku", "product id", "code"]).unwrap_or_else(|| slugify(&name)),
            description: row_str(row, &["description", "details", "about"]).unwrap_or_default(),
            category: row_str(row, &["category", "type", "collection"]).unwrap_or_default(),
            tags: row_list(row, &["tags", "keywords", "labels"]),
            price: row_f64(row, &["price", "cost", "retail price"]),
            in_stock: row_bool(row, &["in stock", "available", "availability", "stock"]),
            image_url: row_str(row, &["image", "image url", "image_url", "photo"]),
            name,
        })
    }

    pub fn parse_all(rows: &[Row]) -> Vec<Self> {
        rows.iter().filter_map(Self::from_row).collect()
    }
}

impl HoursRecord {
    pub fn from_row(row: &Row) -> Option<Self> {
        let day = row_str(row, &["day", "weekday", "days"])?;
        let open = row_str(row, &["open", "opens", "opening", "open time", "from", "start"]);
        let close = row_str(row, &["close", "closes", "closing", "close time", "to", "end"]);
        let marked_closed = row_bool(row, &["closed", "is closed"]).unwrap_or(false);
        let closed = marked_closed
            || open.as_deref().is_some_and(|o| o.eq_ignore_ascii_case("closed"))
            || (open.is_none() && close.is_none());
        Some(Self {
            day,
            open: if closed { None } else { open },
            close: if closed { None } else { close },
            closed,
        })
    }

    pub fn parse_all(rows: &[Row]) -> Vec<Self> {
        rows.iter().filter_map(Self::from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_service_from_loose_headers() {
        let service = ServiceRecord::from_row(
            &row(json!({
                "Class Name": "Pottery Basics",
                "Category": "Pottery",
                "Tags": "beginner, clay",
                "Price": "$45",
                "Duration (min)": "90",
                "Max Participants": 8
            })),
            1,
        )
        .unwrap();

        assert_eq!(service.id, "pottery-basics");
        assert_eq!(service.tags, vec!["beginner", "clay"]);
        assert_eq!(service.price, Some(45.0));
        assert_eq!(service.duration_minutes, 90);
        assert_eq!(service.capacity, 8);
    }

    #[test]
    fn test_service_defaults() {
        let service = ServiceRecord::from_row(&row(json!({"Name": "Open Studio"})), 0).unwrap();
        assert_eq!(service.duration_minutes, 60);
        assert_eq!(service.capacity, 1);
        assert!(ServiceRecord::from_row(&row(json!({"Price": 10})), 5).is_none());
    }

    #[test]
    fn test_find_service_by_id_name_or_unique_partial() {
        let services = ServiceRecord::parse_all(
            &[
                row(json!({"ID": "svc-1", "Name": "Pottery Basics"})),
                row(json!({"ID": "svc-2", "Name": "Wheel Throwing"})),
                row(json!({"ID": "svc-3", "Name": "Advanced Wheel Throwing"})),
            ],
            4,
        );
        assert_eq!(find_service(&services, "svc-2").unwrap().name, "Wheel Throwing");
        assert_eq!(find_service(&services, "pottery basics").unwrap().id, "svc-1");
        assert_eq!(find_service(&services, "pottery").unwrap().id, "svc-1");
        assert_eq!(find_service(&services, "Wheel Throwing").unwrap().id, "svc-2");
        assert!(find_service(&services, "wheel").is_none());
    }

    #[test]
    fn test_hours_closed_days() {
        let hours = HoursRecord::parse_all(&[
            row(json!({"Day": "Monday", "Open": "09:00", "Close": "17:00"})),
            row(json!({"Day": "Sunday", "Open": "Closed"})),
        ]);
        assert!(!hours[0].closed);
        assert_eq!(hours[0].open.as_deref(), Some("09:00"));
        assert!(hours[1].closed);
        assert!(hours[1].open.is_none());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Pottery  Basics! "), "pottery-basics");
    }
}
