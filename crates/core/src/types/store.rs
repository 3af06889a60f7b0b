use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One tab row: column header to cell value.
pub type Row = serde_json::Map<String, Value>;

/// Logical business-data tabs that are cached per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Services,
    Products,
    Hours,
}

impl DataType {
    pub const ALL: [DataType; 3] = [DataType::Services, DataType::Products, DataType::Hours];

    /// Segment used in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Services => "services",
            Self::Products => "products",
            Self::Hours => "hours",
        }
    }

    /// Canonical tab title.
    pub fn tab_name(&self) -> &'static str {
        match self {
            Self::Services => "Services",
            Self::Products => "Products",
            Self::Hours => "Hours",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key for one store's tab: `store:{storeId}:{dataType}`.
pub fn cache_key(store_id: &str, data_type: DataType) -> String {
    format!("store:{}:{}", store_id, data_type.as_str())
}

/// Per-request snapshot of a store's tabs. `None` means the tab could not be
/// loaded, an empty list means it exists but has no rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreData {
    pub services: Option<Vec<Row>>,
    pub products: Option<Vec<Row>>,
    pub hours: Option<Vec<Row>>,
}

impl StoreData {
    pub fn get(&self, data_type: DataType) -> Option<&Vec<Row>> {
        match data_type {
            DataType::Services => self.services.as_ref(),
            DataType::Products => self.products.as_ref(),
            DataType::Hours => self.hours.as_ref(),
        }
    }

    pub fn set(&mut self, data_type: DataType, rows: Option<Vec<Row>>) {
        match data_type {
            DataType::Services => self.services = rows,
            DataType::Products => self.products = rows,
            DataType::Hours => self.hours = rows,
        }
    }

    /// Tabs that are still missing from the snapshot.
    pub fn missing(&self) -> Vec<DataType> {
        DataType::ALL
            .into_iter()
            .filter(|t| self.get(*t).is_none())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.missing().len() == DataType::ALL.len()
    }
}

// ===== Tolerant header access =====

/// Lowercase a header and drop everything that is not alphanumeric, so
/// "Duration (min)", "duration_min" and "DurationMin" compare equal.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// First non-empty cell whose header matches one of `names`.
pub fn row_value<'a>(row: &'a Row, names: &[&str]) -> Option<&'a Value> {
    let wanted: Vec<String> = names.iter().map(|n| normalize_header(n)).collect();
    for want in &wanted {
        for (header, value) in row {
            if &normalize_header(header) == want && !is_blank(value) {
                return Some(value);
            }
        }
    }
    None
}

/// Cell as trimmed text.
pub fn row_str(row: &Row, names: &[&str]) -> Option<String> {
    row_value(row, names).map(|v| match v {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    })
}

/// Cell as a number, accepting numeric strings like "$45.00".
pub fn row_f64(row: &Row, names: &[&str]) -> Option<f64> {
    match row_value(row, names)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

/// Cell as a boolean ("yes", "true", "1", "y").
pub fn row_bool(row: &Row, names: &[&str]) -> Option<bool> {
    match row_value(row, names)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "yes" | "y" | "true" | "1" | "x" => Some(true),
            "no" | "n" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Comma or semicolon separated list cell.
pub fn row_list(row: &Row, names: &[&str]) -> Vec<String> {
    match row_value(row, names) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split([',', ';'])
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
