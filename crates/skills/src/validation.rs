//! Tool argument validation.
//!
//! Each tool declares its parameters as a list of [`FieldSpec`]s. The same
//! list drives validation before dispatch and the JSON schema exposed to
//! the model, so the two can never drift apart.

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

/// Accepted value shape of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer { min: Option<i64>, max: Option<i64> },
    /// Any number; numeric strings like "45" or "$45.50" are accepted.
    Number,
    Bool,
    Enum(&'static [&'static str]),
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM`, 24-hour clock.
    Time,
    Email,
    Phone,
}

/// One tool parameter.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

impl FieldSpec {
    pub fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }

    fn json_schema(&self) -> Value {
        let mut schema = match &self.kind {
            FieldKind::String => json!({"type": "string"}),
            FieldKind::Integer { min, max } => {
                let mut s = json!({"type": "integer"});
                if let Some(min) = min {
                    s["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    s["maximum"] = json!(max);
                }
                s
            }
            FieldKind::Number => json!({"type": "number"}),
            FieldKind::Bool => json!({"type": "boolean"}),
            FieldKind::Enum(values) => json!({"type": "string", "enum": values}),
            FieldKind::Date => json!({"type": "string", "format": "date", "pattern": "^\\d{4}-\\d{2}-\\d{2}$"}),
            FieldKind::Time => json!({"type": "string", "pattern": "^\\d{2}:\\d{2}$"}),
            FieldKind::Email => json!({"type": "string", "format": "email"}),
            FieldKind::Phone => json!({"type": "string"}),
        };
        schema["description"] = json!(self.description);
        schema
    }
}

/// JSON schema (object) for a parameter list.
pub fn json_schema(specs: &[FieldSpec]) -> Value {
    let properties: Map<String, Value> = specs
        .iter()
        .map(|s| (s.name.to_string(), s.json_schema()))
        .collect();
    let required: Vec<&str> = specs.iter().filter(|s| s.required).map(|s| s.name).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("email pattern compiles")
    })
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9\s\-().]{7,20}$").expect("phone pattern compiles"))
}

/// Parse a number, tolerating currency symbols and thousands separators.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' '))
                .collect();
            cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn check(spec: &FieldSpec, value: &Value) -> Result<Value, String> {
    let name = spec.name;
    match &spec.kind {
        FieldKind::String => as_text(value)
            .map(Value::String)
            .ok_or_else(|| format!("{} must be a string", name)),
        FieldKind::Integer { min, max } => {
            let n = parse_number(value)
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
                .ok_or_else(|| format!("{} must be a whole number", name))?;
            if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                return Err(match (min, max) {
                    (Some(lo), Some(hi)) => format!("{} must be between {} and {}", name, lo, hi),
                    (Some(lo), None) => format!("{} must be at least {}", name, lo),
                    (None, Some(hi)) => format!("{} must be at most {}", name, hi),
                    (None, None) => format!("{} is out of range", name),
                });
            }
            Ok(json!(n))
        }
        FieldKind::Number => parse_number(value)
            .map(|f| json!(f))
            .ok_or_else(|| format!("{} must be a number", name)),
        FieldKind::Bool => match value {
            Value::Bool(b) => Ok(json!(b)),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" => Ok(json!(true)),
                "false" | "no" => Ok(json!(false)),
                _ => Err(format!("{} must be true or false", name)),
            },
            _ => Err(format!("{} must be true or false", name)),
        },
        FieldKind::Enum(allowed) => {
            let text = as_text(value).map(|s| s.to_lowercase()).unwrap_or_default();
            allowed
                .iter()
                .find(|a| a.eq_ignore_ascii_case(&text))
                .map(|a| json!(a))
                .ok_or_else(|| format!("{} must be one of: {}", name, allowed.join(", ")))
        }
        FieldKind::Date => {
            let text = as_text(value).unwrap_or_default();
            if text.len() == 10 && NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_ok() {
                Ok(json!(text))
            } else {
                Err(format!("{} must be a date in YYYY-MM-DD format", name))
            }
        }
        FieldKind::Time => {
            let text = as_text(value).unwrap_or_default();
            if text.len() == 5 && NaiveTime::parse_from_str(&text, "%H:%M").is_ok() {
                Ok(json!(text))
            } else {
                Err(format!("{} must be a time in HH:MM format", name))
            }
        }
        FieldKind::Email => {
            let text = as_text(value).unwrap_or_default();
            if email_pattern().is_match(&text) {
                Ok(json!(text.to_lowercase()))
            } else {
                Err(format!("{} must be a valid email address", name))
            }
        }
        FieldKind::Phone => {
            let text = as_text(value).unwrap_or_default();
            let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
            if phone_pattern().is_match(&text) && digits >= 7 {
                Ok(json!(text))
            } else {
                Err(format!("{} must be a valid phone number", name))
            }
        }
    }
}

/// Validate `args` against `specs`.
///
/// Returns the normalized arguments (trimmed strings, numeric strings
/// converted, enum values in canonical case, blank values dropped) or every
/// field-level error found. Keys not declared in `specs` are dropped.
pub fn validate(specs: &[FieldSpec], args: &Value) -> Result<Map<String, Value>, Vec<String>> {
    let empty = Map::new();
    let input = match args {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => return Err(vec!["arguments must be a JSON object".to_string()]),
    };

    let mut output = Map::new();
    let mut errors = Vec::new();

    for spec in specs {
        match input.get(spec.name).filter(|v| !is_absent(v)) {
            None if spec.required => errors.push(format!("{} is required", spec.name)),
            None => {}
            Some(value) => match check(spec, value) {
                Ok(normalized) => {
                    output.insert(spec.name.to_string(), normalized);
                }
                Err(message) => errors.push(message),
            },
        }
    }

    if errors.is_empty() {
        Ok(output)
    } else {
        Err(errors)
    }
}
