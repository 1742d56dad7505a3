use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use regex::Regex;

/// A single server-side entity (arrival, supplier, payment, ...) kept as the
/// JSON object the API returned.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn id(&self) -> Option<String> {
        self.0.get("id").and_then(scalar_to_string)
    }

    /// Render the value behind `key` for a table cell. Dotted keys descend
    /// into nested objects (`supplier.name`).
    pub fn cell(&self, key: &str) -> String {
        let mut parts = key.split('.');
        let first = match parts.next() {
            Some(first) => first,
            None => return String::new(),
        };
        let mut current = match self.0.get(first) {
            Some(v) => v,
            None => return String::new(),
        };
        for part in parts {
            current = match current.get(part) {
                Some(v) => v,
                None => return String::new(),
            };
        }
        render_value(current)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// One page of a list endpoint: `{ "result": [...], "pages": N }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub result: Vec<Record>,
    #[serde(default = "one_page", deserialize_with = "lenient_pages")]
    pub pages: usize,
}

fn one_page() -> usize {
    1
}

// servers send pages as 0, null, a float or a numeric string for empty lists
fn lenient_pages<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let pages = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.ceil() as u64))
            .unwrap_or(1) as usize,
        Value::String(s) => s.trim().parse::<usize>().unwrap_or(1),
        _ => 1,
    };
    Ok(pages.max(1))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("expected FIELD=VALUE, got '{raw}'")]
    MissingEquals { raw: String },

    #[error("invalid field name '{key}'")]
    InvalidKey { key: String },

    #[error("field '{key}' conflicts with a nested field of the same name")]
    Conflict { key: String },

    #[error("no fields given")]
    Empty,
}

/// Build a JSON object from `key=value` form assignments.
///
/// Values that look like numbers, booleans or `null` are typed; prefix a value
/// with `@` to force a string. Dotted keys build nested objects.
pub fn parse_field_assignments<S: AsRef<str>>(
    assignments: &[S],
) -> Result<Map<String, Value>, FieldError> {
    if assignments.is_empty() {
        return Err(FieldError::Empty);
    }

    let mut body = Map::new();
    for raw in assignments {
        let raw = raw.as_ref();
        let (key, value) = raw.split_once('=').ok_or_else(|| FieldError::MissingEquals {
            raw: raw.to_string(),
        })?;
        let key = key.trim();
        if !field_key_regex().is_match(key) {
            return Err(FieldError::InvalidKey {
                key: key.to_string(),
            });
        }
        insert_path(&mut body, key, parse_field_value(value))?;
    }
    Ok(body)
}

fn field_key_regex() -> &'static Regex {
    static KEY_RE: OnceLock<Regex> = OnceLock::new();
    KEY_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("field key pattern is valid")
    })
}

fn insert_path(body: &mut Map<String, Value>, key: &str, value: Value) -> Result<(), FieldError> {
    let segments: Vec<&str> = key.split('.').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => {
            return Err(FieldError::InvalidKey {
                key: key.to_string(),
            })
        }
    };

    let mut target = body;
    for segment in parents {
        let entry = target
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        target = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(FieldError::Conflict {
                    key: key.to_string(),
                })
            }
        };
    }
    if matches!(target.get(*last), Some(Value::Object(_))) {
        return Err(FieldError::Conflict {
            key: key.to_string(),
        });
    }
    target.insert(last.to_string(), value);
    Ok(())
}

pub fn parse_field_value(raw: &str) -> Value {
    if let Some(forced) = raw.strip_prefix('@') {
        return Value::String(forced.to_string());
    }
    let trimmed = raw.trim();
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    // keep leading-zero codes like "007" as text
    let looks_like_code =
        trimmed.len() > 1 && trimmed.starts_with('0') && !trimmed.starts_with("0.");
    if !looks_like_code {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::from(n);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Value::from(f);
            }
        }
    }
    Value::String(raw.to_string())
}
