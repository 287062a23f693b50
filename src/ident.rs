//! Identifier cleaning and synthesis.

use serde_json::{Map, Value};
use uuid::Uuid;

/// Placeholder strings that mean "no value" in exported CSV data.
pub const SENTINELS: [&str; 3] = ["", "nan", "None"];

/// Canonicalize a raw identifier.
///
/// Trims whitespace, drops a trailing `.0` left behind by float coercion and
/// maps the sentinel strings to `None`.
pub fn clean(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    if SENTINELS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Mint a fresh identifier. Not stable across runs.
pub fn synthesize() -> String {
    Uuid::new_v4().to_string()
}

/// Whether a column name is treated as an identifier column.
pub fn is_id_key(name: &str) -> bool {
    name.to_lowercase().contains("id")
}

/// Run [`clean`] over every id-like string field; other fields are untouched.
pub fn clean_id_fields(props: &mut Map<String, Value>) {
    for (key, value) in props.iter_mut() {
        if !is_id_key(key) {
            continue;
        }
        if let Value::String(raw) = value {
            *value = match clean(raw) {
                Some(s) => Value::String(s),
                None => Value::Null,
            };
        }
    }
}
