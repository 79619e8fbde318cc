//! Typed access to a request's `params` object.

use std::ops::RangeInclusive;

use pubmed_mcp_entrez::query::is_valid_date;
use serde_json::{Map, Value};

use super::DispatchError;

type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Clone, Default)]
pub struct Params {
    map: Map<String, Value>,
}

impl Params {
    /// `null` is an empty object; any other non-object is rejected.
    pub fn from_value(value: &Value, field: &'static str) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self { map: map.clone() }),
            other => Err(DispatchError::invalid(field, format!("expected an object, got {}", type_name(other)))),
        }
    }

    /// Present and not `null`.
    fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Non-blank string, or a number rendered as text.
    pub fn text(&self, key: &'static str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(DispatchError::invalid(key, format!("expected a string, got {}", type_name(other)))),
        }
    }

    pub fn required_text(&self, key: &'static str) -> Result<String> {
        self.text(key)?.ok_or(DispatchError::MissingField(key))
    }

    pub fn text_or(&self, key: &'static str, default: &str) -> Result<String> {
        Ok(self.text(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Integer from a JSON number or a numeric string, checked against `range`.
    pub fn integer(&self, key: &'static str, default: i64, range: RangeInclusive<i64>) -> Result<i64> {
        let value = match self.get(key) {
            None => return Ok(default),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 1e15).map(|f| f as i64)),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
        }
        .ok_or_else(|| DispatchError::invalid(key, "expected an integer"))?;

        if !range.contains(&value) {
            return Err(DispatchError::invalid(
                key,
                format!("must be between {} and {}", range.start(), range.end()),
            ));
        }
        Ok(value)
    }

    pub fn boolean(&self, key: &'static str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(DispatchError::invalid(key, "expected true or false")),
            },
            Some(_) => Err(DispatchError::invalid(key, "expected a boolean")),
        }
    }

    /// Optional `YYYY/MM/DD` (or `YYYY/MM`, `YYYY`) date.
    pub fn date(&self, key: &'static str) -> Result<Option<String>> {
        match self.text(key)? {
            Some(date) if !is_valid_date(&date) => {
                Err(DispatchError::invalid(key, format!("'{}' is not a YYYY/MM/DD date", date)))
            }
            other => Ok(other),
        }
    }

    /// A single PMID given as a string or an integer.
    pub fn pmid(&self, key: &'static str) -> Result<String> {
        let pmid = self.required_text(key)?;
        if !is_pmid(&pmid) {
            return Err(DispatchError::invalid(key, format!("'{}' is not a PMID", pmid)));
        }
        Ok(pmid)
    }

    /// Required non-empty array of PMIDs; duplicates are dropped, order kept.
    pub fn id_list(&self, key: &'static str) -> Result<Vec<String>> {
        let items = match self.get(key) {
            None => return Err(DispatchError::MissingField(key)),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(DispatchError::invalid(key, format!("expected an array, got {}", type_name(other))))
            }
        };

        let mut ids: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let id = match item {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) if n.is_u64() => n.to_string(),
                other => {
                    return Err(DispatchError::invalid(key, format!("expected PMID strings, got {}", type_name(other))))
                }
            };
            if !is_pmid(&id) {
                return Err(DispatchError::invalid(key, format!("'{}' is not a PMID", id)));
            }
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        if ids.is_empty() {
            return Err(DispatchError::MissingField(key));
        }
        Ok(ids)
    }

    /// Optional array of strings; blank entries are skipped.
    pub fn string_list(&self, key: &'static str) -> Result<Vec<String>> {
        match self.get(key) {
            None => Ok(vec![]),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if s.trim().is_empty() => None,
                    Value::String(s) => Some(Ok(s.trim().to_string())),
                    other => Some(Err(DispatchError::invalid(
                        key,
                        format!("expected strings, got {}", type_name(other)),
                    ))),
                })
                .collect(),
            Some(other) => Err(DispatchError::invalid(key, format!("expected an array, got {}", type_name(other)))),
        }
    }

    /// Required nested object.
    pub fn object(&self, key: &'static str) -> Result<Params> {
        match self.get(key) {
            None => Err(DispatchError::MissingField(key)),
            Some(value) => Params::from_value(value, key),
        }
    }
}

fn is_pmid(value: &str) -> bool {
    !value.is_empty() && value.len() <= 12 && value.bytes().all(|b| b.is_ascii_digit())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        Params::from_value(&value, "params").unwrap()
    }

    #[test]
    fn test_null_params_is_empty_and_scalars_rejected() {
        assert!(!Params::from_value(&Value::Null, "params").unwrap().has("query"));
        let err = Params::from_value(&json!([1]), "params").unwrap_err();
        assert_eq!(err.kind(), "invalid_field");
    }

    #[test]
    fn test_integer_accepts_numbers_and_numeric_strings() {
        let p = params(json!({"a": 5, "b": "7", "c": 3.0, "d": "x", "e": 0}));
        assert_eq!(p.integer("a", 1, 1..=10).unwrap(), 5);
        assert_eq!(p.integer("b", 1, 1..=10).unwrap(), 7);
        assert_eq!(p.integer("c", 1, 1..=10).unwrap(), 3);
        assert_eq!(p.integer("missing", 4, 1..=10).unwrap(), 4);
        assert!(p.integer("d", 1, 1..=10).is_err());
        let err = p.integer("e", 1, 1..=10).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for e: must be between 1 and 10");
    }

    #[test]
    fn test_boolean_accepts_strings() {
        let p = params(json!({"a": true, "b": "false", "c": "yes"}));
        assert!(p.boolean("a", false).unwrap());
        assert!(!p.boolean("b", true).unwrap());
        assert!(p.boolean("missing", true).unwrap());
        assert!(p.boolean("c", false).is_err());
    }

    #[test]
    fn test_required_text() {
        let p = params(json!({"query": "  ", "n": 12}));
        let err = p.required_text("query").unwrap_err();
        assert_eq!(err.to_string(), "missing required field: query");
        assert_eq!(p.required_text("n").unwrap(), "12");
    }

    #[test]
    fn test_id_list_validation() {
        let p = params(json!({
            "ok": ["123", 456, "123"],
            "empty": [],
            "bad": ["12a"],
            "scalar": "123",
        }));
        assert_eq!(p.id_list("ok").unwrap(), vec!["123", "456"]);
        assert!(matches!(p.id_list("empty"), Err(DispatchError::MissingField("empty"))));
        assert!(matches!(p.id_list("missing"), Err(DispatchError::MissingField("missing"))));
        assert_eq!(p.id_list("bad").unwrap_err().kind(), "invalid_field");
        assert_eq!(p.id_list("scalar").unwrap_err().kind(), "invalid_field");
    }

    #[test]
    fn test_dates_and_lists() {
        let p = params(json!({"min": "2020/01/01", "max": "01-01-2020", "words": ["a", " ", "b"]}));
        assert_eq!(p.date("min").unwrap().as_deref(), Some("2020/01/01"));
        assert!(p.date("max").is_err());
        assert_eq!(p.date("none").unwrap(), None);
        assert_eq!(p.string_list("words").unwrap(), vec!["a", "b"]);
        assert!(p.string_list("none").unwrap().is_empty());
    }

    #[test]
    fn test_pmid() {
        let p = params(json!({"a": 34567890, "b": "PMC123"}));
        assert_eq!(p.pmid("a").unwrap(), "34567890");
        assert_eq!(p.pmid("b").unwrap_err().kind(), "invalid_field");
        assert_eq!(p.pmid("c").unwrap_err().kind(), "missing_field");
    }
}
