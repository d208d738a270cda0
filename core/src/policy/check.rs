//! Engine-specific rule parameters.
//!
//! Policy files are hand-edited and produced by the compiler, so every
//! accessor here tolerates missing keys and wrong types by returning the
//! caller's default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const ENGINE_KEY: &str = "engine";
pub const DESC_KEY: &str = "desc";
pub const RULE_ID_KEY: &str = "ruleId";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Null => serde_json::Value::Null,
            ParamValue::Bool(b) => serde_json::Value::Bool(*b),
            ParamValue::Int(i) => serde_json::Value::from(*i),
            ParamValue::Float(f) => serde_json::Value::from(*f),
            ParamValue::Str(s) => serde_json::Value::String(s.clone()),
            ParamValue::List(items) => {
                serde_json::Value::Array(items.iter().map(ParamValue::to_json).collect())
            }
            ParamValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckParams(BTreeMap<String, ParamValue>);

impl CheckParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(ParamValue::as_str)
    }

    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.str(key).unwrap_or(default)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.0.get(key) {
            Some(ParamValue::Bool(b)) => *b,
            _ => default,
        }
    }

    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        match self.0.get(key) {
            Some(ParamValue::Int(i)) => *i,
            Some(ParamValue::Float(f)) if f.fract() == 0.0 => *f as i64,
            _ => default,
        }
    }

    /// String items of a list value; non-string items are skipped.
    pub fn str_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(ParamValue::List(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(ParamValue::Str(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Target engine, `None` when absent, non-string, or blank.
    pub fn engine(&self) -> Option<&str> {
        self.str(ENGINE_KEY).map(str::trim).filter(|s| !s.is_empty())
    }

    /// Native rule identifier recorded by the compiler, if any.
    pub fn rule_id(&self) -> Option<&str> {
        self.str(RULE_ID_KEY).filter(|s| !s.is_empty())
    }

    /// Parameters handed to a tool when no generated config file exists.
    pub fn tool_params(&self) -> serde_json::Map<String, serde_json::Value> {
        self.0
            .iter()
            .filter(|(k, _)| k.as_str() != ENGINE_KEY && k.as_str() != DESC_KEY)
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> CheckParams {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn typed_accessors_read_matching_values() {
        let params = parse(
            r#"{"engine": "eslint", "max": 120, "strict": true, "names": ["a", "b", 3]}"#,
        );
        assert_eq!(params.engine(), Some("eslint"));
        assert_eq!(params.int_or("max", 80), 120);
        assert!(params.bool_or("strict", false));
        assert_eq!(params.str_list("names"), vec!["a", "b"]);
    }

    #[test]
    fn wrong_types_fall_back_to_defaults() {
        let params = parse(r#"{"engine": 42, "max": "many", "strict": "yes"}"#);
        assert_eq!(params.engine(), None);
        assert_eq!(params.int_or("max", 80), 80);
        assert!(!params.bool_or("strict", false));
        assert_eq!(params.str_or("missing", "fallback"), "fallback");
    }

    #[test]
    fn blank_engine_counts_as_missing() {
        let params = parse(r#"{"engine": "  "}"#);
        assert_eq!(params.engine(), None);
    }

    #[test]
    fn tool_params_strip_routing_keys() {
        let params = parse(r#"{"engine": "eslint", "desc": "no console", "max": 3, "opts": {"a": null}}"#);
        let json = params.tool_params();
        assert_eq!(json.len(), 2);
        assert_eq!(json["max"], serde_json::json!(3));
        assert_eq!(json["opts"], serde_json::json!({"a": null}));
    }
}
