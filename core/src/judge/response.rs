use anyhow::{anyhow, Result};
use serde_json::Value;

use super::Confidence;

/// One verdict from the judge about a (rule, file) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub rule_id: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub violates: bool,
    pub confidence: Confidence,
    pub description: String,
    pub suggestion: String,
}

impl Default for Judgment {
    fn default() -> Self {
        Self {
            rule_id: None,
            file: None,
            line: None,
            violates: false,
            confidence: Confidence::Low,
            description: String::new(),
            suggestion: String::new(),
        }
    }
}

impl Judgment {
    pub fn is_reportable(&self, min: Confidence) -> bool {
        self.violates && self.confidence >= min
    }

    pub fn message(&self) -> String {
        let description = if self.description.trim().is_empty() {
            "Rule violation detected"
        } else {
            self.description.trim()
        };
        if self.suggestion.trim().is_empty() {
            description.to_string()
        } else {
            format!("{description} | Suggestion: {}", self.suggestion.trim())
        }
    }

    fn from_value(value: &Value, default_violates: bool) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let violates = match obj.get("violates") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => default_violates,
        };
        let line = match obj.get("line") {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|l| *l > 0);

        Some(Self {
            rule_id: text(&["rule_id", "ruleId", "rule"]),
            file: text(&["file", "path", "file_path"]),
            line,
            violates,
            confidence: Confidence::from_response(
                obj.get("confidence").and_then(Value::as_str),
            ),
            description: text(&["description", "message"]).unwrap_or_default(),
            suggestion: text(&["suggestion", "fix"]).unwrap_or_default(),
        })
    }
}

/// Strips markdown code fences and surrounding whitespace.
pub fn clean_json_response(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

fn slice_between(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    (end > start).then(|| &s[start..=end])
}

fn parse_loose(raw: &str) -> Option<Value> {
    let cleaned = clean_json_response(raw);
    if let Ok(v) = serde_json::from_str::<Value>(cleaned) {
        return Some(v);
    }
    [('[', ']'), ('{', '}')]
        .iter()
        .filter_map(|(o, c)| slice_between(cleaned, *o, *c))
        .find_map(|s| serde_json::from_str::<Value>(s).ok())
}

/// Parses a per-pair verdict. Never fails: unreadable output is a
/// low-confidence non-violation, and a response that at least states
/// `"violates": true` is recovered by a string scan at medium confidence.
pub fn parse_single_judgment(raw: &str) -> Judgment {
    if let Some(value) = parse_loose(raw) {
        let value = match value {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        };
        if let Some(j) = Judgment::from_value(&value, false) {
            return j;
        }
    }

    let lower = raw.to_ascii_lowercase();
    if lower.contains(r#""violates": false"#)
        || lower.contains(r#""violates":false"#)
        || lower.contains("does not violate")
    {
        return Judgment::default();
    }
    if lower.contains(r#""violates": true"#) || lower.contains(r#""violates":true"#) {
        return Judgment {
            violates: true,
            confidence: Confidence::Medium,
            description: extract_json_field(raw, "description").unwrap_or_default(),
            suggestion: extract_json_field(raw, "suggestion").unwrap_or_default(),
            ..Judgment::default()
        };
    }
    Judgment::default()
}

/// Parses a batched verdict list: a bare array, or an object wrapping one
/// under `judgments`, `results` or `violations`.
pub fn parse_batch_judgments(raw: &str) -> Result<Vec<Judgment>> {
    let value = parse_loose(raw).ok_or_else(|| anyhow!("judge response is not JSON"))?;

    let (items, default_violates) = match value {
        Value::Array(items) => (items, false),
        Value::Object(mut obj) => {
            if let Some(Value::Array(items)) = obj.remove("judgments") {
                (items, false)
            } else if let Some(Value::Array(items)) = obj.remove("results") {
                (items, false)
            } else if let Some(Value::Array(items)) = obj.remove("violations") {
                (items, true)
            } else if obj.contains_key("violates") {
                (vec![Value::Object(obj)], false)
            } else {
                return Err(anyhow!("judge response object has no judgment list"));
            }
        }
        other => return Err(anyhow!("unexpected judge response shape: {other}")),
    };

    Ok(items
        .iter()
        .filter_map(|item| Judgment::from_value(item, default_violates))
        .collect())
}

/// Reads `"field": "value"` out of text that is not valid JSON.
pub fn extract_json_field(raw: &str, field: &str) -> Option<String> {
    let key = format!("\"{field}\"");
    let after_key = raw.find(&key)? + key.len();
    let rest = &raw[after_key..];
    let colon = rest.find(':')?;
    let rest = &rest[colon + 1..];
    let open = rest.find('"')?;
    let body = &rest[open + 1..];

    let mut prev = '\0';
    for (i, c) in body.char_indices() {
        if c == '"' && prev != '\\' {
            let value = body[..i].trim();
            return (!value.is_empty()).then(|| value.to_string());
        }
        prev = c;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_judgment_from_fenced_json() {
        let raw = "```json\n{\"violates\": true, \"confidence\": \"high\", \"description\": \"console.log found\", \"suggestion\": \"remove it\"}\n```";
        let j = parse_single_judgment(raw);
        assert!(j.violates);
        assert_eq!(j.confidence, Confidence::High);
        assert_eq!(j.message(), "console.log found | Suggestion: remove it");
    }

    #[test]
    fn single_judgment_without_confidence_is_medium() {
        let j = parse_single_judgment(r#"Sure: {"violates": true, "description": "x"} hope that helps"#);
        assert!(j.violates);
        assert_eq!(j.confidence, Confidence::Medium);
    }

    #[test]
    fn single_judgment_string_scan_fallback() {
        let raw = r#"{"violates": true, "description": "uses let", trailing garbage"#;
        let j = parse_single_judgment(raw);
        assert!(j.violates);
        assert_eq!(j.confidence, Confidence::Medium);
        assert_eq!(j.description, "uses let");
    }

    #[test]
    fn unreadable_single_judgment_is_not_a_violation() {
        let j = parse_single_judgment("I cannot decide.");
        assert!(!j.violates);
        assert!(!j.is_reportable(Confidence::Low));
    }

    #[test]
    fn batch_accepts_bare_array_and_wrappers() {
        let array = r#"[{"rule_id": "r1", "file": "a.js", "line": 3, "violates": true, "confidence": "high"}]"#;
        let judgments = parse_batch_judgments(array).unwrap();
        assert_eq!(judgments.len(), 1);
        assert_eq!(judgments[0].rule_id.as_deref(), Some("r1"));
        assert_eq!(judgments[0].line, Some(3));

        let wrapped = r#"{"violations": [{"rule_id": "r2", "file": "b.py"}]}"#;
        let judgments = parse_batch_judgments(wrapped).unwrap();
        assert!(judgments[0].violates);
        assert_eq!(judgments[0].confidence, Confidence::Medium);
    }

    #[test]
    fn batch_rejects_non_json() {
        assert!(parse_batch_judgments("not valid json").is_err());
        assert!(parse_batch_judgments(r#"{"summary": "ok"}"#).is_err());
    }

    #[test]
    fn reportable_respects_threshold() {
        let low = Judgment {
            violates: true,
            confidence: Confidence::Low,
            ..Judgment::default()
        };
        assert!(!low.is_reportable(Confidence::Medium));
        assert!(low.is_reportable(Confidence::Low));
    }
}
