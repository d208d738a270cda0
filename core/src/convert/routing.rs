use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::change::normalize_language;
use crate::judge::{clean_json_response, routing_prompt, Judge, ResponseFormat};
use crate::policy::UserRule;
use crate::tool::{RuleConverter, ToolRegistry};

/// Converters whose languages overlap `languages`; every converter when
/// `languages` is empty.
pub fn candidate_tools(registry: &ToolRegistry, languages: &[String]) -> Vec<Arc<dyn RuleConverter>> {
    let wanted: Vec<String> = languages.iter().map(|l| normalize_language(l)).collect();
    registry
        .converters()
        .into_iter()
        .filter(|c| {
            wanted.is_empty()
                || c.supported_languages()
                    .iter()
                    .any(|l| wanted.contains(&normalize_language(l)))
        })
        .collect()
}

/// Reads a tool list from `["a", "b"]` or `{"tools": ["a", "b"]}`.
pub fn parse_tool_selection(raw: &str) -> Option<Vec<String>> {
    let cleaned = clean_json_response(raw);
    let value: Value = serde_json::from_str(cleaned).ok().or_else(|| {
        let start = cleaned.find(|c| c == '[' || c == '{')?;
        let end = cleaned.rfind(|c| c == ']' || c == '}')?;
        (end > start)
            .then(|| serde_json::from_str(&cleaned[start..=end]).ok())
            .flatten()
    })?;
    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("tools").or_else(|| obj.remove("linters")) {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    Some(
        list.into_iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_ascii_lowercase()))
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Picks native tools for each rule. An empty selection routes the rule to
/// the judge engine.
pub async fn route_rules(
    registry: &ToolRegistry,
    judge: Option<&dyn Judge>,
    rules: &[(UserRule, Vec<String>)],
    max_parallel: usize,
) -> Vec<Vec<String>> {
    let Some(judge) = judge else {
        return vec![Vec::new(); rules.len()];
    };

    let sem = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut futs = FuturesUnordered::new();
    for (idx, (rule, languages)) in rules.iter().enumerate() {
        let candidates = candidate_tools(registry, languages);
        let sem = sem.clone();
        futs.push(async move {
            if candidates.is_empty() {
                return (idx, Vec::new());
            }
            let Ok(_permit) = sem.acquire_owned().await else {
                return (idx, Vec::new());
            };
            (idx, select_tools(judge, rule, languages, &candidates).await)
        });
    }

    let mut routed = vec![Vec::new(); rules.len()];
    while let Some((idx, tools)) = futs.next().await {
        routed[idx] = tools;
    }
    routed
}

async fn select_tools(
    judge: &dyn Judge,
    rule: &UserRule,
    languages: &[String],
    candidates: &[Arc<dyn RuleConverter>],
) -> Vec<String> {
    let described: Vec<(String, String)> = candidates
        .iter()
        .map(|c| {
            let hints = c.routing_hints();
            let text = if hints.is_empty() {
                c.llm_description().to_string()
            } else {
                format!("{} (e.g. {})", c.llm_description(), hints.join("; "))
            };
            (c.name().to_string(), text)
        })
        .collect();
    let pairs: Vec<(&str, &str)> = described
        .iter()
        .map(|(n, d)| (n.as_str(), d.as_str()))
        .collect();
    let prompt = routing_prompt(&rule.say, languages, &pairs);

    let raw = match judge.execute(&prompt, ResponseFormat::Json).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(rule_id = %rule.id, error = %e, "routing call failed, using judge engine");
            return Vec::new();
        }
    };
    let Some(selected) = parse_tool_selection(&raw) else {
        tracing::warn!(rule_id = %rule.id, "unreadable routing response, using judge engine");
        return Vec::new();
    };

    let mut tools: Vec<String> = described
        .iter()
        .map(|(name, _)| name.clone())
        .filter(|name| selected.contains(name))
        .collect();
    tools.sort();
    tracing::debug!(rule_id = %rule.id, tools = ?tools, "routed rule");
    tools
}
