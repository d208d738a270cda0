use std::sync::Arc;

use crate::policy::{PolicyRule, Severity};
use crate::tool::RawViolation;

use super::result::Violation;

/// Resolves a raw finding to one of the unit's rules.
///
/// Order: the policy rule id itself, a `ruleId` recorded in a rule's check
/// parameters, a rule whose id contains the raw identifier, and finally the
/// unit's first rule. Returns `None` only for a unit with no rules.
pub fn resolve_rule<'a>(
    rules: &'a [Arc<PolicyRule>],
    raw_rule_id: Option<&str>,
) -> Option<&'a Arc<PolicyRule>> {
    let raw = raw_rule_id.map(str::trim).filter(|s| !s.is_empty());
    if let Some(raw) = raw {
        if let Some(rule) = rules.iter().find(|r| r.id == raw) {
            return Some(rule);
        }
        if let Some(rule) = rules.iter().find(|r| r.check.rule_id() == Some(raw)) {
            return Some(rule);
        }
        if let Some(rule) = rules.iter().find(|r| r.id.contains(raw)) {
            return Some(rule);
        }
    }
    rules.first()
}

/// Maps a unit's raw findings onto policy rules.
pub fn map_violations(
    rules: &[Arc<PolicyRule>],
    raw: Vec<RawViolation>,
    tool_name: &str,
    execution_ms: u64,
) -> Vec<Violation> {
    raw.into_iter()
        .filter_map(|rv| {
            let rule = resolve_rule(rules, rv.rule_id.as_deref())?;
            let severity = rule
                .severity
                .or_else(|| rv.severity.as_deref().map(Severity::normalize))
                .unwrap_or(Severity::Error);
            let message = if rv.message.trim().is_empty() && !rule.message.is_empty() {
                rule.message.clone()
            } else {
                rv.message
            };
            Some(Violation {
                file: rv.file,
                line: rv.line,
                column: rv.column,
                message,
                severity,
                rule_id: rule.id.clone(),
                tool_name: tool_name.to_string(),
                execution_ms,
            })
        })
        .collect()
}
