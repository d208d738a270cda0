use std::collections::HashSet;
use std::path::Path;

use crate::error::PolicyError;

use super::types::{CodePolicy, UserPolicy};

pub fn load_policy(path: &Path) -> Result<CodePolicy, PolicyError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_policy(&raw)
}

pub fn parse_policy(raw: &str) -> Result<CodePolicy, PolicyError> {
    let policy: CodePolicy = serde_json::from_str(raw).map_err(PolicyError::Parse)?;
    ensure_unique_ids(policy.rules.iter().map(|r| r.id.as_str()))?;
    Ok(policy)
}

pub fn load_user_policy(path: &Path) -> Result<UserPolicy, PolicyError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let policy: UserPolicy = serde_json::from_str(&raw).map_err(PolicyError::Parse)?;
    ensure_unique_ids(policy.rules.iter().map(|r| r.id.as_str()))?;
    Ok(policy)
}

pub async fn write_policy(path: &Path, policy: &CodePolicy) -> Result<(), PolicyError> {
    let json = serde_json::to_vec_pretty(policy).map_err(PolicyError::Parse)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| PolicyError::Write {
            path: path.display().to_string(),
            source,
        })
}

fn ensure_unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), PolicyError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(PolicyError::DuplicateRuleId(id.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Severity;

    #[test]
    fn parses_compiled_policy() {
        let policy = parse_policy(
            r#"{
                "version": "1.0",
                "rules": [
                    {
                        "id": "no-console-eslint",
                        "category": "quality",
                        "severity": "error",
                        "when": {"languages": ["javascript"]},
                        "check": {"engine": "eslint", "ruleId": "no-console"}
                    },
                    {
                        "id": "secrets-llm-validator",
                        "enabled": false,
                        "desc": "No hardcoded secrets",
                        "check": {"engine": "llm-validator"}
                    }
                ],
                "enforce": {"stages": ["pre-commit"], "fail_on": ["error", "warning"]}
            }"#,
        )
        .unwrap();

        assert_eq!(policy.rules.len(), 2);
        assert!(policy.rules[0].enabled);
        assert_eq!(policy.rules[0].severity, Some(Severity::Error));
        assert_eq!(policy.rules[0].check.rule_id(), Some("no-console"));
        assert!(!policy.rules[1].enabled);
        assert!(policy.enforce.fails_on(Severity::Warning));
        assert!(!policy.enforce.fails_on(Severity::Info));
    }

    #[test]
    fn duplicate_rule_ids_are_rejected() {
        let err = parse_policy(
            r#"{"rules": [{"id": "a", "check": {}}, {"id": "a", "check": {}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::DuplicateRuleId(id) if id == "a"));
    }

    #[tokio::test]
    async fn written_policy_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code-policy.json");
        let policy = parse_policy(r#"{"rules": [{"id": "r1", "check": {"engine": "pylint"}}]}"#)
            .unwrap();
        write_policy(&path, &policy).await.unwrap();
        let loaded = load_policy(&path).unwrap();
        assert_eq!(loaded, policy);
    }
}
