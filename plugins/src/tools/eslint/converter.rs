use std::collections::BTreeMap;

use async_trait::async_trait;
use codepact_core::api::{
    ConfigFormat, ConvertError, Judge, NativeConfig, RuleConverter, Severity, SingleRuleResult,
    UserRule,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{languages, CONFIG_FILE, NAME};
use crate::tools::support::ask_json;

const PROMPT: &str = r#"You translate coding rules into ESLint rule settings.

Reply with a single JSON object and nothing else:
{"rule_name": "<native eslint rule>", "severity": "error|warn|off", "options": <object or null>}

Only core ESLint rules are allowed, for example:
no-console, no-debugger, no-alert, no-unused-vars, no-undef, no-var, prefer-const,
camelcase, new-cap, id-length, id-match, eqeqeq, no-eval, no-implied-eval,
complexity, max-depth, max-nested-callbacks, max-len, max-lines,
max-lines-per-function, max-params, max-statements, indent, quotes, semi,
curly, no-else-return, no-empty, no-magic-numbers, no-throw-literal,
no-restricted-imports, no-duplicate-imports, require-await.

Never name plugin rules (@typescript-eslint/*, eslint-plugin-*). When no core
rule enforces the requirement, reply with "rule_name": "".

"No console.log allowed" -> {"rule_name": "no-console", "severity": "error", "options": null}
"Functions must not exceed 50 lines" -> {"rule_name": "max-lines-per-function", "severity": "error", "options": {"max": 50, "skipBlankLines": true, "skipComments": true}}
"File names must be kebab-case" -> {"rule_name": "", "severity": "off", "options": null}"#;

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    rule_name: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    options: Value,
}

pub struct EslintConverter;

#[async_trait]
impl RuleConverter for EslintConverter {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_languages(&self) -> Vec<String> {
        let mut langs = languages();
        langs.extend(["js".to_string(), "ts".to_string()]);
        langs
    }

    fn llm_description(&self) -> &str {
        "Core ESLint rules only: syntax checks, naming, console usage, length limits, basic patterns. Cannot check business logic, file names or context-dependent rules."
    }

    fn routing_hints(&self) -> Vec<String> {
        vec![
            "JavaScript/TypeScript naming (camelCase, PascalCase)".into(),
            "unused variables, no-console, no-eval".into(),
            "eqeqeq, no-var, prefer-const".into(),
        ]
    }

    async fn convert_single_rule(
        &self,
        rule: &UserRule,
        judge: &dyn Judge,
    ) -> Result<Option<SingleRuleResult>, ConvertError> {
        let mut prompt = format!("{PROMPT}\n\nConvert this rule:\n{}", rule.say);
        if let Some(sev) = rule.severity {
            prompt.push_str(&format!("\nSeverity: {sev}"));
        }

        let reply: Reply = ask_json(judge, &prompt).await?;
        let rule_name = reply.rule_name.trim();
        if rule_name.is_empty() {
            return Ok(None);
        }

        let severity = match rule.severity {
            Some(sev) => eslint_severity(sev).to_string(),
            None if !reply.severity.trim().is_empty() => reply.severity.trim().to_string(),
            None => "error".to_string(),
        };
        Ok(Some(SingleRuleResult {
            rule_id: rule.id.clone(),
            payload: json!({
                "rule_name": rule_name,
                "config": rule_setting(rule_name, &severity, reply.options),
            }),
        }))
    }

    fn build_config(
        &self,
        results: &[SingleRuleResult],
    ) -> Result<Option<NativeConfig>, ConvertError> {
        let mut rules = BTreeMap::new();
        for r in results {
            let name = r.payload["rule_name"]
                .as_str()
                .ok_or_else(|| ConvertError::Payload {
                    rule_id: r.rule_id.clone(),
                    message: "missing rule_name".into(),
                })?;
            rules.insert(name.to_string(), r.payload["config"].clone());
        }
        if rules.is_empty() {
            return Ok(None);
        }

        let config = json!({
            "env": {"es2021": true, "node": true, "browser": true},
            "parser": "@typescript-eslint/parser",
            "parserOptions": {"ecmaVersion": "latest", "sourceType": "module"},
            "rules": rules,
        });
        Ok(Some(NativeConfig {
            filename: CONFIG_FILE.to_string(),
            format: ConfigFormat::Json,
            content: serde_json::to_vec_pretty(&config)?,
        }))
    }

    fn native_rule_id(&self, result: &SingleRuleResult) -> Option<String> {
        result.payload["rule_name"].as_str().map(str::to_string)
    }
}

fn eslint_severity(sev: Severity) -> &'static str {
    match sev {
        Severity::Error => "error",
        Severity::Warning => "warn",
        Severity::Info => "off",
    }
}

/// `[severity, options]`, or the bare severity when there are no options.
/// `id-match` takes its pattern as a separate positional argument.
fn rule_setting(name: &str, severity: &str, options: Value) -> Value {
    match options {
        Value::Null => json!(severity),
        Value::Object(mut opts) if name == "id-match" => match opts.remove("pattern") {
            Some(Value::String(pattern)) if opts.is_empty() => json!([severity, pattern]),
            Some(Value::String(pattern)) => json!([severity, pattern, opts]),
            Some(other) => {
                opts.insert("pattern".into(), other);
                json!([severity, opts])
            }
            None => json!([severity, opts]),
        },
        other => json!([severity, other]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codepact_core::api::ResponseFormat;
    use pretty_assertions::assert_eq;

    struct Canned(&'static str);

    #[async_trait]
    impl Judge for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn execute(&self, _prompt: &str, _format: ResponseFormat) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn user_rule(say: &str, severity: Option<Severity>) -> UserRule {
        UserRule {
            id: "r1".into(),
            say: say.into(),
            severity,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn converts_with_user_severity() {
        let judge = Canned(
            "```json\n{\"rule_name\": \"max-params\", \"severity\": \"error\", \"options\": {\"max\": 3}}\n```",
        );
        let result = EslintConverter
            .convert_single_rule(&user_rule("At most 3 params", Some(Severity::Warning)), &judge)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.payload["config"], json!(["warn", {"max": 3}]));
        assert_eq!(EslintConverter.native_rule_id(&result).as_deref(), Some("max-params"));
    }

    #[tokio::test]
    async fn empty_rule_name_declines() {
        let judge = Canned(r#"{"rule_name": "", "severity": "off", "options": null}"#);
        let result = EslintConverter
            .convert_single_rule(&user_rule("kebab-case file names", None), &judge)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn garbage_reply_is_an_error() {
        let judge = Canned("I think no-console would work");
        let err = EslintConverter
            .convert_single_rule(&user_rule("no console", None), &judge)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::MalformedResponse { .. }));

        let err = EslintConverter
            .convert_single_rule(&user_rule("no console", None), &Canned("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::EmptyResponse));
    }

    #[test]
    fn id_match_pattern_is_positional() {
        assert_eq!(
            rule_setting("id-match", "error", json!({"pattern": "^[a-z]+$", "properties": true})),
            json!(["error", "^[a-z]+$", {"properties": true}])
        );
        assert_eq!(
            rule_setting("id-match", "error", json!({"pattern": "^[a-z]+$"})),
            json!(["error", "^[a-z]+$"])
        );
        assert_eq!(rule_setting("no-console", "warn", Value::Null), json!("warn"));
    }

    #[test]
    fn config_collects_rules() {
        let results = vec![
            SingleRuleResult {
                rule_id: "a".into(),
                payload: json!({"rule_name": "no-console", "config": "error"}),
            },
            SingleRuleResult {
                rule_id: "b".into(),
                payload: json!({"rule_name": "max-len", "config": ["warn", {"code": 100}]}),
            },
        ];
        let config = EslintConverter.build_config(&results).unwrap().unwrap();
        assert_eq!(config.filename, ".eslintrc.json");
        let value: Value = serde_json::from_slice(&config.content).unwrap();
        assert_eq!(value["rules"]["no-console"], json!("error"));
        assert_eq!(value["rules"]["max-len"], json!(["warn", {"code": 100}]));
        assert_eq!(value["parser"], json!("@typescript-eslint/parser"));

        assert!(EslintConverter.build_config(&[]).unwrap().is_none());
    }
}
