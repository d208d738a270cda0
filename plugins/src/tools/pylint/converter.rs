use std::collections::BTreeMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use codepact_core::api::{
    ConfigFormat, ConvertError, Judge, NativeConfig, RuleConverter, SingleRuleResult, UserRule,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{CONFIG_FILE, NAME};
use crate::tools::support::ask_json;

const PROMPT: &str = r#"You translate Python coding rules into Pylint settings.

Reply with a single JSON object and nothing else:
{"symbol": "<pylint message symbol>", "message_id": "<e.g. C0116>", "options": <object or null>}

Useful messages and their options:
- naming: invalid-name (C0103), disallowed-name (C0104); options variable-rgx, function-rgx, class-rgx, const-rgx, argument-rgx
- docstrings: missing-module-docstring (C0114), missing-class-docstring (C0115), missing-function-docstring (C0116)
- length: line-too-long (C0301), too-many-lines (C0302); options max-line-length, max-module-lines
- imports: multiple-imports (C0410), wrong-import-order (C0411), unused-import (W0611)
- exceptions: bare-except (W0702), broad-except (W0703); option overgeneral-exceptions
- complexity: too-many-branches (R0912), too-many-arguments (R0913), too-many-locals (R0914), too-many-statements (R0915), too-many-nested-blocks (R1702); options max-branches, max-args, max-locals, max-statements, max-nested-blocks
- risky code: dangerous-default-value (W0102), exec-used (W0122), eval-used (W0123)
- unused: unused-variable (W0612), unused-argument (W0613)

When Pylint cannot express the rule, reply with "symbol": "".

"Lines must not exceed 120 characters" -> {"symbol": "line-too-long", "message_id": "C0301", "options": {"max-line-length": 120}}
"Don't use bare except blocks" -> {"symbol": "bare-except", "message_id": "W0702", "options": null}"#;

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    options: Option<Map<String, Value>>,
}

pub struct PylintConverter;

#[async_trait]
impl RuleConverter for PylintConverter {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["python".into(), "py".into()]
    }

    fn llm_description(&self) -> &str {
        "Python quality checks via Pylint: naming, docstrings, line length, complexity limits, imports, bare except, unused code, eval/exec. Cannot check business logic or runtime behaviour."
    }

    fn routing_hints(&self) -> Vec<String> {
        vec![
            "Python naming (snake_case, PascalCase)".into(),
            "docstrings, complexity, unused variables".into(),
            "line length, import order, bare except".into(),
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
        let symbol = reply.symbol.trim();
        if symbol.is_empty() {
            return Ok(None);
        }
        Ok(Some(SingleRuleResult {
            rule_id: rule.id.clone(),
            payload: json!({
                "symbol": symbol,
                "options": reply.options.unwrap_or_default(),
            }),
        }))
    }

    fn build_config(
        &self,
        results: &[SingleRuleResult],
    ) -> Result<Option<NativeConfig>, ConvertError> {
        let mut enabled: Vec<String> = Vec::new();
        let mut sections: BTreeMap<&'static str, BTreeMap<String, String>> = BTreeMap::new();

        for r in results {
            let symbol = r.payload["symbol"]
                .as_str()
                .ok_or_else(|| ConvertError::Payload {
                    rule_id: r.rule_id.clone(),
                    message: "missing symbol".into(),
                })?;
            if !enabled.iter().any(|s| s == symbol) {
                enabled.push(symbol.to_string());
            }
            if let Some(options) = r.payload["options"].as_object() {
                for (key, value) in options {
                    sections
                        .entry(option_section(key))
                        .or_default()
                        .insert(key.clone(), ini_value(value));
                }
            }
        }
        if enabled.is_empty() {
            return Ok(None);
        }

        let mut rc = String::from("[MASTER]\n");
        if let Some(master) = sections.remove("MASTER") {
            write_entries(&mut rc, &master);
        }
        rc.push_str("\n[MESSAGES CONTROL]\ndisable=all\n");
        let _ = writeln!(rc, "enable={}", enabled.join(","));
        for (section, entries) in &sections {
            let _ = writeln!(rc, "\n[{section}]");
            write_entries(&mut rc, entries);
        }

        Ok(Some(NativeConfig {
            filename: CONFIG_FILE.to_string(),
            format: ConfigFormat::Ini,
            content: rc.into_bytes(),
        }))
    }

    fn native_rule_id(&self, result: &SingleRuleResult) -> Option<String> {
        result.payload["symbol"].as_str().map(str::to_string)
    }
}

fn write_entries(out: &mut String, entries: &BTreeMap<String, String>) {
    for (key, value) in entries {
        let _ = writeln!(out, "{key}={value}");
    }
}

/// The pylintrc section an option belongs to.
fn option_section(option: &str) -> &'static str {
    match option {
        "max-line-length" | "max-module-lines" | "indent-string" | "indent-after-paren" => {
            "FORMAT"
        }
        "variable-rgx" | "function-rgx" | "class-rgx" | "const-rgx" | "argument-rgx"
        | "attr-rgx" | "method-rgx" | "module-rgx" | "good-names" | "bad-names"
        | "include-naming-hint" => "BASIC",
        "max-args" | "max-locals" | "max-returns" | "max-branches" | "max-statements"
        | "max-parents" | "max-attributes" | "min-public-methods" | "max-public-methods"
        | "max-bool-expr" | "max-nested-blocks" => "DESIGN",
        "overgeneral-exceptions" => "EXCEPTIONS",
        _ => "MASTER",
    }
}

fn ini_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "yes".into(),
        Value::Bool(false) => "no".into(),
        Value::Array(items) => items.iter().map(ini_value).collect::<Vec<_>>().join(","),
        Value::Null => String::new(),
        other => other.to_string(),
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

    fn result(id: &str, symbol: &str, options: Value) -> SingleRuleResult {
        SingleRuleResult {
            rule_id: id.into(),
            payload: json!({"symbol": symbol, "options": options}),
        }
    }

    #[tokio::test]
    async fn converts_and_declines() {
        let rule = UserRule {
            id: "len".into(),
            say: "Keep lines under 100 characters".into(),
            ..Default::default()
        };
        let converted = PylintConverter
            .convert_single_rule(
                &rule,
                &Canned(r#"{"symbol": "line-too-long", "message_id": "C0301", "options": {"max-line-length": 100}}"#),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(PylintConverter.native_rule_id(&converted).as_deref(), Some("line-too-long"));
        assert_eq!(converted.payload["options"]["max-line-length"], json!(100));

        let declined = PylintConverter
            .convert_single_rule(&rule, &Canned(r#"{"symbol": "", "options": null}"#))
            .await
            .unwrap();
        assert!(declined.is_none());
    }

    #[test]
    fn rc_enables_only_converted_messages() {
        let config = PylintConverter
            .build_config(&[
                result("a", "line-too-long", json!({"max-line-length": 100})),
                result("b", "too-many-arguments", json!({"max-args": 5})),
                result("c", "bare-except", json!({})),
                result("d", "invalid-name", json!({"good-names": ["i", "j", "_"]})),
            ])
            .unwrap()
            .unwrap();
        assert_eq!(config.format, ConfigFormat::Ini);
        let rc = String::from_utf8(config.content).unwrap();
        assert_eq!(
            rc,
            "[MASTER]\n\
             \n[MESSAGES CONTROL]\n\
             disable=all\n\
             enable=line-too-long,too-many-arguments,bare-except,invalid-name\n\
             \n[BASIC]\n\
             good-names=i,j,_\n\
             \n[DESIGN]\n\
             max-args=5\n\
             \n[FORMAT]\n\
             max-line-length=100\n"
        );
    }

    #[test]
    fn nothing_to_enable() {
        assert!(PylintConverter.build_config(&[]).unwrap().is_none());
    }
}
