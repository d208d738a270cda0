use async_trait::async_trait;
use codepact_core::api::{
    ConfigFormat, ConvertError, Judge, NativeConfig, RuleConverter, SingleRuleResult, UserRule,
};
use serde_json::{json, Map, Value};

use super::{languages, CONFIG_FILE, NAME};
use crate::tools::support::ask_json;

/// Compiler options a rule may toggle.
const CHECK_OPTIONS: &[&str] = &[
    "strict",
    "noImplicitAny",
    "strictNullChecks",
    "strictFunctionTypes",
    "strictBindCallApply",
    "noUnusedLocals",
    "noUnusedParameters",
    "noImplicitReturns",
    "noFallthroughCasesInSwitch",
    "noUncheckedIndexedAccess",
    "allowUnreachableCode",
    "allowUnusedLabels",
];

const PROMPT: &str = r#"You translate type-checking rules into tsconfig.json compiler options.

Reply with a single JSON object of compiler options and nothing else. Allowed keys,
all boolean: strict, noImplicitAny, strictNullChecks, strictFunctionTypes,
strictBindCallApply, noUnusedLocals, noUnusedParameters, noImplicitReturns,
noFallthroughCasesInSwitch, noUncheckedIndexedAccess, allowUnreachableCode,
allowUnusedLabels.

When the rule is not about TypeScript type checking, reply with {}.

"No implicit any types allowed" -> {"noImplicitAny": true}
"Report unused variables" -> {"noUnusedLocals": true, "noUnusedParameters": true}
"Use camelCase for variables" -> {}"#;

pub struct TscConverter;

#[async_trait]
impl RuleConverter for TscConverter {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_languages(&self) -> Vec<String> {
        let mut langs = languages();
        langs.push("ts".to_string());
        langs
    }

    fn llm_description(&self) -> &str {
        "TypeScript type checking only: strict modes, implicit any, null checks, unused locals and parameters, implicit returns. Cannot check formatting, naming or runtime behaviour."
    }

    fn routing_hints(&self) -> Vec<String> {
        vec![
            "noImplicitAny, strictNullChecks, strict mode".into(),
            "unused locals or parameters in TypeScript".into(),
            "never naming conventions or formatting".into(),
        ]
    }

    async fn convert_single_rule(
        &self,
        rule: &UserRule,
        judge: &dyn Judge,
    ) -> Result<Option<SingleRuleResult>, ConvertError> {
        let prompt = format!("{PROMPT}\n\nConvert this rule:\n{}", rule.say);
        let reply: Map<String, Value> = ask_json(judge, &prompt).await?;

        let options: Map<String, Value> = reply
            .into_iter()
            .filter(|(key, value)| {
                let known = CHECK_OPTIONS.contains(&key.as_str()) && value.is_boolean();
                if !known {
                    tracing::debug!(tool = NAME, option = %key, "ignoring compiler option");
                }
                known
            })
            .collect();
        if options.is_empty() {
            return Ok(None);
        }
        Ok(Some(SingleRuleResult {
            rule_id: rule.id.clone(),
            payload: json!({ "options": options }),
        }))
    }

    fn build_config(
        &self,
        results: &[SingleRuleResult],
    ) -> Result<Option<NativeConfig>, ConvertError> {
        if results.is_empty() {
            return Ok(None);
        }

        let mut compiler_options = base_options();
        for r in results {
            let options = r.payload["options"]
                .as_object()
                .ok_or_else(|| ConvertError::Payload {
                    rule_id: r.rule_id.clone(),
                    message: "missing options".into(),
                })?;
            for (key, value) in options {
                compiler_options.insert(key.clone(), value.clone());
            }
        }

        let config = json!({ "compilerOptions": compiler_options });
        Ok(Some(NativeConfig {
            filename: CONFIG_FILE.to_string(),
            format: ConfigFormat::Json,
            content: serde_json::to_vec_pretty(&config)?,
        }))
    }
}

/// Options every generated tsconfig starts from.
pub(super) fn base_options() -> Map<String, Value> {
    let base = json!({
        "target": "ES2020",
        "module": "commonjs",
        "lib": ["ES2020"],
        "moduleResolution": "node",
        "esModuleInterop": true,
        "skipLibCheck": true,
        "resolveJsonModule": true,
        "forceConsistentCasingInFileNames": true,
        "strict": true,
        "noUnusedLocals": false,
        "noUnusedParameters": false,
        "noEmit": true,
    });
    match base {
        Value::Object(map) => map,
        _ => Map::new(),
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

    fn user_rule(say: &str) -> UserRule {
        UserRule {
            id: "types".into(),
            say: say.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn keeps_known_boolean_options() {
        let judge = Canned(r#"{"noUnusedLocals": true, "outDir": "dist", "strict": "yes"}"#);
        let result = TscConverter
            .convert_single_rule(&user_rule("Report unused variables"), &judge)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.payload, json!({"options": {"noUnusedLocals": true}}));
        assert_eq!(TscConverter.native_rule_id(&result), None);
    }

    #[tokio::test]
    async fn empty_object_declines() {
        let result = TscConverter
            .convert_single_rule(&user_rule("Use camelCase"), &Canned("{}"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn rule_options_override_the_base() {
        let results = vec![
            SingleRuleResult {
                rule_id: "a".into(),
                payload: json!({"options": {"noUnusedLocals": true}}),
            },
            SingleRuleResult {
                rule_id: "b".into(),
                payload: json!({"options": {"noImplicitReturns": true}}),
            },
        ];
        let config = TscConverter.build_config(&results).unwrap().unwrap();
        assert_eq!(config.filename, "tsconfig.json");
        let value: Value = serde_json::from_slice(&config.content).unwrap();
        let opts = &value["compilerOptions"];
        assert_eq!(opts["noUnusedLocals"], json!(true));
        assert_eq!(opts["noImplicitReturns"], json!(true));
        assert_eq!(opts["noUnusedParameters"], json!(false));
        assert_eq!(opts["noEmit"], json!(true));

        assert!(TscConverter.build_config(&[]).unwrap().is_none());
    }
}
