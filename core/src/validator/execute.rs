use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::change::{numbered_code, Change};
use crate::error::ToolError;
use crate::judge::{
    batch_prompt, pair_prompt, parse_batch_judgments, parse_single_judgment, BatchEntry,
    Confidence, Judge, ResponseFormat,
};
use crate::policy::{PolicyRule, Severity};
use crate::tool::{ExecuteContext, InstallConfig, RawViolation, ToolExecutor, ToolRegistry};

use super::mapping::resolve_rule;

/// Prompt budget when the judge does not describe itself.
const DEFAULT_MAX_PROMPT_CHARS: usize = 30_000;

pub(crate) struct ToolRun<'a> {
    pub registry: &'a ToolRegistry,
    pub ctx: &'a ExecuteContext,
    pub config_dir: &'a Path,
}

impl ToolRun<'_> {
    pub async fn run(
        &self,
        engine: &str,
        rules: &[Arc<PolicyRule>],
        files: &[String],
    ) -> Result<Vec<RawViolation>, ToolError> {
        let executor = self
            .registry
            .get_by_name(engine)
            .map_err(|e| ToolError::Unavailable {
                tool: engine.to_string(),
                reason: e.to_string(),
            })?;

        self.ensure_installed(executor.as_ref()).await?;

        let config = self.config_for(engine, rules).await?;
        let output = executor.execute(self.ctx, &config, files).await?;
        tracing::debug!(
            tool = %engine,
            exit_code = output.exit_code,
            elapsed_ms = output.duration.as_millis() as u64,
            "tool finished"
        );
        executor.parse_output(&output)
    }

    async fn ensure_installed(&self, executor: &dyn ToolExecutor) -> Result<(), ToolError> {
        if let Err(e) = executor.check_availability(self.ctx).await {
            tracing::info!(tool = %executor.name(), reason = %e, "tool not available, installing");
            executor
                .install(&InstallConfig {
                    tools_dir: self.ctx.tools_dir.clone(),
                    timeout: self.ctx.timeout,
                })
                .await?;
        }
        Ok(())
    }

    /// The generated config file when one exists, else the first rule's
    /// check parameters as JSON.
    async fn config_for(&self, engine: &str, rules: &[Arc<PolicyRule>]) -> Result<Vec<u8>, ToolError> {
        if let Some(file) = self.registry.config_file(engine).filter(|f| !f.is_empty()) {
            let path = self.config_dir.join(file);
            match tokio::fs::read(&path).await {
                Ok(data) => {
                    tracing::debug!(tool = %engine, path = %path.display(), "using generated config");
                    return Ok(data);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(ToolError::Io(e)),
            }
        }

        let first = rules
            .first()
            .ok_or_else(|| ToolError::Config(format!("no config available for {engine}")))?;
        let mut params = first.check.tool_params();
        if !first.desc.is_empty() {
            params.insert("description".into(), first.desc.clone().into());
        }
        serde_json::to_vec(&params).map_err(|e| ToolError::Config(e.to_string()))
    }
}

pub(crate) struct JudgeRun<'a> {
    pub judge: &'a dyn Judge,
    pub min_confidence: Confidence,
}

impl JudgeRun<'_> {
    pub async fn pair(&self, rule: &PolicyRule, change: &Change) -> anyhow::Result<Vec<RawViolation>> {
        let Some(code) = numbered_code(&change.diff) else {
            return Ok(Vec::new());
        };

        let prompt = pair_prompt(rule.judge_text(), &change.path, &code);
        let raw = self
            .judge
            .execute(&prompt, ResponseFormat::Json)
            .await
            .with_context(|| format!("judge call failed for {} on {}", rule.id, change.path))?;

        let judgment = parse_single_judgment(&raw);
        if !judgment.is_reportable(self.min_confidence) {
            return Ok(Vec::new());
        }
        Ok(vec![RawViolation {
            file: change.path.clone(),
            line: judgment.line.unwrap_or(0),
            column: 0,
            message: judgment.message(),
            severity: None,
            rule_id: Some(rule.id.clone()),
        }])
    }

    /// One call for every rule and file. An unreadable response yields no
    /// findings rather than an error.
    pub async fn batch(
        &self,
        rules: &[Arc<PolicyRule>],
        changes: &[Change],
        applicable: &BTreeMap<String, Vec<String>>,
    ) -> anyhow::Result<Vec<RawViolation>> {
        let files: Vec<(&str, String)> = changes
            .iter()
            .filter_map(|c| numbered_code(&c.diff).map(|code| (c.path.as_str(), code)))
            .collect();
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<BatchEntry<'_>> = rules
            .iter()
            .map(|r| BatchEntry {
                id: &r.id,
                text: r.judge_text(),
                severity: r.severity.unwrap_or(Severity::Error).as_str(),
            })
            .collect();
        let max_chars = self
            .judge
            .info()
            .map(|i| i.profile.max_prompt_chars)
            .unwrap_or(DEFAULT_MAX_PROMPT_CHARS);
        let prompt = batch_prompt(&entries, &files, max_chars);

        let raw = self
            .judge
            .execute(&prompt, ResponseFormat::Json)
            .await
            .context("batched judge call failed")?;

        let judgments = match parse_batch_judgments(&raw) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!(error = %e, rules = rules.len(), files = files.len(), "discarding malformed judge response");
                return Ok(Vec::new());
            }
        };

        let single_file = (files.len() == 1).then(|| files[0].0);
        let mut out = Vec::new();
        for j in judgments {
            if !j.is_reportable(self.min_confidence) {
                continue;
            }
            let Some(file) = j.file.clone().or_else(|| single_file.map(str::to_string)) else {
                continue;
            };
            if !changes.iter().any(|c| c.path == file) {
                continue;
            }
            let Some(rule) = owning_rule(rules, applicable, j.rule_id.as_deref(), &file) else {
                tracing::debug!(
                    rule_id = ?j.rule_id,
                    file = %file,
                    "dropping judgment outside rule selectors"
                );
                continue;
            };
            out.push(RawViolation {
                file,
                line: j.line.unwrap_or(0),
                column: 0,
                message: j.message(),
                severity: None,
                rule_id: Some(rule.id.clone()),
            });
        }
        Ok(out)
    }
}

/// The rule a batch judgment on `file` belongs to, considering only rules
/// whose selector admits the file. A judgment naming a rule that does not
/// cover the file has no owner.
fn owning_rule<'a>(
    rules: &'a [Arc<PolicyRule>],
    applicable: &BTreeMap<String, Vec<String>>,
    raw_rule_id: Option<&str>,
    file: &str,
) -> Option<&'a Arc<PolicyRule>> {
    let covers = |rule_id: &str| {
        applicable
            .get(rule_id)
            .is_some_and(|files| files.iter().any(|f| f == file))
    };
    if let Some(named) = raw_rule_id.and_then(|id| rules.iter().find(|r| r.id == id.trim())) {
        return covers(&named.id).then_some(named);
    }
    let candidates: Vec<Arc<PolicyRule>> = rules
        .iter()
        .filter(|r| covers(&r.id))
        .cloned()
        .collect();
    let resolved = resolve_rule(&candidates, raw_rule_id)?;
    rules.iter().find(|r| r.id == resolved.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CheckParams;

    fn rule(id: &str) -> Arc<PolicyRule> {
        Arc::new(PolicyRule {
            id: id.into(),
            enabled: true,
            category: String::new(),
            severity: None,
            desc: String::new(),
            when: None,
            check: CheckParams::new(),
            message: String::new(),
        })
    }

    fn applicable() -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([
            ("py-llm-validator".to_string(), vec!["b.py".to_string()]),
            ("any-llm-validator".to_string(), vec!["a.js".to_string(), "b.py".to_string()]),
        ])
    }

    #[test]
    fn unnamed_judgment_goes_to_a_rule_covering_the_file() {
        let rules = [rule("py-llm-validator"), rule("any-llm-validator")];
        let owner = owning_rule(&rules, &applicable(), None, "a.js").unwrap();
        assert_eq!(owner.id, "any-llm-validator");
        let owner = owning_rule(&rules, &applicable(), Some("unknown"), "a.js").unwrap();
        assert_eq!(owner.id, "any-llm-validator");
    }

    #[test]
    fn named_rule_outside_its_selector_has_no_owner() {
        let rules = [rule("py-llm-validator"), rule("any-llm-validator")];
        assert!(owning_rule(&rules, &applicable(), Some("py-llm-validator"), "a.js").is_none());
        let owner = owning_rule(&rules, &applicable(), Some("py-llm-validator"), "b.py").unwrap();
        assert_eq!(owner.id, "py-llm-validator");
    }

    #[test]
    fn file_outside_every_selector_has_no_owner() {
        let rules = [rule("py-llm-validator")];
        assert!(owning_rule(&rules, &applicable(), None, "a.js").is_none());
    }
}
