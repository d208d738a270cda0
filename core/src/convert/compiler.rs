use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::change::normalize_language;
use crate::config::{expand_path, CompilerConfig};
use crate::error::CompileError;
use crate::judge::Judge;
use crate::policy::check::{DESC_KEY, ENGINE_KEY, RULE_ID_KEY};
use crate::policy::{
    write_policy, CheckParams, CodePolicy, PolicyRule, Selector, Severity, UserPolicy, UserRule,
    LLM_VALIDATOR_ENGINE,
};
use crate::tool::{ConversionResult, ToolRegistry};

use super::driver::convert_rules_for_tool;
use super::routing::route_rules;

pub const CODE_POLICY_FILE: &str = "code-policy.json";

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub output_dir: PathBuf,
    pub max_parallel: usize,
    /// Languages assumed for judge rules that name none.
    pub default_languages: Vec<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(".codepact"),
            max_parallel: (num_cpus::get() / 2).max(1),
            default_languages: vec!["javascript".into(), "typescript".into()],
        }
    }
}

impl CompilerOptions {
    pub fn from_config(cfg: &CompilerConfig) -> Self {
        let defaults = Self::default();
        Self {
            output_dir: PathBuf::from(expand_path(&cfg.output_dir)),
            max_parallel: cfg
                .max_parallel_conversions
                .unwrap_or(defaults.max_parallel)
                .max(1),
            default_languages: if cfg.default_languages.is_empty() {
                defaults.default_languages
            } else {
                cfg.default_languages.clone()
            },
        }
    }
}

/// A rule that was routed to a tool but ended up with the judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub rule_id: String,
    pub tool: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompileResult {
    pub policy: CodePolicy,
    pub generated_files: Vec<PathBuf>,
    pub conversions: Vec<ConversionResult>,
    pub fallbacks: Vec<Fallback>,
    /// Tool-level failures such as unwritable config files.
    pub errors: BTreeMap<String, String>,
}

/// Turns a natural-language [`UserPolicy`] into native tool configs plus a
/// [`CodePolicy`] the validator can run.
pub struct PolicyCompiler {
    registry: Arc<ToolRegistry>,
    judge: Option<Arc<dyn Judge>>,
    opts: CompilerOptions,
}

impl PolicyCompiler {
    pub fn new(
        registry: Arc<ToolRegistry>,
        judge: Option<Arc<dyn Judge>>,
        opts: CompilerOptions,
    ) -> Self {
        Self {
            registry,
            judge,
            opts,
        }
    }

    pub async fn compile(&self, user: &UserPolicy) -> Result<CompileResult, CompileError> {
        let routed_input: Vec<(UserRule, Vec<String>)> = user
            .rules
            .iter()
            .map(|r| (r.clone(), rule_languages(r, user)))
            .collect();
        let routes = route_rules(
            &self.registry,
            self.judge.as_deref(),
            &routed_input,
            self.opts.max_parallel,
        )
        .await;

        // engines per user rule id, in tool-name order
        let mut engines: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        let mut per_tool: BTreeMap<String, Vec<UserRule>> = BTreeMap::new();
        for (rule, tools) in user.rules.iter().zip(&routes) {
            let entry = engines.entry(rule.id.as_str()).or_default();
            if tools.is_empty() {
                entry.push(LLM_VALIDATOR_ENGINE.to_string());
            }
            for tool in tools {
                entry.push(tool.clone());
                per_tool.entry(tool.clone()).or_default().push(rule.clone());
            }
        }

        tokio::fs::create_dir_all(&self.opts.output_dir)
            .await
            .map_err(|source| CompileError::OutputDir {
                path: self.opts.output_dir.display().to_string(),
                source,
            })?;

        let mut result = CompileResult {
            policy: CodePolicy::default(),
            generated_files: Vec::new(),
            conversions: Vec::new(),
            fallbacks: Vec::new(),
            errors: BTreeMap::new(),
        };

        if let Some(judge) = self.judge.as_deref() {
            for (tool, rules) in &per_tool {
                let Some(converter) = self.registry.get_converter(tool) else {
                    continue;
                };
                let mut conversion =
                    convert_rules_for_tool(converter.as_ref(), rules, judge, self.opts.max_parallel)
                        .await;

                if let Some(config) = conversion.config.clone() {
                    match self.write_native_config(&config.filename, &config.content).await {
                        Ok(path) => {
                            tracing::info!(tool = %tool, path = %path.display(), rules = conversion.success_rules.len(), "generated tool config");
                            result.generated_files.push(path);
                        }
                        Err(e) => {
                            tracing::warn!(tool = %tool, error = %e, "failed to write tool config");
                            result.errors.insert(tool.clone(), e.to_string());
                            let moved = std::mem::take(&mut conversion.success_rules);
                            conversion.failed_rules.extend(moved);
                            conversion.config = None;
                            conversion.native_ids.clear();
                        }
                    }
                }

                for rule_id in &conversion.failed_rules {
                    result.fallbacks.push(Fallback {
                        rule_id: rule_id.clone(),
                        tool: tool.clone(),
                        reason: conversion.errors.get(rule_id).cloned(),
                    });
                }
                result.conversions.push(conversion);
            }
        }

        self.apply_fallbacks(&mut engines, &result.fallbacks, &per_tool);

        if !result.fallbacks.is_empty() {
            tracing::info!(count = result.fallbacks.len(), "rules fell back to {LLM_VALIDATOR_ENGINE}");
        }

        result.policy = self.build_policy(user, &engines, &result.conversions);

        let policy_path = self.opts.output_dir.join(CODE_POLICY_FILE);
        write_policy(&policy_path, &result.policy).await?;
        tracing::info!(path = %policy_path.display(), rules = result.policy.rules.len(), "generated code policy");
        result.generated_files.push(policy_path);

        Ok(result)
    }

    /// Replaces a failed tool with the judge engine. Tools that were routed
    /// but never converted (no converter, or no judge) also fall back.
    fn apply_fallbacks(
        &self,
        engines: &mut BTreeMap<&str, Vec<String>>,
        fallbacks: &[Fallback],
        per_tool: &BTreeMap<String, Vec<UserRule>>,
    ) {
        let converted_tools = |tool: &str| {
            self.judge.is_some() && self.registry.get_converter(tool).is_some()
        };
        for (rule_id, list) in engines.iter_mut() {
            list.retain(|engine| {
                if engine == LLM_VALIDATOR_ENGINE {
                    return true;
                }
                let failed = fallbacks
                    .iter()
                    .any(|f| f.rule_id == *rule_id && &f.tool == engine);
                let unconverted = per_tool.contains_key(engine) && !converted_tools(engine);
                !(failed || unconverted)
            });
            if list.is_empty() || fallbacks.iter().any(|f| f.rule_id == *rule_id) {
                if !list.iter().any(|e| e == LLM_VALIDATOR_ENGINE) {
                    list.push(LLM_VALIDATOR_ENGINE.to_string());
                }
            }
        }
    }

    fn build_policy(
        &self,
        user: &UserPolicy,
        engines: &BTreeMap<&str, Vec<String>>,
        conversions: &[ConversionResult],
    ) -> CodePolicy {
        let mut policy = CodePolicy::default();
        for rule in &user.rules {
            let Some(list) = engines.get(rule.id.as_str()) else {
                continue;
            };
            for engine in list {
                let native_id = conversions
                    .iter()
                    .find(|c| &c.tool == engine)
                    .and_then(|c| c.native_ids.get(&rule.id));
                policy
                    .rules
                    .push(self.policy_rule(user, rule, engine, native_id.map(String::as_str)));
            }
        }
        policy
    }

    fn policy_rule(
        &self,
        user: &UserPolicy,
        rule: &UserRule,
        engine: &str,
        native_id: Option<&str>,
    ) -> PolicyRule {
        let mut check = CheckParams::new()
            .with(ENGINE_KEY, engine)
            .with(DESC_KEY, rule.say.as_str());
        if let Some(id) = native_id {
            check.insert(RULE_ID_KEY, id);
        }

        let when = if engine == LLM_VALIDATOR_ENGINE {
            let mut languages = rule_languages(rule, user);
            if languages.is_empty() {
                languages = self.opts.default_languages.clone();
            }
            Some(Selector {
                languages,
                include: rule.include.clone(),
                exclude: rule.exclude.clone(),
            })
        } else if !rule.languages.is_empty() || !rule.include.is_empty() || !rule.exclude.is_empty()
        {
            let supported: Vec<String> = self
                .registry
                .get_converter(engine)
                .map(|c| c.supported_languages())
                .unwrap_or_default()
                .iter()
                .map(|l| normalize_language(l))
                .collect();
            let languages = if supported.is_empty() {
                rule.languages.clone()
            } else {
                rule.languages
                    .iter()
                    .filter(|l| supported.contains(&normalize_language(l)))
                    .cloned()
                    .collect()
            };
            Some(Selector {
                languages,
                include: rule.include.clone(),
                exclude: rule.exclude.clone(),
            })
        } else {
            None
        };

        let desc = if rule.say.trim().is_empty() {
            "Code quality check".to_string()
        } else {
            rule.say.clone()
        };

        PolicyRule {
            id: format!("{}-{}", rule.id, engine),
            enabled: true,
            category: rule.category.clone(),
            severity: Some(
                rule.severity
                    .or(user.defaults.severity)
                    .unwrap_or(Severity::Error),
            ),
            desc,
            when,
            check,
            message: rule.message.clone(),
        }
    }

    async fn write_native_config(&self, filename: &str, content: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.opts.output_dir.join(Path::new(filename));
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }
}

fn rule_languages(rule: &UserRule, user: &UserPolicy) -> Vec<String> {
    if rule.languages.is_empty() {
        user.defaults.languages.clone()
    } else {
        rule.languages.clone()
    }
}
