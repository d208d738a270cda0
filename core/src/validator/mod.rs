//! Validation orchestrator.
//!
//! A run filters enabled rules against the change set, buckets them by
//! engine, turns buckets into execution units, runs the units concurrently
//! under a bound, and maps every raw finding back to a policy rule.

mod execute;
mod mapping;
mod plan;
mod result;
mod unit;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use uuid::Uuid;

use crate::change::Change;
use crate::config::{expand_path, ValidatorConfig};
use crate::error::ValidateError;
use crate::judge::{Confidence, Judge};
use crate::policy::CodePolicy;
use crate::tool::{ExecuteContext, RawViolation, ToolRegistry};

use execute::{JudgeRun, ToolRun};

pub use mapping::{map_violations, resolve_rule};
pub use plan::{
    build_units, filter_changes_for_rule, group_by_engine, unit_rule_ids, Bucket, ExecutionPlan,
    RuleFiles, SkipReason,
};
pub use result::{ValidationError, ValidationResult, Violation};
pub use unit::ExecutionUnit;

const MAX_PARALLEL_UNITS: usize = 8;

#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    pub workdir: PathBuf,
    /// Where generated native configs live.
    pub config_dir: PathBuf,
    pub tools_dir: PathBuf,
    /// Clamped to 1..=8 either way.
    pub max_parallel_units: Option<usize>,
    pub run_timeout: Duration,
    pub unit_timeout: Duration,
    pub min_confidence: Confidence,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            config_dir: PathBuf::from(".codepact"),
            tools_dir: PathBuf::from(expand_path("~/.codepact/tools")),
            max_parallel_units: None,
            run_timeout: Duration::from_secs(600),
            unit_timeout: Duration::from_secs(120),
            min_confidence: Confidence::Medium,
        }
    }
}

impl ValidatorOptions {
    pub fn from_config(cfg: &ValidatorConfig, workdir: PathBuf) -> Self {
        let config_dir = PathBuf::from(expand_path(&cfg.config_dir));
        Self {
            config_dir: if config_dir.is_absolute() {
                config_dir
            } else {
                workdir.join(config_dir)
            },
            workdir,
            tools_dir: PathBuf::from(expand_path(&cfg.tools_dir)),
            max_parallel_units: cfg.max_parallel_units,
            run_timeout: Duration::from_secs(cfg.run_timeout_secs),
            unit_timeout: Duration::from_secs(cfg.unit_timeout_secs),
            min_confidence: Confidence::from_label(&cfg.min_confidence)
                .unwrap_or(Confidence::Medium),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.max_parallel_units
            .unwrap_or_else(num_cpus::get)
            .clamp(1, MAX_PARALLEL_UNITS)
    }
}

struct UnitReport {
    rule_ids: Vec<String>,
    engine: String,
    violations: Vec<Violation>,
    error: Option<String>,
}

pub struct Validator {
    policy: CodePolicy,
    registry: Arc<ToolRegistry>,
    judge: Option<Arc<dyn Judge>>,
    opts: ValidatorOptions,
}

impl Validator {
    pub fn new(policy: CodePolicy, registry: Arc<ToolRegistry>) -> Self {
        Self {
            policy,
            registry,
            judge: None,
            opts: ValidatorOptions::default(),
        }
    }

    pub fn with_judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn with_options(mut self, opts: ValidatorOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn policy(&self) -> &CodePolicy {
        &self.policy
    }

    /// Groups and plans without executing anything.
    pub fn plan(&self, changes: &[Change]) -> (ExecutionPlan, Vec<ExecutionUnit>) {
        let plan = group_by_engine(&self.policy, changes);
        let info = self.judge.as_ref().and_then(|j| j.info());
        let units = build_units(&plan, info.as_ref());
        (plan, units)
    }

    pub async fn validate(&self, changes: &[Change]) -> Result<ValidationResult, ValidateError> {
        if self.policy.rules.is_empty() {
            return Err(ValidateError::EmptyPolicy);
        }

        let started = Instant::now();
        let mut result = ValidationResult::new(Uuid::new_v4().to_string(), Utc::now());

        let (plan, units) = self.plan(changes);
        self.check_plan(&plan)?;
        result.skipped = plan.skipped.iter().map(|(id, _)| id.clone()).collect();

        let executed = unit_rule_ids(&units);
        tracing::info!(
            run_id = %result.run_id,
            rules = self.policy.rules.len(),
            changes = changes.len(),
            units = units.len(),
            skipped = result.skipped.len(),
            "starting validation"
        );

        let deadline = started + self.opts.run_timeout;
        let sem = Arc::new(Semaphore::new(self.opts.concurrency()));
        let mut futs = FuturesUnordered::new();
        for unit in units {
            let sem = sem.clone();
            futs.push(async move {
                match sem.acquire_owned().await {
                    Ok(_permit) => self.run_unit(unit, deadline).await,
                    Err(_) => UnitReport {
                        rule_ids: unit.rule_ids(),
                        engine: unit.engine_name().to_string(),
                        violations: Vec::new(),
                        error: Some("unit semaphore closed".into()),
                    },
                }
            });
        }

        while let Some(report) = futs.next().await {
            if let Some(message) = report.error {
                result.errors.push(ValidationError {
                    rule_ids: report.rule_ids,
                    engine: report.engine,
                    message,
                });
            }
            result.violations.extend(report.violations);
        }

        result.tally(executed.iter().map(String::as_str));
        result.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            run_id = %result.run_id,
            checked = result.checked,
            passed = result.passed,
            failed = result.failed,
            violations = result.violations.len(),
            errors = result.errors.len(),
            elapsed_ms = result.duration_ms,
            "validation finished"
        );
        Ok(result)
    }

    /// Errors that make any partial result meaningless.
    fn check_plan(&self, plan: &ExecutionPlan) -> Result<(), ValidateError> {
        for (engine, _) in plan.tool_buckets() {
            if !self.registry.contains(engine) {
                tracing::error!(engine = %engine, "policy routes rules to an unregistered engine");
                return Err(ValidateError::UnknownEngine {
                    engine: engine.clone(),
                });
            }
        }
        if let Some(bucket) = plan.judge_bucket() {
            if self.judge.is_none() && !bucket.rules.is_empty() {
                tracing::error!("policy has judge rules but no judge is configured");
                return Err(ValidateError::MissingJudge {
                    rule_ids: bucket.rule_ids(),
                });
            }
        }
        Ok(())
    }

    async fn run_unit(&self, unit: ExecutionUnit, deadline: Instant) -> UnitReport {
        let engine = unit.engine_name().to_string();
        let rule_ids = unit.rule_ids();
        let unit_deadline = deadline.min(Instant::now() + self.opts.unit_timeout);
        let started = Instant::now();
        tracing::debug!(engine = %engine, kind = unit.kind(), rules = ?rule_ids, files = unit.files().len(), "running unit");

        let outcome = tokio::time::timeout_at(unit_deadline, self.execute_unit(&unit)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let (raw, error) = match outcome {
            Ok(Ok(raw)) => (raw, None),
            Ok(Err(e)) => (Vec::new(), Some(format!("{e:#}"))),
            Err(_) => (
                Vec::new(),
                Some(format!("unit timed out after {elapsed_ms}ms")),
            ),
        };
        if let Some(e) = &error {
            tracing::warn!(engine = %engine, rules = ?rule_ids, elapsed_ms, error = %e, "unit failed");
        }

        UnitReport {
            violations: map_violations(unit.rules(), raw, &engine, elapsed_ms),
            rule_ids,
            engine,
            error,
        }
    }

    async fn execute_unit(&self, unit: &ExecutionUnit) -> anyhow::Result<Vec<RawViolation>> {
        match unit {
            ExecutionUnit::Tool {
                engine,
                rules,
                files,
            } => {
                let ctx = ExecuteContext {
                    workdir: self.opts.workdir.clone(),
                    tools_dir: self.opts.tools_dir.clone(),
                    timeout: self.opts.unit_timeout,
                };
                let run = ToolRun {
                    registry: &self.registry,
                    ctx: &ctx,
                    config_dir: &self.opts.config_dir,
                };
                Ok(run.run(engine, rules, files).await?)
            }
            ExecutionUnit::JudgePair { rule, change } => self.judge_run()?.pair(rule, change).await,
            ExecutionUnit::JudgeBatch {
                rules,
                changes,
                applicable,
            } => self.judge_run()?.batch(rules, changes, applicable).await,
        }
    }

    fn judge_run(&self) -> anyhow::Result<JudgeRun<'_>> {
        let judge = self
            .judge
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no judge configured"))?;
        Ok(JudgeRun {
            judge,
            min_confidence: self.opts.min_confidence,
        })
    }
}
