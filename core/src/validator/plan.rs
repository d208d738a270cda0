use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::change::{matches_selector, Change};
use crate::judge::{JudgeMode, ProviderInfo};
use crate::policy::{CodePolicy, PolicyRule, LLM_VALIDATOR_ENGINE};

use super::unit::ExecutionUnit;

/// Changes a rule applies to: never deleted files, then the rule's selector.
pub fn filter_changes_for_rule<'a>(rule: &PolicyRule, changes: &'a [Change]) -> Vec<&'a Change> {
    changes
        .iter()
        .filter(|c| !c.is_deleted())
        .filter(|c| matches_selector(&c.path, rule.when.as_ref()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct RuleFiles {
    pub rule: Arc<PolicyRule>,
    pub files: Vec<String>,
}

/// Rules routed to one engine and the union of their files.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub rules: Vec<RuleFiles>,
    /// Deduplicated, in first-seen order.
    pub files: Vec<String>,
    /// Filled for the judge bucket only.
    pub changes: Vec<Change>,
}

impl Bucket {
    pub fn rule_ids(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.rule.id.clone()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub buckets: BTreeMap<String, Bucket>,
    /// Enabled rules left out of every bucket, with the reason.
    pub skipped: Vec<(String, SkipReason)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoEngine,
    NoMatchingFiles,
}

impl ExecutionPlan {
    pub fn judge_bucket(&self) -> Option<&Bucket> {
        self.buckets.get(LLM_VALIDATOR_ENGINE)
    }

    pub fn tool_buckets(&self) -> impl Iterator<Item = (&String, &Bucket)> {
        self.buckets
            .iter()
            .filter(|(engine, _)| engine.as_str() != LLM_VALIDATOR_ENGINE)
    }
}

/// Buckets enabled rules by `check.engine`. Disabled rules are dropped
/// silently; rules with no engine or no applicable files are recorded as
/// skipped.
pub fn group_by_engine(policy: &CodePolicy, changes: &[Change]) -> ExecutionPlan {
    let mut plan = ExecutionPlan::default();

    for rule in policy.rules.iter().filter(|r| r.enabled) {
        let Some(engine) = rule.engine() else {
            tracing::debug!(rule_id = %rule.id, "rule has no engine, skipping");
            plan.skipped.push((rule.id.clone(), SkipReason::NoEngine));
            continue;
        };

        let relevant = filter_changes_for_rule(rule, changes);
        if relevant.is_empty() {
            plan.skipped.push((rule.id.clone(), SkipReason::NoMatchingFiles));
            continue;
        }

        let bucket = plan.buckets.entry(engine.to_string()).or_default();
        let keep_changes = engine == LLM_VALIDATOR_ENGINE;
        let mut rule_files = Vec::with_capacity(relevant.len());
        for change in relevant {
            rule_files.push(change.path.clone());
            if !bucket.files.contains(&change.path) {
                bucket.files.push(change.path.clone());
                if keep_changes {
                    bucket.changes.push(change.clone());
                }
            }
        }
        bucket.rules.push(RuleFiles {
            rule: Arc::new(rule.clone()),
            files: rule_files,
        });
    }

    plan
}

/// One tool unit per native bucket; judge units per `info.mode`, which
/// defaults to parallel when absent.
pub fn build_units(plan: &ExecutionPlan, info: Option<&ProviderInfo>) -> Vec<ExecutionUnit> {
    let mut units = Vec::new();

    for (engine, bucket) in plan.tool_buckets() {
        if bucket.rules.is_empty() || bucket.files.is_empty() {
            continue;
        }
        units.push(ExecutionUnit::Tool {
            engine: engine.clone(),
            rules: bucket.rules.iter().map(|r| r.rule.clone()).collect(),
            files: bucket.files.clone(),
        });
    }

    if let Some(bucket) = plan.judge_bucket() {
        let mode = info.map(|i| i.mode).unwrap_or(JudgeMode::ParallelApi);
        units.extend(judge_units(bucket, mode));
    }

    units
}

fn judge_units(bucket: &Bucket, mode: JudgeMode) -> Vec<ExecutionUnit> {
    if bucket.rules.is_empty() || bucket.changes.is_empty() {
        return Vec::new();
    }

    match mode {
        JudgeMode::ParallelApi => {
            let mut units = Vec::new();
            for change in &bucket.changes {
                for rf in &bucket.rules {
                    if rf.files.contains(&change.path) {
                        units.push(ExecutionUnit::JudgePair {
                            rule: rf.rule.clone(),
                            change: change.clone(),
                        });
                    }
                }
            }
            units
        }
        JudgeMode::AgenticSingle => {
            let applicable = bucket
                .rules
                .iter()
                .map(|rf| (rf.rule.id.clone(), rf.files.clone()))
                .collect();
            vec![ExecutionUnit::JudgeBatch {
                rules: bucket.rules.iter().map(|rf| rf.rule.clone()).collect(),
                changes: bucket.changes.clone(),
                applicable,
            }]
        }
    }
}

/// Rule ids that appear in at least one unit.
pub fn unit_rule_ids(units: &[ExecutionUnit]) -> BTreeSet<String> {
    units.iter().flat_map(|u| u.rule_ids()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeStatus;
    use crate::judge::ProviderProfile;
    use crate::policy::{CheckParams, Selector};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn rule(id: &str, engine: Option<&str>, languages: &[&str]) -> PolicyRule {
        let mut check = CheckParams::new();
        if let Some(e) = engine {
            check.insert("engine", e);
        }
        PolicyRule {
            id: id.into(),
            enabled: true,
            category: String::new(),
            severity: None,
            desc: format!("desc of {id}"),
            when: (!languages.is_empty()).then(|| Selector {
                languages: languages.iter().map(|s| s.to_string()).collect(),
                ..Selector::default()
            }),
            check,
            message: String::new(),
        }
    }

    fn changes() -> Vec<Change> {
        vec![
            Change::new("src/a.js", ChangeStatus::Modified, "+console.log(1)"),
            Change::new("src/b.py", ChangeStatus::Added, "+print(1)"),
            Change::new("src/c.js", ChangeStatus::Deleted, ""),
            Change::new("src/d.js", ChangeStatus::Added, "+let x = 1"),
        ]
    }

    fn agentic() -> ProviderInfo {
        ProviderInfo {
            mode: JudgeMode::AgenticSingle,
            profile: ProviderProfile {
                max_prompt_chars: 100_000,
                default_timeout: Duration::from_secs(300),
            },
        }
    }

    #[test]
    fn grouping_respects_selector_and_skips() {
        let mut disabled = rule("off", Some("eslint"), &[]);
        disabled.enabled = false;
        let policy = CodePolicy {
            rules: vec![
                rule("js-1", Some("eslint"), &["javascript"]),
                rule("js-2", Some("eslint"), &["js"]),
                rule("py-1", Some("pylint"), &["python"]),
                rule("none", None, &[]),
                rule("go-1", Some("golangci-lint"), &["go"]),
                disabled,
            ],
            ..CodePolicy::default()
        };
        let plan = group_by_engine(&policy, &changes());

        let eslint = &plan.buckets["eslint"];
        assert_eq!(eslint.rule_ids(), vec!["js-1", "js-2"]);
        assert_eq!(eslint.files, vec!["src/a.js", "src/d.js"]);
        assert!(eslint.changes.is_empty());
        assert_eq!(plan.buckets["pylint"].files, vec!["src/b.py"]);
        assert_eq!(
            plan.skipped,
            vec![
                ("none".to_string(), SkipReason::NoEngine),
                ("go-1".to_string(), SkipReason::NoMatchingFiles),
            ]
        );
        assert!(!plan.buckets.contains_key("golangci-lint"));
        assert!(plan.buckets.values().all(|b| b.rules.iter().all(|r| r.rule.id != "off")));
    }

    #[test]
    fn grouping_is_deterministic() {
        let policy = CodePolicy {
            rules: vec![
                rule("a", Some("llm-validator"), &[]),
                rule("b", Some("eslint"), &[]),
            ],
            ..CodePolicy::default()
        };
        let first = group_by_engine(&policy, &changes());
        let second = group_by_engine(&policy, &changes());
        let shape = |p: &ExecutionPlan| {
            p.buckets
                .iter()
                .map(|(k, b)| (k.clone(), b.rule_ids(), b.files.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&first), shape(&second));
    }

    #[test]
    fn parallel_mode_builds_one_unit_per_pair() {
        let policy = CodePolicy {
            rules: vec![
                rule("j1", Some("llm-validator"), &[]),
                rule("j2", Some("llm-validator"), &[]),
            ],
            ..CodePolicy::default()
        };
        let plan = group_by_engine(&policy, &changes());
        assert_eq!(plan.judge_bucket().map(|b| b.changes.len()), Some(3));

        let units = build_units(&plan, None);
        assert_eq!(units.len(), 2 * 3);
        assert!(units.iter().all(|u| matches!(u, ExecutionUnit::JudgePair { .. })));
    }

    #[test]
    fn agentic_mode_builds_a_single_unit() {
        let policy = CodePolicy {
            rules: vec![
                rule("j1", Some("llm-validator"), &[]),
                rule("j2", Some("llm-validator"), &["python"]),
                rule("t1", Some("eslint"), &[]),
            ],
            ..CodePolicy::default()
        };
        let plan = group_by_engine(&policy, &changes());
        let units = build_units(&plan, Some(&agentic()));

        assert_eq!(units.len(), 2);
        let batch = units
            .iter()
            .find(|u| matches!(u, ExecutionUnit::JudgeBatch { .. }))
            .unwrap();
        assert_eq!(batch.rule_ids(), vec!["j1", "j2"]);
        assert_eq!(batch.files().len(), 3);
        if let ExecutionUnit::JudgeBatch { applicable, .. } = batch {
            assert_eq!(applicable["j2"], vec!["src/b.py"]);
        }
    }

    #[test]
    fn empty_judge_bucket_yields_no_units() {
        let plan = group_by_engine(&CodePolicy::default(), &changes());
        assert!(build_units(&plan, Some(&agentic())).is_empty());
        assert!(build_units(&plan, None).is_empty());
    }
}
