use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

use crate::error::ConvertError;
use crate::judge::Judge;
use crate::policy::UserRule;
use crate::tool::{ConversionResult, RuleConverter, SingleRuleResult};

enum Outcome {
    Converted(SingleRuleResult),
    Declined,
    Failed(ConvertError),
}

/// Converts every rule for one tool.
///
/// All conversions run to completion, at most `max_parallel` at a time; a
/// failing rule never cancels its siblings. Each input rule ends up in
/// exactly one of `success_rules` / `failed_rules`, and a config is built
/// from the successes only.
pub async fn convert_rules_for_tool(
    converter: &dyn RuleConverter,
    rules: &[UserRule],
    judge: &dyn Judge,
    max_parallel: usize,
) -> ConversionResult {
    let tool = converter.name().to_string();
    let sem = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut futs = FuturesUnordered::new();

    for (idx, rule) in rules.iter().enumerate() {
        let sem = sem.clone();
        futs.push(async move {
            let outcome = match sem.acquire_owned().await {
                Ok(_permit) => match converter.convert_single_rule(rule, judge).await {
                    Ok(Some(mut result)) => {
                        result.rule_id = rule.id.clone();
                        Outcome::Converted(result)
                    }
                    Ok(None) => Outcome::Declined,
                    Err(e) => Outcome::Failed(e),
                },
                Err(_) => Outcome::Failed(ConvertError::Aborted(
                    "conversion semaphore closed".into(),
                )),
            };
            (idx, outcome)
        });
    }

    let mut outcomes: Vec<(usize, Outcome)> = Vec::with_capacity(rules.len());
    while let Some(done) = futs.next().await {
        outcomes.push(done);
    }
    outcomes.sort_by_key(|(idx, _)| *idx);

    let mut result = ConversionResult {
        tool: tool.clone(),
        ..ConversionResult::default()
    };
    let mut successes = Vec::new();
    for (idx, outcome) in outcomes {
        let rule_id = rules[idx].id.clone();
        match outcome {
            Outcome::Converted(single) => successes.push(single),
            Outcome::Declined => {
                tracing::debug!(tool = %tool, rule_id = %rule_id, "tool cannot express rule");
                result.failed_rules.push(rule_id);
            }
            Outcome::Failed(e) => {
                tracing::warn!(tool = %tool, rule_id = %rule_id, error = %e, "rule conversion failed");
                result.errors.insert(rule_id.clone(), e.to_string());
                result.failed_rules.push(rule_id);
            }
        }
    }

    if successes.is_empty() {
        return result;
    }

    match converter.build_config(&successes) {
        Ok(Some(config)) => {
            for single in &successes {
                if let Some(native) = converter.native_rule_id(single) {
                    result.native_ids.insert(single.rule_id.clone(), native);
                }
            }
            result.success_rules = successes.into_iter().map(|s| s.rule_id).collect();
            result.config = Some(config);
        }
        Ok(None) => {
            tracing::warn!(tool = %tool, rules = successes.len(), "converter produced no config for converted rules");
            result
                .failed_rules
                .extend(successes.into_iter().map(|s| s.rule_id));
        }
        Err(e) => {
            tracing::warn!(tool = %tool, error = %e, "failed to build native config");
            let message = e.to_string();
            for single in successes {
                result.errors.insert(single.rule_id.clone(), message.clone());
                result.failed_rules.push(single.rule_id);
            }
        }
    }
    result
}
