use std::collections::BTreeMap;
use std::sync::Arc;

use crate::change::Change;
use crate::policy::{PolicyRule, LLM_VALIDATOR_ENGINE};

/// The smallest batch of (engine, rules, files) dispatched as one task.
#[derive(Debug, Clone)]
pub enum ExecutionUnit {
    /// One native tool invocation covering every rule routed to the tool.
    Tool {
        engine: String,
        rules: Vec<Arc<PolicyRule>>,
        files: Vec<String>,
    },
    /// One judge call for one rule against one file.
    JudgePair {
        rule: Arc<PolicyRule>,
        change: Change,
    },
    /// One judge call for every judge rule against every judge file.
    JudgeBatch {
        rules: Vec<Arc<PolicyRule>>,
        changes: Vec<Change>,
        /// Files each rule's selector admits, by rule id.
        applicable: BTreeMap<String, Vec<String>>,
    },
}

impl ExecutionUnit {
    pub fn rules(&self) -> &[Arc<PolicyRule>] {
        match self {
            ExecutionUnit::Tool { rules, .. } | ExecutionUnit::JudgeBatch { rules, .. } => rules,
            ExecutionUnit::JudgePair { rule, .. } => std::slice::from_ref(rule),
        }
    }

    pub fn rule_ids(&self) -> Vec<String> {
        self.rules().iter().map(|r| r.id.clone()).collect()
    }

    pub fn engine_name(&self) -> &str {
        match self {
            ExecutionUnit::Tool { engine, .. } => engine,
            ExecutionUnit::JudgePair { .. } | ExecutionUnit::JudgeBatch { .. } => {
                LLM_VALIDATOR_ENGINE
            }
        }
    }

    pub fn files(&self) -> Vec<String> {
        match self {
            ExecutionUnit::Tool { files, .. } => files.clone(),
            ExecutionUnit::JudgePair { change, .. } => vec![change.path.clone()],
            ExecutionUnit::JudgeBatch { changes, .. } => {
                changes.iter().map(|c| c.path.clone()).collect()
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionUnit::Tool { .. } => "tool",
            ExecutionUnit::JudgePair { .. } => "judge_pair",
            ExecutionUnit::JudgeBatch { .. } => "judge_batch",
        }
    }
}
