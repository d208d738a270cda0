use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::{EnforceSettings, Severity};

/// A finding tied to a policy rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub file: String,
    /// 1-based; 0 when the engine did not report a position.
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub severity: Severity,
    pub rule_id: String,
    pub tool_name: String,
    pub execution_ms: u64,
}

/// A unit that failed to run. Its rules count as checked but not passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub rule_ids: Vec<String>,
    pub engine: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub violations: Vec<Violation>,
    pub errors: Vec<ValidationError>,
    pub checked: usize,
    pub passed: usize,
    pub failed: usize,
    /// Enabled rules that were not placed in any unit.
    pub skipped: Vec<String>,
}

impl ValidationResult {
    pub(crate) fn new(run_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            duration_ms: 0,
            violations: Vec::new(),
            errors: Vec::new(),
            checked: 0,
            passed: 0,
            failed: 0,
            skipped: Vec::new(),
        }
    }

    /// Recomputes the counters from the units' rule ids, violations and errors.
    pub(crate) fn tally<'a>(&mut self, executed_rule_ids: impl IntoIterator<Item = &'a str>) {
        let checked: BTreeSet<&str> = executed_rule_ids.into_iter().collect();
        let violated: BTreeSet<&str> = self.violations.iter().map(|v| v.rule_id.as_str()).collect();
        let errored: BTreeSet<&str> = self
            .errors
            .iter()
            .flat_map(|e| e.rule_ids.iter().map(String::as_str))
            .collect();

        self.checked = checked.len();
        self.failed = checked.iter().filter(|id| violated.contains(*id)).count();
        self.passed = checked
            .iter()
            .filter(|id| !violated.contains(*id) && !errored.contains(*id))
            .count();
    }

    /// Whether any violation carries a severity the policy fails on.
    pub fn should_fail(&self, enforce: &EnforceSettings) -> bool {
        self.violations.iter().any(|v| enforce.fails_on(v.severity))
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.errors.is_empty()
    }
}
