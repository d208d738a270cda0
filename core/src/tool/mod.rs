//! Tool seams: execution adapters, rule converters, and the registry that
//! ties them to a tool name.

mod registry;
pub mod subprocess;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, ToolError};
use crate::judge::Judge;
use crate::policy::UserRule;

pub use registry::ToolRegistry;
pub use subprocess::{run_command, CommandSpec};

/// What a tool declares about itself at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub languages: Vec<String>,
    pub autofix: bool,
}

#[derive(Debug, Clone)]
pub struct InstallConfig {
    pub tools_dir: PathBuf,
    pub timeout: Duration,
}

/// Where and how long a tool may run.
#[derive(Debug, Clone)]
pub struct ExecuteContext {
    pub workdir: PathBuf,
    pub tools_dir: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }
}

/// A finding as reported by a tool, before it is tied to a policy rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawViolation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub severity: Option<String>,
    pub rule_id: Option<String>,
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    async fn check_availability(&self, ctx: &ExecuteContext) -> Result<(), ToolError>;

    async fn install(&self, cfg: &InstallConfig) -> Result<(), ToolError>;

    /// Runs the tool over `files` with `config` in the tool's native format.
    /// A nonzero exit that still produced output is not an error.
    async fn execute(
        &self,
        ctx: &ExecuteContext,
        config: &[u8],
        files: &[String],
    ) -> Result<ToolOutput, ToolError>;

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<RawViolation>, ToolError>;
}

/// Output of converting one rule for one tool. The payload is opaque
/// outside the converter that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleRuleResult {
    pub rule_id: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Json,
    Ini,
    Yaml,
    Xml,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeConfig {
    pub filename: String,
    pub format: ConfigFormat,
    pub content: Vec<u8>,
}

#[async_trait]
pub trait RuleConverter: Send + Sync {
    fn name(&self) -> &str;

    fn supported_languages(&self) -> Vec<String>;

    /// One line describing what the tool can enforce, for routing prompts.
    fn llm_description(&self) -> &str;

    /// Examples of rules the tool handles well.
    fn routing_hints(&self) -> Vec<String> {
        Vec::new()
    }

    /// `Ok(None)` means the tool cannot express the rule; that is a routing
    /// decision, not a failure.
    async fn convert_single_rule(
        &self,
        rule: &UserRule,
        judge: &dyn Judge,
    ) -> Result<Option<SingleRuleResult>, ConvertError>;

    /// Returns `Ok(None)` for an empty slice.
    fn build_config(&self, results: &[SingleRuleResult])
        -> Result<Option<NativeConfig>, ConvertError>;

    /// Native rule identifier carried by a converted payload, if the tool
    /// reports findings under one.
    fn native_rule_id(&self, _result: &SingleRuleResult) -> Option<String> {
        None
    }
}

/// Per-tool outcome of a conversion pass.
#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    pub tool: String,
    pub config: Option<NativeConfig>,
    pub success_rules: Vec<String>,
    pub failed_rules: Vec<String>,
    /// Native rule id per successful user rule id.
    pub native_ids: BTreeMap<String, String>,
    /// Error text for rules that failed with an error rather than a decline.
    pub errors: BTreeMap<String, String>,
}
