//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `codepact_core::api` instead of reaching into internal modules.

pub use crate::change::{collect_changes, Change, ChangeScope, ChangeStatus};
pub use crate::config::{
    expand_path, load_default, AppConfig, ApiJudgeConfig, CliJudgeConfig, JudgeProvider,
    LoggingConfig, DEFAULT_CONFIG_FILE,
};
pub use crate::convert::{
    CompileResult, CompilerOptions, Fallback, PolicyCompiler, CODE_POLICY_FILE,
};
pub use crate::error::{
    CliError, CompileError, ConfigError, ConvertError, PolicyError, ToolError, ValidateError,
};
pub use crate::judge::{
    Confidence, Judge, JudgeMode, ProviderInfo, ProviderProfile, ResponseFormat,
};
pub use crate::policy::{
    load_policy, load_user_policy, CodePolicy, PolicyRule, Severity, UserPolicy, UserRule,
    LLM_VALIDATOR_ENGINE,
};
pub use crate::tool::{
    run_command, Capabilities, CommandSpec, ConfigFormat, ExecuteContext, InstallConfig,
    NativeConfig, RawViolation, RuleConverter, SingleRuleResult, ToolExecutor, ToolOutput,
    ToolRegistry,
};
pub use crate::validator::{
    ValidationError, ValidationResult, Validator, ValidatorOptions, Violation,
};
