pub mod check;
mod load;
mod types;

pub use check::{CheckParams, ParamValue};
pub use load::{load_policy, load_user_policy, parse_policy, write_policy};
pub use types::{
    CodePolicy, EnforceSettings, PolicyRule, Selector, Severity, UserDefaults, UserPolicy,
    UserRule,
};

/// Reserved engine name for the natural-language judge.
pub const LLM_VALIDATOR_ENGINE: &str = "llm-validator";
