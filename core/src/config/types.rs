use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub validator: ValidatorConfig,

    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub judge: JudgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub file_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    #[serde(default = "default_tools_dir")]
    pub tools_dir: String,

    #[serde(default)]
    pub max_parallel_units: Option<usize>,

    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    #[serde(default = "default_unit_timeout_secs")]
    pub unit_timeout_secs: u64,

    #[serde(default = "default_min_confidence")]
    pub min_confidence: String,
}

fn default_config_dir() -> String {
    ".codepact".to_string()
}

fn default_tools_dir() -> String {
    "~/.codepact/tools".to_string()
}

fn default_run_timeout_secs() -> u64 {
    600
}

fn default_unit_timeout_secs() -> u64 {
    120
}

fn default_min_confidence() -> String {
    "medium".to_string()
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            tools_dir: default_tools_dir(),
            max_parallel_units: None,
            run_timeout_secs: default_run_timeout_secs(),
            unit_timeout_secs: default_unit_timeout_secs(),
            min_confidence: default_min_confidence(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default = "default_config_dir")]
    pub output_dir: String,

    #[serde(default)]
    pub max_parallel_conversions: Option<usize>,

    #[serde(default = "default_languages")]
    pub default_languages: Vec<String>,
}

fn default_languages() -> Vec<String> {
    vec!["javascript".to_string(), "typescript".to_string()]
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            output_dir: default_config_dir(),
            max_parallel_conversions: None,
            default_languages: default_languages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    #[serde(default = "default_judge_provider")]
    #[serde(flatten)]
    pub provider: JudgeProvider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum JudgeProvider {
    #[serde(rename = "cli")]
    Cli(CliJudgeConfig),
    #[serde(rename = "api")]
    Api(ApiJudgeConfig),
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliJudgeConfig {
    #[serde(default = "default_judge_command")]
    pub command: String,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_judge_command() -> String {
    "claude".to_string()
}

impl Default for CliJudgeConfig {
    fn default() -> Self {
        Self {
            command: default_judge_command(),
            model: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiJudgeConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_api_model")]
    pub model: String,

    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_timeout_ms() -> u64 {
    60_000
}

impl Default for ApiJudgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            api_key: String::new(),
            model: default_api_model(),
            timeout_ms: default_api_timeout_ms(),
        }
    }
}

fn default_judge_provider() -> JudgeProvider {
    JudgeProvider::Cli(CliJudgeConfig::default())
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            provider: default_judge_provider(),
        }
    }
}
