use std::path::Path;

use crate::error::ConfigError;

use super::types::{AppConfig, JudgeProvider};

pub const DEFAULT_CONFIG_FILE: &str = "codepact.toml";

pub fn load_default(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut cfg = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound(p.display().to_string()));
            }
            read_config(p)?
        }
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            read_config(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str::<AppConfig>(&s).map_err(ConfigError::Parse)
}

fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("CODEPACT_CONFIG_DIR") {
        if !v.trim().is_empty() {
            cfg.validator.config_dir = v.clone();
            cfg.compiler.output_dir = v;
        }
    }

    if let Ok(v) = std::env::var("CODEPACT_MIN_CONFIDENCE") {
        if !v.trim().is_empty() {
            cfg.validator.min_confidence = v;
        }
    }

    match cfg.judge.provider {
        JudgeProvider::Api(ref mut api_cfg) => {
            if let Ok(v) = std::env::var("CODEPACT_JUDGE_API_KEY") {
                if !v.trim().is_empty() {
                    api_cfg.api_key = v;
                }
            }
            if let Ok(v) = std::env::var("CODEPACT_JUDGE_MODEL") {
                if !v.trim().is_empty() {
                    api_cfg.model = v;
                }
            }
        }
        JudgeProvider::Cli(ref mut cli_cfg) => {
            if let Ok(v) = std::env::var("CODEPACT_JUDGE_MODEL") {
                if !v.trim().is_empty() {
                    cli_cfg.model = Some(v);
                }
            }
        }
        JudgeProvider::Disabled => {}
    }
}

fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if crate::judge::Confidence::from_label(&cfg.validator.min_confidence).is_none() {
        return Err(ConfigError::Validation(format!(
            "validator.min_confidence must be one of low|medium|high, got {:?}",
            cfg.validator.min_confidence
        )));
    }
    if cfg.validator.run_timeout_secs == 0 || cfg.validator.unit_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "validator timeouts must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// Expands `~` and environment variables in a configured path.
pub fn expand_path(raw: &str) -> String {
    shellexpand::full(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
