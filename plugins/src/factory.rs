use std::sync::Arc;

use anyhow::Result;

use codepact_core::api::{AppConfig, Judge, JudgeProvider, ToolRegistry};

use crate::judge::{ApiJudge, CliJudge};
use crate::tools::{
    eslint, pylint, tsc, EslintConverter, EslintTool, PylintConverter, PylintTool, TscConverter,
    TscTool,
};

/// Registry with every built-in tool.
pub fn build_registry() -> Arc<ToolRegistry> {
    let registry = ToolRegistry::new();
    registry.register_tool(
        Arc::new(EslintTool),
        Some(Arc::new(EslintConverter)),
        eslint::CONFIG_FILE,
    );
    registry.register_tool(
        Arc::new(PylintTool),
        Some(Arc::new(PylintConverter)),
        pylint::CONFIG_FILE,
    );
    registry.register_tool(Arc::new(TscTool), Some(Arc::new(TscConverter)), tsc::CONFIG_FILE);
    Arc::new(registry)
}

pub fn build_judge(cfg: &AppConfig) -> Result<Option<Arc<dyn Judge>>> {
    match &cfg.judge.provider {
        JudgeProvider::Cli(cli_cfg) => Ok(Some(Arc::new(CliJudge::new(cli_cfg)))),
        JudgeProvider::Api(api_cfg) => {
            if api_cfg.api_key.is_empty() {
                tracing::warn!(base_url = %api_cfg.base_url, "judge api key is empty");
            }
            Ok(Some(Arc::new(ApiJudge::new(api_cfg)?)))
        }
        JudgeProvider::Disabled => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codepact_core::api::{ApiJudgeConfig, JudgeMode};

    #[test]
    fn registry_has_builtin_tools() {
        let registry = build_registry();
        assert_eq!(registry.tool_names(), vec!["eslint", "pylint", "tsc"]);
        assert_eq!(registry.config_file("pylint").as_deref(), Some(".pylintrc"));
        let mapping = registry.build_language_mapping();
        assert_eq!(mapping.get("python"), Some(&vec!["pylint".to_string()]));
        assert_eq!(
            mapping.get("typescript"),
            Some(&vec!["eslint".to_string(), "tsc".to_string()])
        );
        assert_eq!(mapping.get("javascript"), Some(&vec!["eslint".to_string()]));
    }

    #[test]
    fn judge_follows_provider() {
        let mut cfg = AppConfig::default();
        cfg.judge.provider = JudgeProvider::Disabled;
        assert!(build_judge(&cfg).unwrap().is_none());

        cfg.judge.provider = JudgeProvider::Api(ApiJudgeConfig::default());
        let judge = build_judge(&cfg).unwrap().unwrap();
        assert_eq!(judge.info().unwrap().mode, JudgeMode::ParallelApi);
    }
}
