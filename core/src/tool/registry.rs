use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::change::normalize_language;
use crate::error::RegistryError;

use super::{RuleConverter, ToolExecutor};

#[derive(Clone)]
struct ToolEntry {
    executor: Arc<dyn ToolExecutor>,
    converter: Option<Arc<dyn RuleConverter>>,
    config_file: String,
}

/// Directory of tools by name. Populated once at startup, read for the rest
/// of the process.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, ToolEntry>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its executor's name. A second registration for
    /// the same name is ignored; returns whether this call registered it.
    pub fn register_tool(
        &self,
        executor: Arc<dyn ToolExecutor>,
        converter: Option<Arc<dyn RuleConverter>>,
        config_file: impl Into<String>,
    ) -> bool {
        let name = executor.name().to_string();
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        if tools.contains_key(&name) {
            tracing::warn!(tool = %name, "tool already registered, ignoring duplicate");
            return false;
        }
        tools.insert(
            name.clone(),
            ToolEntry {
                executor,
                converter,
                config_file: config_file.into(),
            },
        );
        tracing::debug!(tool = %name, "registered tool");
        true
    }

    pub fn get_by_name(&self, name: &str) -> Result<Arc<dyn ToolExecutor>, RegistryError> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|e| e.executor.clone())
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn get_converter(&self, name: &str) -> Option<Arc<dyn RuleConverter>> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .and_then(|e| e.converter.clone())
    }

    pub fn config_file(&self, name: &str) -> Option<String> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|e| e.config_file.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Every registered converter, sorted by tool name.
    pub fn converters(&self) -> Vec<Arc<dyn RuleConverter>> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<(String, Arc<dyn RuleConverter>)> = tools
            .iter()
            .filter_map(|(name, e)| e.converter.clone().map(|c| (name.clone(), c)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out.into_iter().map(|(_, c)| c).collect()
    }

    /// Language to tool names, from every tool's declared capabilities.
    /// Computed on each call.
    pub fn build_language_mapping(&self) -> BTreeMap<String, Vec<String>> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        let mut mapping: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, entry) in tools.iter() {
            for lang in entry.executor.capabilities().languages {
                let names = mapping.entry(normalize_language(&lang)).or_default();
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        for names in mapping.values_mut() {
            names.sort();
        }
        mapping
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::tool::{Capabilities, ExecuteContext, InstallConfig, RawViolation, ToolOutput};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct StubTool {
        name: &'static str,
        languages: &'static [&'static str],
    }

    #[async_trait]
    impl ToolExecutor for StubTool {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                languages: self.languages.iter().map(|s| s.to_string()).collect(),
                autofix: false,
            }
        }

        async fn check_availability(&self, _ctx: &ExecuteContext) -> Result<(), ToolError> {
            Ok(())
        }

        async fn install(&self, _cfg: &InstallConfig) -> Result<(), ToolError> {
            Ok(())
        }

        async fn execute(
            &self,
            _ctx: &ExecuteContext,
            _config: &[u8],
            _files: &[String],
        ) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::default())
        }

        fn parse_output(&self, _output: &ToolOutput) -> Result<Vec<RawViolation>, ToolError> {
            Ok(Vec::new())
        }
    }

    fn stub(name: &'static str, languages: &'static [&'static str]) -> Arc<dyn ToolExecutor> {
        Arc::new(StubTool { name, languages })
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let registry = ToolRegistry::new();
        assert!(registry.register_tool(stub("eslint", &["javascript"]), None, ".eslintrc.json"));
        assert!(!registry.register_tool(stub("eslint", &["python"]), None, "other.json"));
        assert_eq!(registry.config_file("eslint").as_deref(), Some(".eslintrc.json"));
        assert_eq!(registry.tool_names(), vec!["eslint"]);
    }

    #[test]
    fn missing_tool_is_an_error_and_missing_converter_is_none() {
        let registry = ToolRegistry::new();
        registry.register_tool(stub("tsc", &["typescript"]), None, "tsconfig.json");
        assert!(matches!(
            registry.get_by_name("pylint"),
            Err(RegistryError::NotFound(name)) if name == "pylint"
        ));
        assert!(registry.get_by_name("tsc").is_ok());
        assert!(registry.get_converter("tsc").is_none());
    }

    #[test]
    fn language_mapping_reflects_current_registrations() {
        let registry = ToolRegistry::new();
        registry.register_tool(stub("eslint", &["javascript", "ts"]), None, ".eslintrc.json");
        registry.register_tool(stub("prettier", &["javascript"]), None, ".prettierrc");
        let mapping = registry.build_language_mapping();
        assert_eq!(mapping["javascript"], vec!["eslint", "prettier"]);
        assert_eq!(mapping["typescript"], vec!["eslint"]);

        registry.register_tool(stub("pylint", &["python"]), None, ".pylintrc");
        assert_eq!(registry.build_language_mapping()["python"], vec!["pylint"]);
    }
}
