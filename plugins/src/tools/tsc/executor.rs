use std::path::{Path, PathBuf};

use async_trait::async_trait;
use codepact_core::api::{
    run_command, Capabilities, CommandSpec, ExecuteContext, InstallConfig, RawViolation,
    ToolError, ToolExecutor, ToolOutput,
};
use serde_json::{json, Value};

use super::converter::base_options;
use super::{languages, parser, NAME};
use crate::tools::support::{empty_result, init_package_json, resolve_binary, write_temp_config};

const TYPESCRIPT_VERSION: &str = "^5.0.0";

pub struct TscTool;

impl TscTool {
    fn local_binary(tools_dir: &Path) -> PathBuf {
        tools_dir.join("node_modules").join(".bin").join("tsc")
    }
}

/// A project file that checks exactly `files` with the compiler options from
/// `config`. Configs without `compilerOptions` get the defaults.
pub(super) fn project_config(
    config: &[u8],
    workdir: &Path,
    files: &[String],
) -> Result<Vec<u8>, ToolError> {
    let mut options = base_options();
    if !config.is_empty() {
        let parsed: Value = serde_json::from_slice(config)
            .map_err(|e| ToolError::Config(format!("invalid tsconfig: {e}")))?;
        if let Some(given) = parsed.get("compilerOptions").and_then(Value::as_object) {
            options.extend(given.clone());
        }
    }
    options.insert("noEmit".into(), json!(true));

    let files: Vec<String> = files
        .iter()
        .map(|f| workdir.join(f).display().to_string())
        .collect();
    serde_json::to_vec_pretty(&json!({ "compilerOptions": options, "files": files }))
        .map_err(|e| ToolError::Config(e.to_string()))
}

#[async_trait]
impl ToolExecutor for TscTool {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            languages: languages(),
            autofix: false,
        }
    }

    async fn check_availability(&self, ctx: &ExecuteContext) -> Result<(), ToolError> {
        match resolve_binary(&Self::local_binary(&ctx.tools_dir), "tsc") {
            Some(_) => Ok(()),
            None => Err(ToolError::Unavailable {
                tool: NAME.to_string(),
                reason: format!("tsc not found in {} or PATH", ctx.tools_dir.display()),
            }),
        }
    }

    async fn install(&self, cfg: &InstallConfig) -> Result<(), ToolError> {
        let install_err = |source: anyhow::Error| ToolError::Install {
            tool: NAME.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&cfg.tools_dir).await?;
        let npm = which::which("npm")
            .map_err(|_| install_err(anyhow::anyhow!("npm not found, install Node.js first")))?;
        init_package_json(&cfg.tools_dir).await?;

        tracing::info!(tool = NAME, dir = %cfg.tools_dir.display(), "installing via npm");
        let spec = CommandSpec::new(npm.display().to_string())
            .arg("install")
            .arg(format!("typescript@{TYPESCRIPT_VERSION}"))
            .cwd(&cfg.tools_dir);
        let out = run_command(&spec, cfg.timeout).await?;
        if out.exit_code != 0 {
            return Err(install_err(anyhow::anyhow!(
                "npm install exited with {}: {}",
                out.exit_code,
                out.stderr.trim()
            )));
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &ExecuteContext,
        config: &[u8],
        files: &[String],
    ) -> Result<ToolOutput, ToolError> {
        if files.is_empty() {
            return Ok(empty_result());
        }

        let project = project_config(config, &ctx.workdir, files)?;
        let project_file = write_temp_config(&ctx.tools_dir, "tsconfig-", ".json", &project)?;
        let program = resolve_binary(&Self::local_binary(&ctx.tools_dir), "tsc")
            .map(|bin| bin.display().to_string())
            .unwrap_or_else(|| "tsc".to_string());

        let spec = CommandSpec::new(program)
            .arg("--project")
            .arg(project_file.path().display().to_string())
            .arg("--pretty")
            .arg("false")
            .cwd(&ctx.workdir);
        let output = run_command(&spec, ctx.timeout).await?;
        drop(project_file);

        // diagnostics exit nonzero; silence with a failure status is a crash
        if output.exit_code != 0 && output.stdout.trim().is_empty() {
            return Err(ToolError::Config(format!(
                "tsc exited with {}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(output)
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<RawViolation>, ToolError> {
        Ok(parser::parse(output))
    }
}
