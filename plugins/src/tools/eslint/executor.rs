use std::path::{Path, PathBuf};

use async_trait::async_trait;
use codepact_core::api::{
    run_command, Capabilities, CommandSpec, ExecuteContext, InstallConfig, RawViolation,
    ToolError, ToolExecutor, ToolOutput,
};

use super::{languages, parser, NAME};
use crate::tools::support::{empty_result, init_package_json, resolve_binary, write_temp_config};

const ESLINT_VERSION: &str = "^8.0.0";
const TS_PARSER: &str = "@typescript-eslint/parser";

pub struct EslintTool;

impl EslintTool {
    fn local_binary(tools_dir: &Path) -> PathBuf {
        tools_dir.join("node_modules").join(".bin").join("eslint")
    }

    fn parser_dir(tools_dir: &Path) -> PathBuf {
        tools_dir
            .join("node_modules")
            .join("@typescript-eslint")
            .join("parser")
    }

    /// The eslint binary plus any leading arguments (`npx eslint@8`).
    fn command(tools_dir: &Path) -> (String, Vec<String>) {
        match resolve_binary(&Self::local_binary(tools_dir), "eslint") {
            Some(bin) => (bin.display().to_string(), Vec::new()),
            None => ("npx".to_string(), vec!["eslint@8".to_string()]),
        }
    }
}

#[async_trait]
impl ToolExecutor for EslintTool {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            languages: languages(),
            autofix: true,
        }
    }

    async fn check_availability(&self, ctx: &ExecuteContext) -> Result<(), ToolError> {
        let binary = resolve_binary(&Self::local_binary(&ctx.tools_dir), "eslint");
        let reason = match (binary, Self::parser_dir(&ctx.tools_dir).is_dir()) {
            (Some(_), true) => return Ok(()),
            (Some(_), false) => format!("{TS_PARSER} not installed"),
            (None, _) => format!(
                "eslint not found in {} or PATH",
                ctx.tools_dir.display()
            ),
        };
        Err(ToolError::Unavailable {
            tool: NAME.to_string(),
            reason,
        })
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
            .arg(format!("eslint@{ESLINT_VERSION}"))
            .arg(TS_PARSER)
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

        let config_file = write_temp_config(&ctx.tools_dir, "eslintrc-", ".json", config)?;
        let (program, mut args) = Self::command(&ctx.tools_dir);
        args.extend([
            "--no-eslintrc".to_string(),
            "-c".to_string(),
            config_file.path().display().to_string(),
            "--format".to_string(),
            "json".to_string(),
        ]);
        args.extend(files.iter().cloned());

        let spec = CommandSpec::new(program)
            .args(args)
            .cwd(&ctx.workdir)
            .env("ESLINT_USE_FLAT_CONFIG", "false")
            // resolve the parser from the tools install
            .env("NODE_PATH", ctx.tools_dir.join("node_modules").display().to_string());
        let output = run_command(&spec, ctx.timeout).await?;
        drop(config_file);

        // exit 1 means findings; anything above is a crash or bad config
        if output.exit_code > 1 && output.stdout.trim().is_empty() {
            return Err(ToolError::Config(format!(
                "eslint exited with {}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(output)
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<RawViolation>, ToolError> {
        parser::parse(output)
    }
}
