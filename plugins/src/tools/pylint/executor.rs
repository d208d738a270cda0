use std::path::{Path, PathBuf};

use async_trait::async_trait;
use codepact_core::api::{
    run_command, Capabilities, CommandSpec, ExecuteContext, InstallConfig, RawViolation,
    ToolError, ToolExecutor, ToolOutput,
};

use super::{parser, NAME};
use crate::tools::support::{empty_result, resolve_binary, write_temp_config};

const VENV_DIR: &str = "pylint-venv";

pub struct PylintTool;

impl PylintTool {
    fn venv_bin(tools_dir: &Path, name: &str) -> PathBuf {
        let venv = tools_dir.join(VENV_DIR);
        if cfg!(windows) {
            venv.join("Scripts").join(format!("{name}.exe"))
        } else {
            venv.join("bin").join(name)
        }
    }

    fn python() -> Option<PathBuf> {
        which::which("python3").or_else(|_| which::which("python")).ok()
    }
}

#[async_trait]
impl ToolExecutor for PylintTool {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            languages: vec!["python".into()],
            autofix: false,
        }
    }

    async fn check_availability(&self, ctx: &ExecuteContext) -> Result<(), ToolError> {
        match resolve_binary(&Self::venv_bin(&ctx.tools_dir, "pylint"), "pylint") {
            Some(_) => Ok(()),
            None => Err(ToolError::Unavailable {
                tool: NAME.to_string(),
                reason: format!("pylint not found in {} or PATH", ctx.tools_dir.display()),
            }),
        }
    }

    /// Installs pylint into a virtualenv under the tools directory.
    async fn install(&self, cfg: &InstallConfig) -> Result<(), ToolError> {
        let install_err = |msg: String| ToolError::Install {
            tool: NAME.to_string(),
            source: anyhow::anyhow!(msg),
        };

        tokio::fs::create_dir_all(&cfg.tools_dir).await?;
        let python = Self::python()
            .ok_or_else(|| install_err("python not found, install Python 3.8+ first".into()))?;

        let venv = cfg.tools_dir.join(VENV_DIR);
        let pip = Self::venv_bin(&cfg.tools_dir, "pip");
        if venv.is_dir() && !pip.is_file() {
            tracing::warn!(venv = %venv.display(), "removing incomplete virtualenv");
            tokio::fs::remove_dir_all(&venv).await?;
        }

        if !venv.is_dir() {
            let spec = CommandSpec::new(python.display().to_string())
                .args(["-m", "venv"])
                .arg(venv.display().to_string());
            let out = run_command(&spec, cfg.timeout).await?;
            if out.exit_code != 0 {
                let detail = if out.stderr.trim().is_empty() {
                    out.stdout.trim()
                } else {
                    out.stderr.trim()
                };
                if detail.contains("ensurepip") || detail.contains("python3-venv") {
                    return Err(install_err(
                        "python3-venv is missing (Debian/Ubuntu: apt install python3-venv)".into(),
                    ));
                }
                return Err(install_err(format!("venv creation failed: {detail}")));
            }
        }

        if !pip.is_file() {
            let spec = CommandSpec::new(Self::venv_bin(&cfg.tools_dir, "python").display().to_string())
                .args(["-m", "ensurepip", "--upgrade"]);
            let out = run_command(&spec, cfg.timeout).await?;
            if out.exit_code != 0 {
                return Err(install_err(format!("ensurepip failed: {}", out.stderr.trim())));
            }
        }

        tracing::info!(tool = NAME, venv = %venv.display(), "installing via pip");
        let spec = CommandSpec::new(pip.display().to_string()).args(["install", "pylint"]);
        let out = run_command(&spec, cfg.timeout).await?;
        if out.exit_code != 0 {
            return Err(install_err(format!("pip install failed: {}", out.stderr.trim())));
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

        let program = resolve_binary(&Self::venv_bin(&ctx.tools_dir, "pylint"), "pylint")
            .ok_or_else(|| ToolError::Unavailable {
                tool: NAME.to_string(),
                reason: "pylint binary disappeared".into(),
            })?;
        let rcfile = write_temp_config(&ctx.tools_dir, "pylintrc-", "", config)?;

        let spec = CommandSpec::new(program.display().to_string())
            .arg(format!("--rcfile={}", rcfile.path().display()))
            .arg("--output-format=json")
            .args(files.iter().cloned())
            .cwd(&ctx.workdir);
        let output = run_command(&spec, ctx.timeout).await?;
        drop(rcfile);

        // pylint's exit code is a bit mask; 32 is a usage error
        if output.exit_code & 32 != 0 {
            return Err(ToolError::Config(format!(
                "pylint usage error: {}",
                output.stderr.trim()
            )));
        }
        Ok(output)
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<RawViolation>, ToolError> {
        parser::parse(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn no_files_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecuteContext {
            workdir: dir.path().to_path_buf(),
            tools_dir: dir.path().join("tools"),
            timeout: Duration::from_secs(5),
        };
        let out = PylintTool.execute(&ctx, b"", &[]).await.unwrap();
        assert!(PylintTool.parse_output(&out).unwrap().is_empty());
    }

    #[test]
    fn venv_layout() {
        let bin = PylintTool::venv_bin(Path::new("/tools"), "pylint");
        assert!(bin.starts_with("/tools/pylint-venv"));
    }
}
