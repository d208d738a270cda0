use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use codepact_core::api::{
    run_command, CliJudgeConfig, CommandSpec, Judge, JudgeMode, ProviderInfo, ProviderProfile,
    ResponseFormat,
};

const PROFILE: ProviderProfile = ProviderProfile {
    max_prompt_chars: 100_000,
    default_timeout: Duration::from_secs(300),
};

/// Drives a local agent CLI. The prompt goes over stdin so large batched
/// prompts never hit argv limits.
pub struct CliJudge {
    command: String,
    model: Option<String>,
    timeout: Duration,
}

impl CliJudge {
    pub fn new(cfg: &CliJudgeConfig) -> Self {
        Self {
            command: cfg.command.clone(),
            model: cfg.model.clone().filter(|m| !m.trim().is_empty()),
            timeout: cfg
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(PROFILE.default_timeout),
        }
    }

    fn args(&self) -> Vec<String> {
        let exe = command_basename_lower(&self.command);
        let mut args: Vec<String> = Vec::new();

        if exe.contains("codex") {
            // codex exec [--model m] -   (reads the prompt from stdin)
            args.push("exec".into());
            self.push_model(&mut args);
            args.push("-".into());
        } else if exe.contains("claude") {
            // claude -p --output-format text [--model m]
            args.extend(["-p".into(), "--output-format".into(), "text".into()]);
            self.push_model(&mut args);
        } else {
            // gemini and generic CLIs run non-interactively when stdin is piped
            self.push_model(&mut args);
        }
        args
    }

    fn push_model(&self, args: &mut Vec<String>) {
        if let Some(m) = &self.model {
            args.push("--model".into());
            args.push(m.clone());
        }
    }
}

#[async_trait]
impl Judge for CliJudge {
    fn name(&self) -> &str {
        &self.command
    }

    fn info(&self) -> Option<ProviderInfo> {
        Some(ProviderInfo {
            mode: JudgeMode::AgenticSingle,
            profile: PROFILE,
        })
    }

    async fn execute(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        let mut input = prompt.to_string();
        if format == ResponseFormat::Json {
            input.push_str("\n\nRespond with JSON only, without markdown fences.");
        }

        let spec = CommandSpec::new(self.command.clone())
            .args(self.args())
            .stdin(input);
        tracing::debug!(command = %self.command, prompt_chars = prompt.len(), "calling judge cli");
        let out = run_command(&spec, self.timeout).await?;

        if out.exit_code != 0 {
            bail!(
                "{} exited with {}: {}",
                self.command,
                out.exit_code,
                out.stderr.trim()
            );
        }
        let text = out.stdout.trim();
        if text.is_empty() {
            bail!("{} produced no output", self.command);
        }
        Ok(text.to_string())
    }
}

fn command_basename_lower(command: &str) -> String {
    let p = Path::new(command);
    let s = p.file_stem().and_then(|x| x.to_str()).unwrap_or(command);
    s.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judge(command: &str, model: Option<&str>) -> CliJudge {
        CliJudge::new(&CliJudgeConfig {
            command: command.into(),
            model: model.map(str::to_string),
            timeout_secs: Some(5),
        })
    }

    #[test]
    fn args_per_cli() {
        assert_eq!(
            judge("/usr/local/bin/claude", Some("haiku")).args(),
            vec!["-p", "--output-format", "text", "--model", "haiku"]
        );
        assert_eq!(judge("codex", None).args(), vec!["exec", "-"]);
        assert_eq!(judge("gemini", Some("flash")).args(), vec!["--model", "flash"]);
        assert!(judge("gemini", Some("  ")).args().is_empty());
    }

    #[test]
    fn reports_agentic_mode() {
        let info = judge("claude", None).info().unwrap();
        assert_eq!(info.mode, JudgeMode::AgenticSingle);
        assert_eq!(info.profile.max_prompt_chars, 100_000);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pipes_prompt_through_stdin() {
        let j = judge("cat", None);
        let out = j.execute("hello judge", ResponseFormat::Text).await.unwrap();
        assert_eq!(out, "hello judge");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let j = judge("false", None);
        assert!(j.execute("x", ResponseFormat::Text).await.is_err());
    }
}
