use std::io::Write;
use std::path::{Path, PathBuf};

use codepact_core::api::{ConvertError, Judge, ResponseFormat, ToolError, ToolOutput};
use codepact_core::judge::clean_json_response;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

/// Binary installed under `tools_dir`, else one found on `PATH`.
pub(crate) fn resolve_binary(local: &Path, name: &str) -> Option<PathBuf> {
    if local.is_file() {
        return Some(local.to_path_buf());
    }
    which::which(name).ok()
}

/// Writes a generated config into `tools_dir/.tmp`. The file is removed when
/// the handle drops.
pub(crate) fn write_temp_config(
    tools_dir: &Path,
    prefix: &str,
    suffix: &str,
    content: &[u8],
) -> Result<NamedTempFile, ToolError> {
    let dir = tools_dir.join(".tmp");
    std::fs::create_dir_all(&dir)?;
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(&dir)?;
    file.write_all(content)?;
    file.flush()?;
    Ok(file)
}

/// Minimal `package.json` so npm installs into `tools_dir` instead of a parent.
pub(crate) async fn init_package_json(tools_dir: &Path) -> Result<(), ToolError> {
    let path = tools_dir.join("package.json");
    if tokio::fs::try_exists(&path).await? {
        return Ok(());
    }
    let pkg = serde_json::json!({
        "name": "codepact-tools",
        "version": "1.0.0",
        "private": true,
    });
    let data = serde_json::to_vec_pretty(&pkg).map_err(|e| ToolError::Config(e.to_string()))?;
    tokio::fs::write(&path, data).await?;
    Ok(())
}

pub(crate) fn empty_result() -> ToolOutput {
    ToolOutput {
        stdout: "[]".to_string(),
        ..Default::default()
    }
}

/// Asks the judge for a conversion and decodes its JSON reply.
pub(crate) async fn ask_json<T: DeserializeOwned>(
    judge: &dyn Judge,
    prompt: &str,
) -> Result<T, ConvertError> {
    let raw = judge
        .execute(prompt, ResponseFormat::Json)
        .await
        .map_err(ConvertError::Provider)?;
    let cleaned = clean_json_response(&raw);
    if cleaned.is_empty() {
        return Err(ConvertError::EmptyResponse);
    }
    serde_json::from_str(cleaned).map_err(|e| ConvertError::MalformedResponse {
        message: format!("{e} (response: {})", preview(cleaned, 100)),
    })
}

fn preview(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Parse failure that keeps the tool's stderr for context.
pub(crate) fn parse_error(tool: &str, err: serde_json::Error, output: &ToolOutput) -> ToolError {
    let stderr = output.stderr.trim();
    let message = if stderr.is_empty() {
        err.to_string()
    } else {
        format!("{err}; stderr: {stderr}")
    };
    ToolError::Parse {
        tool: tool.to_string(),
        message,
    }
}
