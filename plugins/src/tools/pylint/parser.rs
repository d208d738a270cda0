use codepact_core::api::{RawViolation, ToolError, ToolOutput};
use serde::Deserialize;

use super::NAME;
use crate::tools::support::parse_error;

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
    #[serde(default)]
    path: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    message: String,
    #[serde(rename = "message-id", default)]
    message_id: String,
}

/// Reads `--output-format=json`. Findings are keyed by symbol so they match
/// the symbols the converter enabled.
pub(super) fn parse(output: &ToolOutput) -> Result<Vec<RawViolation>, ToolError> {
    let stdout = output.stdout.trim();
    if stdout.is_empty() || stdout == "[]" {
        return Ok(Vec::new());
    }

    let messages: Vec<Message> =
        serde_json::from_str(stdout).map_err(|e| parse_error(NAME, e, output))?;

    Ok(messages
        .into_iter()
        .map(|m| RawViolation {
            severity: Some(severity_label(&m.kind).to_string()),
            rule_id: rule_key(&m.symbol, &m.message_id),
            file: m.path,
            line: m.line,
            column: m.column,
            message: m.message,
        })
        .collect())
}

fn severity_label(kind: &str) -> &'static str {
    match kind.to_ascii_lowercase().as_str() {
        "fatal" | "error" => "error",
        "info" | "information" => "info",
        _ => "warning",
    }
}

fn rule_key(symbol: &str, message_id: &str) -> Option<String> {
    [symbol, message_id]
        .into_iter()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_messages() {
        let output = ToolOutput {
            stdout: r#"[
                {"type": "error", "module": "m", "obj": "C.f", "line": 15, "column": 4,
                 "path": "src/m.py", "symbol": "undefined-variable",
                 "message": "Undefined variable 'foo'", "message-id": "E0602"},
                {"type": "convention", "line": 1, "column": 0, "path": "src/m.py",
                 "symbol": "", "message": "Missing docstring", "message-id": "C0114"}
            ]"#
            .into(),
            exit_code: 18,
            ..Default::default()
        };
        let v = parse(&output).unwrap();
        assert_eq!(
            v[0],
            RawViolation {
                file: "src/m.py".into(),
                line: 15,
                column: 4,
                message: "Undefined variable 'foo'".into(),
                severity: Some("error".into()),
                rule_id: Some("undefined-variable".into()),
            }
        );
        assert_eq!(v[1].rule_id.as_deref(), Some("C0114"));
        assert_eq!(v[1].severity.as_deref(), Some("warning"));
    }

    #[test]
    fn type_mapping() {
        for (kind, want) in [
            ("fatal", "error"),
            ("ERROR", "error"),
            ("warning", "warning"),
            ("refactor", "warning"),
            ("convention", "warning"),
            ("information", "info"),
            ("", "warning"),
        ] {
            assert_eq!(severity_label(kind), want, "{kind}");
        }
    }

    #[test]
    fn invalid_json_is_an_error() {
        let output = ToolOutput {
            stdout: "not json".into(),
            stderr: "pylint: error: no such module".into(),
            exit_code: 1,
            ..Default::default()
        };
        assert!(parse(&output).unwrap_err().to_string().contains("no such module"));
    }
}
