use codepact_core::api::{RawViolation, ToolError, ToolOutput};
use serde::Deserialize;

use super::NAME;
use crate::tools::support::parse_error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResult {
    file_path: String,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(rename = "ruleId", default)]
    rule_id: Option<String>,
    #[serde(default)]
    severity: u8,
    #[serde(default)]
    message: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
}

/// Reads the `--format json` report.
pub(super) fn parse(output: &ToolOutput) -> Result<Vec<RawViolation>, ToolError> {
    let stdout = output.stdout.trim();
    if stdout.is_empty() || stdout == "[]" {
        return Ok(Vec::new());
    }

    let results: Vec<FileResult> =
        serde_json::from_str(stdout).map_err(|e| parse_error(NAME, e, output))?;

    Ok(results
        .into_iter()
        .flat_map(|file| {
            let path = file.file_path;
            file.messages.into_iter().map(move |m| RawViolation {
                file: path.clone(),
                line: m.line,
                column: m.column,
                message: m.message,
                severity: Some(severity_label(m.severity).to_string()),
                rule_id: m.rule_id,
            })
        })
        .collect())
}

fn severity_label(level: u8) -> &'static str {
    match level {
        2 => "error",
        1 => "warning",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_report() {
        let output = ToolOutput {
            stdout: r#"[
                {"filePath": "/repo/src/app.js", "messages": [
                    {"ruleId": "no-console", "severity": 2, "message": "Unexpected console statement.", "line": 3, "column": 5},
                    {"ruleId": "semi", "severity": 1, "message": "Missing semicolon.", "line": 4, "column": 12}
                ], "errorCount": 1, "warningCount": 1},
                {"filePath": "/repo/src/ok.js", "messages": []}
            ]"#
            .into(),
            exit_code: 1,
            ..Default::default()
        };
        let v = parse(&output).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(
            v[0],
            RawViolation {
                file: "/repo/src/app.js".into(),
                line: 3,
                column: 5,
                message: "Unexpected console statement.".into(),
                severity: Some("error".into()),
                rule_id: Some("no-console".into()),
            }
        );
        assert_eq!(v[1].severity.as_deref(), Some("warning"));
    }

    #[test]
    fn fatal_parse_errors_have_no_rule() {
        let output = ToolOutput {
            stdout: r#"[{"filePath": "x.js", "messages": [{"ruleId": null, "fatal": true, "severity": 2, "message": "Parsing error", "line": 1, "column": 1}]}]"#.into(),
            ..Default::default()
        };
        let v = parse(&output).unwrap();
        assert_eq!(v[0].rule_id, None);
    }

    #[test]
    fn bad_output_keeps_stderr() {
        let output = ToolOutput {
            stdout: "Oops! Something went wrong!".into(),
            stderr: "Cannot find module".into(),
            exit_code: 2,
            ..Default::default()
        };
        let err = parse(&output).unwrap_err();
        assert!(err.to_string().contains("Cannot find module"));
    }

    #[test]
    fn empty_output_is_clean() {
        assert!(parse(&ToolOutput::default()).unwrap().is_empty());
    }
}
