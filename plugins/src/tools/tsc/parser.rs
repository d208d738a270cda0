use codepact_core::api::{RawViolation, ToolOutput};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // src/main.ts(10,5): error TS2304: Cannot find name 'foo'.
    static ref DIAGNOSTIC: Regex =
        Regex::new(r"^(.+?)\((\d+),(\d+)\):\s+(error|warning|suggestion|message)\s+(TS\d+):\s+(.+)$")
            .expect("tsc diagnostic regex");
}

/// Reads `--pretty false` diagnostics. Lines that are not diagnostics, such
/// as continuation lines of a long message, are skipped.
pub(super) fn parse(output: &ToolOutput) -> Vec<RawViolation> {
    output
        .stdout
        .lines()
        .filter_map(|line| {
            let caps = DIAGNOSTIC.captures(line.trim())?;
            Some(RawViolation {
                file: caps[1].to_string(),
                line: caps[2].parse().unwrap_or(0),
                column: caps[3].parse().unwrap_or(0),
                message: caps[6].trim().to_string(),
                severity: Some(severity_label(&caps[4]).to_string()),
                rule_id: Some(caps[5].to_string()),
            })
        })
        .collect()
}

fn severity_label(category: &str) -> &'static str {
    match category {
        "error" => "error",
        "warning" => "warning",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_diagnostics() {
        let output = ToolOutput {
            stdout: "src/a.ts(3,7): error TS6133: 'unused' is declared but its value is never read.\n\
                     src/b.ts(10,1): warning TS7027: Unreachable code detected.\n\
                     \x20 continuation of a longer message\n"
                .into(),
            exit_code: 2,
            ..Default::default()
        };
        let v = parse(&output);
        assert_eq!(v.len(), 2);
        assert_eq!(
            v[0],
            RawViolation {
                file: "src/a.ts".into(),
                line: 3,
                column: 7,
                message: "'unused' is declared but its value is never read.".into(),
                severity: Some("error".into()),
                rule_id: Some("TS6133".into()),
            }
        );
        assert_eq!(v[1].severity.as_deref(), Some("warning"));
    }

    #[test]
    fn empty_output_is_clean() {
        assert!(parse(&ToolOutput::default()).is_empty());
        assert!(parse(&ToolOutput {
            stdout: "[]".into(),
            ..Default::default()
        })
        .is_empty());
    }
}
