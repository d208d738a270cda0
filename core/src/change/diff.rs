use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HUNK_HEADER: Regex =
        Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)(?:,\d+)? @@").expect("hunk header regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedLine {
    /// 1-based line number in the new file.
    pub line: u32,
    pub text: String,
}

/// Lines added by a unified diff, numbered against the new file.
///
/// A payload without any hunk header is treated as plain file content, every
/// line counted as added.
pub fn added_lines(diff: &str) -> Vec<AddedLine> {
    if !diff.lines().any(|l| HUNK_HEADER.is_match(l)) {
        return diff
            .lines()
            .enumerate()
            .map(|(i, text)| AddedLine {
                line: i as u32 + 1,
                text: text.to_string(),
            })
            .collect();
    }

    let mut out = Vec::new();
    let mut next_line: Option<u32> = None;
    for raw in diff.lines() {
        if let Some(caps) = HUNK_HEADER.captures(raw) {
            next_line = caps.get(1).and_then(|m| m.as_str().parse().ok());
            continue;
        }
        let Some(current) = next_line else {
            continue;
        };
        if let Some(text) = raw.strip_prefix('+') {
            out.push(AddedLine {
                line: current,
                text: text.to_string(),
            });
            next_line = Some(current + 1);
        } else if raw.starts_with('-') || raw.starts_with('\\') {
            // removed line or "\ No newline at end of file"
        } else {
            next_line = Some(current + 1);
        }
    }
    out
}

/// Added code prefixed with new-file line numbers (`12: text`), for prompts
/// that ask the judge to point at a line. `None` when only blank lines were
/// added.
pub fn numbered_code(diff: &str) -> Option<String> {
    let lines = added_lines(diff);
    if lines.iter().all(|l| l.text.trim().is_empty()) {
        return None;
    }
    Some(
        lines
            .iter()
            .map(|l| format!("{}: {}", l.line, l.text))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
