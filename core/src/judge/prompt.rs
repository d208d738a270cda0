use std::fmt::Write as _;

/// Code excerpt limit for a single (file, rule) prompt.
pub const MAX_PAIR_CODE_CHARS: usize = 3000;

const TRUNCATED_MARKER: &str = "\n... (truncated)";

const REVIEWER_PREAMBLE: &str = "\
You are a strict code reviewer checking code changes against coding conventions.
Be conservative: report a violation only when you are certain the code violates the rule.
If unsure, report it as not violating. Judge only the rule(s) given.
Each code line is prefixed with its line number in the new file (`12: code`).";

const SINGLE_SCHEMA: &str = r#"Respond with ONLY a JSON object, no markdown:
{"violates": false, "confidence": "high", "line": 0, "description": "", "suggestion": ""}
- violates: true only if the code certainly violates the rule
- confidence: "high" | "medium" | "low"
- line: the number prefixed to the offending code line, 0 if unknown
- description: short explanation when violated, else ""
- suggestion: how to fix when violated, else """#;

const BATCH_SCHEMA: &str = r#"Respond with ONLY a JSON array, no markdown. One element per (rule, file) pair you judged:
[{"rule_id": "<rule id>", "file": "<path>", "line": 0, "violates": true, "confidence": "high", "description": "", "suggestion": ""}]
- rule_id: exactly one of the rule ids listed above
- line: the number prefixed to the offending code line, 0 if unknown
- confidence: "high" | "medium" | "low"
Return [] when nothing is violated."#;

/// Truncates on a char boundary, appending a marker when anything was cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((idx, _)) => format!("{}{}", &text[..idx], TRUNCATED_MARKER),
    }
}

pub fn pair_prompt(rule_text: &str, file: &str, code: &str) -> String {
    let code = truncate_chars(code, MAX_PAIR_CODE_CHARS);
    format!(
        "{REVIEWER_PREAMBLE}\n\n{SINGLE_SCHEMA}\n\nFile: {file}\n\n=== RULE TO CHECK ===\n{rule_text}\n\n=== CODE TO REVIEW ===\n{code}\n\nRespond with JSON only."
    )
}

/// One rule as listed in a batched prompt.
#[derive(Debug, Clone)]
pub struct BatchEntry<'a> {
    pub id: &'a str,
    pub text: &'a str,
    pub severity: &'a str,
}

/// Composes every rule and every file into one prompt, bounded by `max_chars`.
///
/// Rules always survive; file sections are appended until the budget runs
/// out, and the last one is cut to fit.
pub fn batch_prompt(rules: &[BatchEntry<'_>], files: &[(&str, String)], max_chars: usize) -> String {
    let mut head = String::new();
    let _ = writeln!(head, "{REVIEWER_PREAMBLE}\n");
    let _ = writeln!(head, "=== RULES TO CHECK ===");
    for rule in rules {
        let _ = writeln!(head, "- [{}] ({}) {}", rule.id, rule.severity, rule.text);
    }
    let _ = writeln!(head, "\n=== FILES AND CHANGES TO REVIEW ===");

    let tail = format!("=== END OF FILES ===\n\n{BATCH_SCHEMA}\n");

    let reserved = head.chars().count() + tail.chars().count();
    let mut budget = max_chars.saturating_sub(reserved);
    let mut body = String::new();
    for (path, code) in files {
        if budget == 0 {
            let _ = writeln!(body, "(remaining files omitted)");
            break;
        }
        let section = format!("--- {path} ---\n{code}\n\n");
        let len = section.chars().count();
        if len <= budget {
            body.push_str(&section);
            budget -= len;
        } else {
            body.push_str(&truncate_chars(&section, budget));
            body.push('\n');
            budget = 0;
        }
    }

    format!("{head}{body}{tail}")
}

/// Asks which of the candidate tools can enforce a rule natively.
pub fn routing_prompt(rule_text: &str, languages: &[String], candidates: &[(&str, &str)]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "You route coding conventions to static analysis tools. Pick the tools below that can enforce the rule exactly with their native configuration. Pick none if the rule needs semantic judgement."
    );
    let _ = writeln!(out, "\nRule: {rule_text}");
    if !languages.is_empty() {
        let _ = writeln!(out, "Languages: {}", languages.join(", "));
    }
    let _ = writeln!(out, "\nAvailable tools:");
    for (name, description) in candidates {
        let _ = writeln!(out, "- {name}: {description}");
    }
    let _ = writeln!(
        out,
        "\nRespond with ONLY a JSON object: {{\"tools\": [\"<tool name>\", ...], \"reason\": \"\"}}"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 100), text);
        assert_eq!(truncate_chars(text, 2), format!("hé{TRUNCATED_MARKER}"));
    }

    #[test]
    fn pair_prompt_caps_code() {
        let code = "x".repeat(MAX_PAIR_CODE_CHARS + 500);
        let prompt = pair_prompt("No x", "a.js", &code);
        assert!(prompt.contains("(truncated)"));
        assert!(prompt.contains("File: a.js"));
    }

    #[test]
    fn batch_prompt_lists_rules_and_files() {
        let rules = [
            BatchEntry { id: "security-1", text: "No hardcoded secrets", severity: "error" },
            BatchEntry { id: "style-1", text: "Use const instead of let", severity: "warning" },
        ];
        let files = [
            ("app.js", "const API_KEY = 'secret123';".to_string()),
            ("main.py", "password = 'admin'".to_string()),
        ];
        let prompt = batch_prompt(&rules, &files, 100_000);
        for needle in [
            "=== RULES TO CHECK ===",
            "=== FILES AND CHANGES TO REVIEW ===",
            "=== END OF FILES ===",
            "security-1",
            "Use const instead of let",
            "app.js",
            "main.py",
            "JSON array",
            "rule_id",
        ] {
            assert!(prompt.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn batch_prompt_stays_within_budget() {
        let rules = [BatchEntry { id: "r", text: "rule", severity: "error" }];
        let big = "y".repeat(10_000);
        let files = [("a.js", big.clone()), ("b.js", big)];
        let prompt = batch_prompt(&rules, &files, 4_000);
        assert!(prompt.chars().count() <= 4_000 + TRUNCATED_MARKER.len() + 64);
        assert!(prompt.contains("[r]"));
        assert!(prompt.contains("=== END OF FILES ==="));
    }
}
