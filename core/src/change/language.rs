use std::path::Path;

use crate::policy::Selector;

const EXTENSIONS: &[(&str, &[&str])] = &[
    ("javascript", &["js", "mjs", "cjs", "jsx"]),
    ("typescript", &["ts", "mts", "cts", "tsx"]),
    ("python", &["py", "pyi", "pyw"]),
    ("go", &["go"]),
    ("java", &["java"]),
    ("c", &["c", "h"]),
    ("cpp", &["cpp", "cc", "cxx", "hpp", "hh", "hxx"]),
    ("rust", &["rs"]),
    ("ruby", &["rb"]),
    ("php", &["php"]),
    ("swift", &["swift"]),
    ("kotlin", &["kt", "kts"]),
    ("scala", &["scala"]),
    ("shell", &["sh", "bash", "zsh"]),
];

/// Canonical language name for a file, from its extension.
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(lang, _)| *lang)
}

/// Maps aliases (`js`, `py`, `golang`, ...) to the canonical names above.
pub fn normalize_language(lang: &str) -> String {
    let lower = lang.trim().to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "js" | "jsx" | "node" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" | "python3" => "python",
        "golang" => "go",
        "c++" | "cxx" => "cpp",
        "sh" | "bash" | "zsh" => "shell",
        "rs" => "rust",
        "rb" => "ruby",
        "kt" => "kotlin",
        other => other,
    };
    canonical.to_string()
}

pub fn matches_language(path: &str, languages: &[String]) -> bool {
    if languages.is_empty() {
        return true;
    }
    let Some(lang) = language_for_path(path) else {
        return false;
    };
    languages.iter().any(|l| normalize_language(l) == lang)
}

fn matches_glob(path: &str, pattern: &str) -> bool {
    match glob::Pattern::new(pattern) {
        Ok(p) => p.matches(path),
        Err(e) => {
            tracing::debug!(pattern, error = %e, "ignoring invalid glob");
            false
        }
    }
}

/// Language allow-list first, then include globs (any), then exclude globs (none).
pub fn matches_selector(path: &str, selector: Option<&Selector>) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    let path = path.replace('\\', "/");

    if !matches_language(&path, &selector.languages) {
        return false;
    }
    if !selector.include.is_empty() && !selector.include.iter().any(|p| matches_glob(&path, p)) {
        return false;
    }
    !selector.exclude.iter().any(|p| matches_glob(&path, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_language_from_extension() {
        assert_eq!(language_for_path("src/app.JS"), Some("javascript"));
        assert_eq!(language_for_path("lib/util.py"), Some("python"));
        assert_eq!(language_for_path("Makefile"), None);
    }

    #[test]
    fn aliases_normalize() {
        assert_eq!(normalize_language("JS"), "javascript");
        assert_eq!(normalize_language("golang"), "go");
        assert_eq!(normalize_language("haskell"), "haskell");
    }

    #[test]
    fn selector_applies_language_then_globs() {
        let selector = Selector {
            languages: vec!["js".into()],
            include: vec!["src/**/*.js".into()],
            exclude: vec!["src/vendor/**".into()],
        };
        assert!(matches_selector("src/app/main.js", Some(&selector)));
        assert!(!matches_selector("src/app/main.py", Some(&selector)));
        assert!(!matches_selector("test/main.js", Some(&selector)));
        assert!(!matches_selector("src/vendor/lib.js", Some(&selector)));
    }

    #[test]
    fn absent_or_empty_selector_matches_everything() {
        assert!(matches_selector("README", None));
        assert!(matches_selector("README", Some(&Selector::default())));
    }
}
