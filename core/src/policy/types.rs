use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::check::CheckParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    /// Lenient mapping for tool output and free-form labels.
    pub fn normalize(label: &str) -> Severity {
        match label.trim().to_ascii_lowercase().as_str() {
            "error" | "err" | "fatal" | "critical" => Severity::Error,
            "warning" | "warn" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Rule applicability. An empty selector matches every file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl Selector {
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty() && self.include.is_empty() && self.exclude.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Selector>,
    #[serde(default)]
    pub check: CheckParams,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

fn default_enabled() -> bool {
    true
}

impl PolicyRule {
    pub fn engine(&self) -> Option<&str> {
        self.check.engine()
    }

    /// Text handed to the judge: the description, else the message, else the id.
    pub fn judge_text(&self) -> &str {
        if !self.desc.is_empty() {
            &self.desc
        } else if !self.message.is_empty() {
            &self.message
        } else {
            &self.id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforceSettings {
    #[serde(default = "default_stages")]
    pub stages: Vec<String>,
    #[serde(default = "default_fail_on")]
    pub fail_on: Vec<Severity>,
}

fn default_stages() -> Vec<String> {
    vec!["pre-commit".to_string(), "pre-push".to_string()]
}

fn default_fail_on() -> Vec<Severity> {
    vec![Severity::Error]
}

impl Default for EnforceSettings {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            fail_on: default_fail_on(),
        }
    }
}

impl EnforceSettings {
    pub fn fails_on(&self, severity: Severity) -> bool {
        self.fail_on.contains(&severity)
    }
}

/// Compiled, engine-assigned policy consumed by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodePolicy {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    #[serde(default)]
    pub enforce: EnforceSettings,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for CodePolicy {
    fn default() -> Self {
        Self {
            version: default_version(),
            rules: Vec::new(),
            enforce: EnforceSettings::default(),
        }
    }
}

impl CodePolicy {
    pub fn rule(&self, id: &str) -> Option<&PolicyRule> {
        self.rules.iter().find(|r| r.id == id)
    }
}

/// Natural-language authoring format, the input to conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRule {
    pub id: String,
    pub say: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDefaults {
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPolicy {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub defaults: UserDefaults,
    #[serde(default)]
    pub rules: Vec<UserRule>,
}
