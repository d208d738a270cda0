//! Natural-language judge seam.
//!
//! A judge turns a prompt into text. The validator only needs to know how the
//! provider wants work batched ([`JudgeMode`]) and how large a prompt it
//! accepts ([`ProviderProfile`]).

mod prompt;
mod response;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use prompt::{
    batch_prompt, pair_prompt, routing_prompt, truncate_chars, BatchEntry, MAX_PAIR_CODE_CHARS,
};
pub use response::{
    clean_json_response, extract_json_field, parse_batch_judgments, parse_single_judgment,
    Judgment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeMode {
    /// Many small independent requests, one per (file, rule).
    ParallelApi,
    /// One large request covering every rule and file.
    AgenticSingle,
}

impl fmt::Display for JudgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JudgeMode::ParallelApi => f.write_str("parallel_api"),
            JudgeMode::AgenticSingle => f.write_str("agentic_single"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderProfile {
    pub max_prompt_chars: usize,
    pub default_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderInfo {
    pub mode: JudgeMode,
    pub profile: ProviderProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

#[async_trait]
pub trait Judge: Send + Sync {
    fn name(&self) -> &str;

    /// Batching hints. `None` is treated as [`JudgeMode::ParallelApi`].
    fn info(&self) -> Option<ProviderInfo> {
        None
    }

    async fn execute(&self, prompt: &str, format: ResponseFormat) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Strict parse, used for configuration.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Confidence::Low),
            "medium" => Some(Confidence::Medium),
            "high" => Some(Confidence::High),
            _ => None,
        }
    }

    /// Lenient parse for judge output: missing means medium, anything
    /// unrecognised means low.
    pub fn from_response(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            None | Some("") => Confidence::Medium,
            Some(l) => Self::from_label(l).unwrap_or(Confidence::Low),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
