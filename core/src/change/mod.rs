mod diff;
pub mod git;
mod language;

use serde::{Deserialize, Serialize};

pub use diff::{added_lines, numbered_code, AddedLine};
pub use git::{collect_changes, ChangeScope};
pub use language::{language_for_path, matches_language, matches_selector, normalize_language};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
}

impl ChangeStatus {
    /// Parses a `git diff --name-status` letter. Renames and copies count as modified.
    pub fn from_git(code: &str) -> Option<Self> {
        match code.chars().next()? {
            'A' => Some(ChangeStatus::Added),
            'M' | 'R' | 'C' | 'T' => Some(ChangeStatus::Modified),
            'D' => Some(ChangeStatus::Deleted),
            _ => None,
        }
    }
}

/// One file in the change set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub path: String,
    pub status: ChangeStatus,
    #[serde(default)]
    pub diff: String,
}

impl Change {
    pub fn new(path: impl Into<String>, status: ChangeStatus, diff: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status,
            diff: diff.into(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == ChangeStatus::Deleted
    }

    pub fn language(&self) -> Option<&'static str> {
        language_for_path(&self.path)
    }
}
