//! Data model shared by the argument builder, the parser, the phases and the
//! task engine.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Snapshot of the user inputs a task runs against.
///
/// Tasks take ownership of a clone, so edits made while a task is running
/// never leak into it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInputs {
    /// Pattern handed to the search tool
    pub search: String,
    /// Replacement text (empty means "no replacement")
    pub replacement: String,
    /// Newline separated glob patterns
    pub files_filter: String,
    /// Raw flag string, split on whitespace
    pub flags: String,
    /// Whitespace separated paths, `\ ` escapes a literal space
    pub paths: String,
}

impl SearchInputs {
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Self::default()
        }
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }

    pub fn with_files_filter(mut self, files_filter: impl Into<String>) -> Self {
        self.files_filter = files_filter.into();
        self
    }

    pub fn with_paths(mut self, paths: impl Into<String>) -> Self {
        self.paths = paths.into();
        self
    }
}

/// The three user-facing operations. At most one task per kind is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Search,
    Replace,
    Sync,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Search, TaskKind::Replace, TaskKind::Sync];

    pub(crate) fn index(self) -> usize {
        match self {
            TaskKind::Search => 0,
            TaskKind::Replace => 1,
            TaskKind::Sync => 2,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Search => write!(f, "search"),
            TaskKind::Replace => write!(f, "replace"),
            TaskKind::Sync => write!(f, "sync"),
        }
    }
}

/// One parsed record of tool output.
///
/// A location without `line` is a file-level entry. `col` and `end_col` are
/// byte offsets into `text` (end exclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLocation {
    pub filename: String,
    pub line: Option<u64>,
    pub col: Option<usize>,
    pub end_col: Option<usize>,
    pub text: Option<String>,
}

impl MatchLocation {
    pub fn file(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            line: None,
            col: None,
            end_col: None,
            text: None,
        }
    }

    pub fn is_file_entry(&self) -> bool {
        self.line.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressReport {
    /// Files discovered so far while enumerating candidates
    UpdateTotal(usize),
    /// Files processed so far during replace or sync
    UpdateCount(usize),
}

/// Terminal state of a task, emitted exactly once.
#[derive(Debug)]
pub enum TaskOutcome {
    Success,
    Error(EngineError),
    Aborted,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, TaskOutcome::Aborted)
    }

    /// Human readable message, `None` for an aborted task.
    pub fn message(&self) -> Option<String> {
        match self {
            TaskOutcome::Success => Some("done".to_string()),
            TaskOutcome::Error(e) => Some(e.to_string()),
            TaskOutcome::Aborted => None,
        }
    }
}

impl From<Result<(), EngineError>> for TaskOutcome {
    fn from(result: Result<(), EngineError>) -> Self {
        match result {
            Ok(()) => TaskOutcome::Success,
            Err(EngineError::Aborted) => TaskOutcome::Aborted,
            Err(e) => TaskOutcome::Error(e),
        }
    }
}

/// A line edited after the replace-and-review step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedLine {
    /// 1-based line number
    pub number: u64,
    /// New line content, without terminator
    pub content: String,
}

/// A file whose in-memory lines diverge from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: PathBuf,
    pub lines: Vec<ChangedLine>,
}

impl ChangedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
        }
    }

    pub fn with_line(mut self, number: u64, content: impl Into<String>) -> Self {
        self.lines.push(ChangedLine {
            number,
            content: content.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        assert!(TaskOutcome::from(Ok(())).is_success());
        assert!(TaskOutcome::from(Err(EngineError::Aborted)).is_aborted());

        let outcome = TaskOutcome::from(Err(EngineError::NoMatches));
        assert_eq!(outcome.message().as_deref(), Some("no matches"));
    }

    #[test]
    fn test_aborted_has_no_message() {
        assert_eq!(TaskOutcome::Aborted.message(), None);
    }

    #[test]
    fn test_file_entry() {
        let location = MatchLocation::file("src/lib.rs");
        assert!(location.is_file_entry());
        assert_eq!(location.filename, "src/lib.rs");
    }
}
