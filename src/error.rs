use std::path::PathBuf;

/// Failures a task can end with.
///
/// `Aborted` only travels through `?` inside the engine; it becomes
/// `TaskOutcome::Aborted`, never an error outcome.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid flags: {}", .flags.join(" "))]
    InvalidArguments { flags: Vec<String> },

    #[error("{0}")]
    Process(String),

    #[error("no matches")]
    NoMatches,

    #[error("aborted")]
    Aborted,

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sync is disabled when searching in multiline mode")]
    MultilineSync,

    #[error("replace with empty string was cancelled")]
    ReplaceDeclined,

    #[error("{}: line {line} is out of range", .path.display())]
    LineOutOfRange { path: PathBuf, line: u64 },

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = EngineError::InvalidArguments {
            flags: vec!["--json".to_string(), "-r".to_string()],
        };
        assert_eq!(err.to_string(), "invalid flags: --json -r");
        assert_eq!(EngineError::NoMatches.to_string(), "no matches");

        let err = EngineError::io(
            "a/b.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().starts_with("a/b.txt: "));
    }
}
