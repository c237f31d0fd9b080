//! Engine configuration.
//!
//! The engine never mutates its configuration; reconfiguring replaces the
//! whole value and resets the cached tool version.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio::sync::OnceCell;

/// Version string reported when `--version` cannot be queried.
pub const FALLBACK_VERSION: &str = "ripgrep (unknown version)";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ripgrep: RipgrepConfig,
}

impl EngineConfig {
    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            serde_json::from_str(content).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.ripgrep.colors.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RipgrepConfig {
    /// Path or name of the ripgrep binary
    pub path: PathBuf,
    /// Arguments appended to every search invocation
    pub extra_args: Vec<String>,
    /// Flags refused for search
    pub search_blacklist: Vec<String>,
    /// Flags refused for replace (destructive operation)
    pub replace_blacklist: Vec<String>,
    /// Flags refused for sync
    pub sync_blacklist: Vec<String>,
    pub colors: ColorScheme,
}

const SEARCH_BLACKLIST: &[&str] = &[
    "--help",
    "-h",
    "--version",
    "-V",
    "--files",
    "--type-list",
    "--pcre2-version",
    "--json",
    "--color",
    "--colors",
    "--vimgrep",
    "--heading",
    "--null",
    "-0",
    "--null-data",
    "--no-filename",
    "-I",
    "--no-line-number",
    "-N",
    "--replace",
    "-r",
];

const DESTRUCTIVE_BLACKLIST: &[&str] = &[
    "--binary",
    "--byte-offset",
    "-b",
    "--count",
    "-c",
    "--count-matches",
    "--files-with-matches",
    "-l",
    "--files-without-match",
    "--invert-match",
    "-v",
    "--max-count",
    "-m",
    "--only-matching",
    "-o",
    "--passthru",
    "--passthrough",
    "--after-context",
    "-A",
    "--before-context",
    "-B",
    "--context",
    "-C",
    "--max-columns",
    "-M",
    "--trim",
    "--stop-on-nonmatch",
];

fn to_strings(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| f.to_string()).collect()
}

impl Default for RipgrepConfig {
    fn default() -> Self {
        let destructive: Vec<String> = SEARCH_BLACKLIST
            .iter()
            .chain(DESTRUCTIVE_BLACKLIST)
            .map(|f| f.to_string())
            .collect();

        Self {
            path: PathBuf::from("rg"),
            extra_args: Vec::new(),
            search_blacklist: to_strings(SEARCH_BLACKLIST),
            replace_blacklist: destructive.clone(),
            sync_blacklist: destructive,
            colors: ColorScheme::default(),
        }
    }
}

/// Colour assigned to each output category.
///
/// The parser relies on these to tell categories apart, so they must differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub path: AnsiColor,
    pub line: AnsiColor,
    pub column: AnsiColor,
    #[serde(rename = "match")]
    pub match_color: AnsiColor,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            path: AnsiColor::Magenta,
            line: AnsiColor::Green,
            column: AnsiColor::Yellow,
            match_color: AnsiColor::Red,
        }
    }
}

impl ColorScheme {
    pub fn validate(&self) -> Result<(), EngineError> {
        let colors = [self.path, self.line, self.column, self.match_color];
        for (i, a) in colors.iter().enumerate() {
            if colors[i + 1..].contains(a) {
                return Err(EngineError::Config(format!(
                    "color '{}' is assigned to more than one output category",
                    a.name()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl AnsiColor {
    /// Name as accepted by `rg --colors`.
    pub fn name(self) -> &'static str {
        match self {
            AnsiColor::Black => "black",
            AnsiColor::Red => "red",
            AnsiColor::Green => "green",
            AnsiColor::Yellow => "yellow",
            AnsiColor::Blue => "blue",
            AnsiColor::Magenta => "magenta",
            AnsiColor::Cyan => "cyan",
            AnsiColor::White => "white",
        }
    }

    /// SGR foreground code
    pub fn sgr_code(self) -> u8 {
        30 + self as u8
    }
}

/// Lazily queried tool version, scoped to one engine configuration.
#[derive(Debug, Default)]
pub struct VersionCache {
    cell: OnceCell<String>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached version, querying `<program> --version` on first use.
    pub async fn get(&self, program: &Path) -> &str {
        self.cell
            .get_or_init(|| query_version(program.to_path_buf()))
            .await
            .as_str()
    }
}

async fn query_version(program: PathBuf) -> String {
    match Command::new(&program).arg("--version").output().await {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            match stdout.lines().next().map(str::trim) {
                Some(line) if !line.is_empty() => {
                    log::debug!("{} version: {}", program.display(), line);
                    line.to_string()
                }
                _ => FALLBACK_VERSION.to_string(),
            }
        }
        Ok(output) => {
            log::warn!(
                "{} --version exited with status: {}",
                program.display(),
                output.status
            );
            FALLBACK_VERSION.to_string()
        }
        Err(e) => {
            log::warn!("Failed to query {} version: {}", program.display(), e);
            FALLBACK_VERSION.to_string()
        }
    }
}
