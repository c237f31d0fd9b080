// Shared fixtures: a scripted ripgrep stand-in and a counting confirmer.

#![allow(dead_code)]

use async_trait::async_trait;
use rgfar::{AbortToken, Confirm, Confirmation, EngineError, ProcessRunner, RipgrepConfig};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Pattern that makes the fake search block until aborted.
pub const BLOCKING_PATTERN: &str = "__block__";

const CHUNK: usize = 5;

/// Emulates the three ripgrep invocations the engine makes, matching the
/// pattern literally. Search output uses the default colour scheme and is
/// delivered in tiny chunks.
#[derive(Clone, Default)]
pub struct FakeRipgrep {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    rewrites: Arc<AtomicUsize>,
    abort_on_rewrite: Option<usize>,
}

impl FakeRipgrep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the task while rewriting the file at `index` (0-based).
    pub fn aborting_on_rewrite(index: usize) -> Self {
        Self {
            abort_on_rewrite: Some(index),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn rewrites(&self) -> usize {
        self.rewrites.load(Ordering::SeqCst)
    }
}

fn value<'a>(args: &'a [String], prefix: &str) -> Option<&'a str> {
    args.iter()
        .take_while(|a| a.as_str() != "--")
        .find_map(|a| a.strip_prefix(prefix))
}

fn paths(args: &[String]) -> Vec<String> {
    args.iter()
        .skip_while(|a| a.as_str() != "--")
        .skip(1)
        .cloned()
        .collect()
}

fn colored(code: u8, text: &str) -> String {
    format!("\x1b[0m\x1b[{}m{}\x1b[0m", code, text)
}

fn search_output(pattern: &str, replacement: Option<&str>, files: &[String]) -> String {
    let mut output = String::new();
    for file in files {
        let content = std::fs::read_to_string(file).unwrap_or_default();
        for (index, line) in content.lines().enumerate() {
            let Some(col) = line.find(pattern) else {
                continue;
            };
            let shown = colored(31, replacement.unwrap_or(pattern));
            output.push_str(&format!(
                "{}:{}:{}:{}\n",
                colored(35, file),
                colored(32, &(index + 1).to_string()),
                colored(33, &(col + 1).to_string()),
                line.replace(pattern, &shown),
            ));
        }
    }
    output
}

#[async_trait]
impl ProcessRunner for FakeRipgrep {
    async fn run(
        &self,
        _program: &Path,
        args: &[String],
        abort: &AbortToken,
        on_chunk: &mut (dyn for<'c> FnMut(&'c [u8]) + Send),
    ) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(args.to_vec());
        if abort.is_aborted() {
            return Err(EngineError::Aborted);
        }

        let pattern = value(args, "--regexp=").unwrap_or_default().to_string();
        let replacement = value(args, "--replace=");
        let files = paths(args);

        if pattern == BLOCKING_PATTERN {
            abort.aborted().await;
            return Err(EngineError::Aborted);
        }

        let output = if args.iter().any(|a| a == "--files-with-matches") {
            files
                .iter()
                .filter(|f| {
                    std::fs::read_to_string(f)
                        .map(|c| c.contains(&pattern))
                        .unwrap_or(false)
                })
                .map(|f| format!("{}\n", f))
                .collect::<String>()
        } else if args.iter().any(|a| a == "--passthru") {
            let index = self.rewrites.fetch_add(1, Ordering::SeqCst);
            if self.abort_on_rewrite == Some(index) {
                abort.abort();
                return Err(EngineError::Aborted);
            }
            let file = files.last().cloned().unwrap_or_default();
            let content = std::fs::read_to_string(&file).map_err(|e| EngineError::io(&file, e))?;
            if !content.contains(&pattern) {
                return Err(EngineError::NoMatches);
            }
            content.replace(&pattern, replacement.unwrap_or_default())
        } else {
            search_output(&pattern, replacement, &files)
        };

        if output.is_empty() {
            return Err(EngineError::NoMatches);
        }
        for chunk in output.as_bytes().chunks(CHUNK) {
            on_chunk(chunk);
        }
        Ok(())
    }
}

/// Answers with a fixed value and counts how often it was asked.
pub struct CountingConfirm {
    answer: Confirmation,
    asked: AtomicUsize,
}

impl CountingConfirm {
    pub fn new(answer: Confirmation) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: AtomicUsize::new(0),
        })
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirm for CountingConfirm {
    async fn confirm(&self, _prompt: &str) -> Confirmation {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// Never answers, like a prompt the user leaves open.
pub struct PendingConfirm;

#[async_trait]
impl Confirm for PendingConfirm {
    async fn confirm(&self, _prompt: &str) -> Confirmation {
        std::future::pending().await
    }
}

/// Config whose binary does not exist, so the version query falls back at once.
pub fn offline_config() -> RipgrepConfig {
    RipgrepConfig {
        path: "/nonexistent/rgfar-fake-rg".into(),
        ..RipgrepConfig::default()
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
