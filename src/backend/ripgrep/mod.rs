//! ripgrep engine.
//!
//! Search streams colourised `rg` output through the incremental parser.
//! Replace runs the file-matching phase and then rewrites every candidate
//! file. Sync writes reviewed line edits back to disk.

pub mod args;
pub mod fetch_files;
pub mod parser;
pub mod replace;
pub mod sync;

use self::args::{build_args, replaces_with_empty, search_engine_args, split_flags};
use self::parser::ResultParser;
use super::{Confirm, Confirmation, SearchEngine};
use crate::config::{RipgrepConfig, VersionCache};
use crate::core::{ProcessRunner, TaskReporter, TokioProcessRunner};
use crate::error::EngineError;
use crate::types::{ChangedFile, SearchInputs};
use async_trait::async_trait;

const EMPTY_REPLACE_PROMPT: &str =
    "Replace every match with an empty string? This deletes the matched text.";

/// ripgrep implementation of `SearchEngine`.
pub struct RipgrepEngine<R: ProcessRunner = TokioProcessRunner> {
    config: RipgrepConfig,
    runner: R,
    version: VersionCache,
}

impl RipgrepEngine<TokioProcessRunner> {
    pub fn new(config: RipgrepConfig) -> Self {
        Self::with_runner(config, TokioProcessRunner::new())
    }
}

impl<R: ProcessRunner> RipgrepEngine<R> {
    /// Create an engine that spawns processes through `runner`.
    pub fn with_runner(config: RipgrepConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            version: VersionCache::new(),
        }
    }

    pub fn config(&self) -> &RipgrepConfig {
        &self.config
    }

    /// Swap the configuration. The cached tool version is dropped as well.
    pub fn reconfigure(&mut self, config: RipgrepConfig) {
        log::info!("Reconfiguring ripgrep engine ({})", config.path.display());
        self.config = config;
        self.version = VersionCache::new();
    }

    /// First line of `rg --version`, queried once per configuration.
    pub async fn version(&self) -> &str {
        self.version.get(&self.config.path).await
    }
}

fn has_fixed_strings(flags: &[String]) -> bool {
    flags
        .iter()
        .any(|f| f == "-F" || f == "--fixed-strings")
}

#[async_trait]
impl<R: ProcessRunner + 'static> SearchEngine for RipgrepEngine<R> {
    fn name(&self) -> &'static str {
        "ripgrep"
    }

    async fn search(
        &self,
        inputs: &SearchInputs,
        reporter: &TaskReporter,
    ) -> Result<(), EngineError> {
        let Some(args) = build_args(
            inputs,
            &self.config.search_blacklist,
            &self.config.extra_args,
            &search_engine_args(&self.config.colors),
        )?
        else {
            log::debug!("Empty search, nothing to run");
            return Ok(());
        };

        log::info!("Starting ripgrep search: {} ({})", inputs.search, self.version().await);

        let mut parser = ResultParser::new(&self.config.colors);
        self.runner
            .run(
                &self.config.path,
                &args,
                reporter.abort_token(),
                &mut |chunk: &[u8]| reporter.push_matches(parser.feed(chunk)),
            )
            .await?;
        reporter.push_matches(parser.finish());
        Ok(())
    }

    async fn replace(
        &self,
        inputs: &SearchInputs,
        confirm: &dyn Confirm,
        reporter: &TaskReporter,
    ) -> Result<(), EngineError> {
        let Some(args) = build_args(
            inputs,
            &self.config.replace_blacklist,
            &self.config.extra_args,
            &[],
        )?
        else {
            log::debug!("Empty search, nothing to replace");
            return Ok(());
        };

        if replaces_with_empty(&args) {
            let answer = tokio::select! {
                biased;
                _ = reporter.abort_token().aborted() => return Err(EngineError::Aborted),
                answer = confirm.confirm(EMPTY_REPLACE_PROMPT) => answer,
            };
            if answer != Confirmation::Yes {
                log::info!("Empty replacement declined ({:?})", answer);
                return Err(EngineError::ReplaceDeclined);
            }
        }
        if reporter.is_aborted() {
            return Err(EngineError::Aborted);
        }

        let files =
            fetch_files::fetch_files(&self.runner, &self.config, inputs, reporter).await?;
        replace::replace_files(&self.runner, &self.config, inputs, &files, reporter).await
    }

    async fn sync(
        &self,
        inputs: &SearchInputs,
        changed: &[ChangedFile],
        reporter: &TaskReporter,
    ) -> Result<(), EngineError> {
        sync::sync_files(&self.config, inputs, changed, reporter).await
    }

    fn prefill_from_selection(&self, inputs: &SearchInputs, selection: &str) -> SearchInputs {
        let mut flags = split_flags(&inputs.flags);
        let search = if has_fixed_strings(&flags) {
            selection.to_string()
        } else {
            regex::escape(selection)
        };

        if selection.contains('\n') && !flags.iter().any(|f| f == "--multiline" || f == "-U") {
            flags.push("--multiline".to_string());
        }

        SearchInputs {
            search,
            flags: flags.join(" "),
            ..inputs.clone()
        }
    }
}
