//! File-matching phase: list the files a replace would touch before
//! anything is mutated.

use super::args::{build_args, files_engine_args};
use super::parser::ResultParser;
use crate::config::RipgrepConfig;
use crate::core::{ProcessRunner, TaskReporter};
use crate::error::EngineError;
use crate::types::{MatchLocation, ProgressReport, SearchInputs};
use std::collections::HashSet;

/// Ordered, de-duplicated candidate files.
#[derive(Debug, Default)]
struct FileCollector {
    files: Vec<String>,
    seen: HashSet<String>,
}

impl FileCollector {
    fn add(&mut self, locations: Vec<MatchLocation>, reporter: &TaskReporter) {
        let before = self.files.len();
        for location in locations {
            if self.seen.insert(location.filename.clone()) {
                self.files.push(location.filename);
            }
        }
        if self.files.len() > before {
            reporter.report_progress(ProgressReport::UpdateTotal(self.files.len()));
        }
    }
}

/// Run a files-with-matches search and collect the candidate files,
/// reporting `UpdateTotal` as they are discovered.
///
/// Flags on the replace blacklist fail before anything is spawned.
pub(crate) async fn fetch_files<R: ProcessRunner + ?Sized>(
    runner: &R,
    config: &RipgrepConfig,
    inputs: &SearchInputs,
    reporter: &TaskReporter,
) -> Result<Vec<String>, EngineError> {
    // The replacement plays no part in which files match
    let inputs = SearchInputs {
        replacement: String::new(),
        ..inputs.clone()
    };
    let Some(args) = build_args(
        &inputs,
        &config.replace_blacklist,
        &config.extra_args,
        &files_engine_args(),
    )?
    else {
        return Ok(Vec::new());
    };

    let mut parser = ResultParser::new(&config.colors);
    let mut collector = FileCollector::default();
    runner
        .run(&config.path, &args, reporter.abort_token(), &mut |chunk: &[u8]| {
            collector.add(parser.feed(chunk), reporter)
        })
        .await?;
    collector.add(parser.finish(), reporter);

    log::info!("Found {} files to rewrite", collector.files.len());
    Ok(collector.files)
}
