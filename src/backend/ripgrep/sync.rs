//! Sync phase: write lines edited after a replace back to their files.

use super::args::{build_args, is_multiline, split_flags};
use crate::config::RipgrepConfig;
use crate::core::file_io::{read_file, write_file};
use crate::core::TaskReporter;
use crate::error::EngineError;
use crate::types::{ChangedFile, ChangedLine, ProgressReport, SearchInputs};
use std::path::Path;

pub(crate) async fn sync_files(
    config: &RipgrepConfig,
    inputs: &SearchInputs,
    changed: &[ChangedFile],
    reporter: &TaskReporter,
) -> Result<(), EngineError> {
    // Line-based reconciliation cannot follow records spanning several lines
    let args = match build_args(inputs, &config.sync_blacklist, &config.extra_args, &[])? {
        Some(args) => args,
        None => split_flags(&inputs.flags)
            .into_iter()
            .chain(config.extra_args.iter().cloned())
            .collect(),
    };
    if is_multiline(&args) {
        return Err(EngineError::MultilineSync);
    }

    for (done, file) in changed.iter().enumerate() {
        if reporter.is_aborted() {
            log::info!("Sync aborted after {} of {} files", done, changed.len());
            return Err(EngineError::Aborted);
        }

        let content = read_file(&file.path).await?;
        let updated = apply_line_changes(&file.path, &content, &file.lines)?;
        write_file(&file.path, &updated).await?;

        reporter.report_progress(ProgressReport::UpdateCount(done + 1));
    }

    Ok(())
}

/// Replace the listed lines of `content`, keeping each line's terminator.
pub(crate) fn apply_line_changes(
    path: &Path,
    content: &[u8],
    changes: &[ChangedLine],
) -> Result<Vec<u8>, EngineError> {
    let mut lines: Vec<(&[u8], &[u8])> = content
        .split_inclusive(|&b| b == b'\n')
        .map(split_terminator)
        .collect();

    for change in changes {
        let index = change
            .number
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i < lines.len())
            .ok_or_else(|| EngineError::LineOutOfRange {
                path: path.to_path_buf(),
                line: change.number,
            })?;
        lines[index].0 = change.content.as_bytes();
    }

    let mut updated = Vec::with_capacity(content.len());
    for (body, terminator) in lines {
        updated.extend_from_slice(body);
        updated.extend_from_slice(terminator);
    }
    Ok(updated)
}

fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
    let terminator_len = if line.ends_with(b"\r\n") {
        2
    } else if line.ends_with(b"\n") {
        1
    } else {
        0
    };
    line.split_at(line.len() - terminator_len)
}
