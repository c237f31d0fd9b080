//! Replace phase: rewrite each candidate file with the replacement applied.
//!
//! ripgrep prints the whole file with `--passthru --replace`, and that output
//! is written back over the file. Files are handled one at a time in
//! candidate order, so an abort leaves a prefix of the list rewritten.

use super::args::build_rewrite_args;
use crate::config::RipgrepConfig;
use crate::core::file_io::{read_file, write_file};
use crate::core::{ProcessRunner, TaskReporter};
use crate::error::EngineError;
use crate::types::{ProgressReport, SearchInputs};
use std::path::Path;

pub(crate) async fn replace_files<R: ProcessRunner + ?Sized>(
    runner: &R,
    config: &RipgrepConfig,
    inputs: &SearchInputs,
    files: &[String],
    reporter: &TaskReporter,
) -> Result<(), EngineError> {
    let Some(base_args) =
        build_rewrite_args(inputs, &config.replace_blacklist, &config.extra_args)?
    else {
        return Ok(());
    };

    for (done, file) in files.iter().enumerate() {
        if reporter.is_aborted() {
            log::info!("Replace aborted after {} of {} files", done, files.len());
            return Err(EngineError::Aborted);
        }

        let path = Path::new(file);
        let original = read_file(path).await?;

        let mut args = base_args.clone();
        args.push("--".to_string());
        args.push(file.clone());

        match runner
            .run_to_end(&config.path, &args, reporter.abort_token())
            .await
        {
            Ok(content) => write_file(path, &match_final_newline(&original, content)).await?,
            // The file stopped matching since it was listed; leave it alone
            Err(EngineError::NoMatches) => log::warn!("{} no longer matches, skipped", file),
            Err(e) => return Err(e),
        }

        reporter.report_progress(ProgressReport::UpdateCount(done + 1));
    }

    Ok(())
}

/// ripgrep terminates the last line it prints. Drop that terminator again
/// when the file did not end with one.
fn match_final_newline(original: &[u8], mut rewritten: Vec<u8>) -> Vec<u8> {
    if !original.is_empty() && !original.ends_with(b"\n") && rewritten.ends_with(b"\n") {
        rewritten.pop();
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_final_newline_is_dropped() {
        assert_eq!(
            match_final_newline(b"abc\nlast foo", b"abc\nlast bar\n".to_vec()),
            b"abc\nlast bar"
        );
        assert_eq!(
            match_final_newline(b"a\r\nfoo", b"a\r\nbar\n".to_vec()),
            b"a\r\nbar"
        );
    }

    #[test]
    fn test_existing_final_newline_is_kept() {
        assert_eq!(match_final_newline(b"foo\n", b"bar\n".to_vec()), b"bar\n");
        assert_eq!(match_final_newline(b"foo", b"bar".to_vec()), b"bar");
    }
}
