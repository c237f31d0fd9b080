//! Process runner for the external search tool.
//!
//! Spawns a command, streams its stdout in raw chunks and classifies how it
//! terminated. Chunk boundaries are whatever the pipe delivers; they do not
//! line up with lines or records.

use crate::core::abort::AbortToken;
use crate::error::EngineError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

const CHUNK_SIZE: usize = 8 * 1024;

/// Runs an external command and streams its stdout.
///
/// `run` returns `Ok(())` for exit code 0, `EngineError::NoMatches` for a
/// non-zero exit with empty stderr, `EngineError::Process` carrying stderr
/// for any other failure and `EngineError::Aborted` once `abort` fires. No
/// chunk is delivered after the abort token fires.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        abort: &AbortToken,
        on_chunk: &mut (dyn for<'c> FnMut(&'c [u8]) + Send),
    ) -> Result<(), EngineError>;

    /// Run to completion and return everything written to stdout.
    async fn run_to_end(
        &self,
        program: &Path,
        args: &[String],
        abort: &AbortToken,
    ) -> Result<Vec<u8>, EngineError> {
        let mut output = Vec::new();
        self.run(program, args, abort, &mut |chunk: &[u8]| {
            output.extend_from_slice(chunk)
        })
        .await?;
        Ok(output)
    }
}

/// `ProcessRunner` backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

async fn kill_child(child: &mut Child) {
    log::info!("Terminating command process due to abort");
    if let Err(e) = child.kill().await {
        log::warn!("Failed to kill child process: {}", e);
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        abort: &AbortToken,
        on_chunk: &mut (dyn for<'c> FnMut(&'c [u8]) + Send),
    ) -> Result<(), EngineError> {
        if abort.is_aborted() {
            return Err(EngineError::Aborted);
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::debug!("Executing: {} {:?}", program.display(), args);

        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Process("stdout pipe not available".to_string()))?;

        // Drain stderr in the background so a chatty tool cannot block on it
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut content = Vec::new();
                let _ = stderr.read_to_end(&mut content).await;
                content
            })
        });

        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            let read = tokio::select! {
                biased;
                _ = abort.aborted() => None,
                read = stdout.read(&mut buffer) => Some(read),
            };
            match read {
                None => {
                    kill_child(&mut child).await;
                    if let Some(task) = stderr_task {
                        task.abort();
                    }
                    return Err(EngineError::Aborted);
                }
                Some(Ok(0)) => break,
                Some(Ok(n)) => {
                    log::trace!("Read {} bytes from {}", n, program.display());
                    on_chunk(&buffer[..n]);
                }
                Some(Err(e)) => {
                    kill_child(&mut child).await;
                    return Err(EngineError::io(program, e));
                }
            }
        }

        let status = tokio::select! {
            biased;
            _ = abort.aborted() => None,
            status = child.wait() => Some(status),
        };
        let status = match status {
            None => {
                kill_child(&mut child).await;
                return Err(EngineError::Aborted);
            }
            Some(status) => status.map_err(|e| EngineError::io(program, e))?,
        };

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if abort.is_aborted() {
            return Err(EngineError::Aborted);
        }

        if status.success() {
            log::debug!("{} completed successfully", program.display());
            return Ok(());
        }

        let diagnostic = String::from_utf8_lossy(&stderr).trim().to_string();
        log::debug!(
            "{} exited with status {}: {}",
            program.display(),
            status,
            diagnostic
        );
        if diagnostic.is_empty() {
            Err(EngineError::NoMatches)
        } else {
            Err(EngineError::Process(diagnostic))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    async fn run_sh(script: &str, abort: &AbortToken) -> (Vec<u8>, Result<(), EngineError>) {
        let mut output = Vec::new();
        let result = TokioProcessRunner::new()
            .run(Path::new("sh"), &sh(script), abort, &mut |chunk: &[u8]| {
                output.extend_from_slice(chunk)
            })
            .await;
        (output, result)
    }

    #[tokio::test]
    async fn test_streams_stdout() {
        let _ = env_logger::builder().is_test(true).try_init();

        let (output, result) = run_sh("printf 'Hello\\nWorld\\n'", &AbortToken::new()).await;
        assert!(result.is_ok());
        assert_eq!(output, b"Hello\nWorld\n");
    }

    #[tokio::test]
    async fn test_exit_one_without_stderr_is_no_matches() {
        let (_, result) = run_sh("exit 1", &AbortToken::new()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, EngineError::NoMatches));
        assert_eq!(err.to_string(), "no matches");
    }

    #[tokio::test]
    async fn test_stderr_is_surfaced_verbatim() {
        let (_, result) = run_sh("echo 'regex parse error' >&2; exit 2", &AbortToken::new()).await;
        match result {
            Err(EngineError::Process(message)) => assert_eq!(message, "regex parse error"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_abort_kills_process() {
        let abort = AbortToken::new();
        let trigger = abort.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.abort();
        });

        let started = std::time::Instant::now();
        let (_, result) = run_sh("sleep 10", &abort).await;
        assert!(matches!(result, Err(EngineError::Aborted)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_already_aborted_never_spawns() {
        let abort = AbortToken::new();
        abort.abort();
        let (output, result) = run_sh("echo should-not-run", &abort).await;
        assert!(matches!(result, Err(EngineError::Aborted)));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let result = TokioProcessRunner::new()
            .run_to_end(
                Path::new("/nonexistent/rgfar-test-binary"),
                &[],
                &AbortToken::new(),
            )
            .await;
        assert!(matches!(result, Err(EngineError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_run_to_end_collects_large_output() {
        let output = TokioProcessRunner::new()
            .run_to_end(
                Path::new("sh"),
                &sh("i=0; while [ $i -lt 5000 ]; do echo line$i; i=$((i+1)); done"),
                &AbortToken::new(),
            )
            .await
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 5000);
        assert_eq!(text.lines().last(), Some("line4999"));
    }
}
