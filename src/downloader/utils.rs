// Helper functions for engine and resolver implementations

use crate::downloader::errors::DownloadError;
use crate::downloader::models::NetworkConfig;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::time::timeout;

/// Exit status and captured streams of a finished tool
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

fn spawn_piped(program: &str, args: &[String]) -> Result<Child, DownloadError> {
    TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DownloadError::ToolNotFound(program.to_string()),
            _ => DownloadError::io(program, e),
        })
}

fn operation_name(program: &str) -> String {
    Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string())
}

/// Run command to completion with timeout, collecting stdout and stderr
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    limit: Duration,
) -> Result<ToolOutput, DownloadError> {
    let mut child = spawn_piped(program, &args)?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::ParseError(format!("no stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::ParseError(format!("no stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let waited = timeout(limit, child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res.map_err(|e| DownloadError::io(program, e))?;
            let stdout = join_reader(program, stdout_task).await?;
            let stderr = join_reader(program, stderr_task).await?;
            Ok(ToolOutput {
                status,
                stdout,
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Timeout {
                operation: operation_name(program),
                limit,
            })
        }
    }
}

async fn join_reader(
    program: &str,
    task: tokio::task::JoinHandle<io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, DownloadError> {
    match task.await {
        Ok(read) => read.map_err(|e| DownloadError::io(program, e)),
        Err(e) => Err(DownloadError::ParseError(format!(
            "reader for {} failed: {}",
            program, e
        ))),
    }
}

/// Run command with timeout, handing every stdout line to `on_line` as it
/// arrives. stderr is collected for diagnostics. stdout is not retained.
pub async fn run_streaming_with_timeout<F>(
    program: &str,
    args: Vec<String>,
    limit: Duration,
    mut on_line: F,
) -> Result<ToolOutput, DownloadError>
where
    F: FnMut(&str) + Send,
{
    let mut child = spawn_piped(program, &args)?;

    let stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::ParseError(format!("no stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::ParseError(format!("no stderr from {}", program)))?;

    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let streamed = timeout(limit, async {
        // Lossy: file names in tool output are not always UTF-8
        let mut reader = BufReader::new(stdout_pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    on_line(line.trim_end_matches(['\n', '\r']));
                }
                Err(e) => {
                    tracing::warn!("Stopped reading {} output: {}", program, e);
                    break;
                }
            }
        }
        child.wait().await.map_err(|e| DownloadError::io(program, e))
    })
    .await;

    match streamed {
        Ok(status_res) => {
            let status = status_res?;
            let stderr = join_reader(program, stderr_task).await?;
            Ok(ToolOutput {
                status,
                stdout: Vec::new(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stderr_task.abort();
            Err(DownloadError::Timeout {
                operation: operation_name(program),
                limit,
            })
        }
    }
}

/// Build proxy arguments for yt-dlp / spotdl
pub fn get_proxy_args(config: &NetworkConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(proxy) = &config.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }

    args
}

/// Build timeout arguments for yt-dlp
pub fn get_timeout_args(config: &NetworkConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(timeout) = config.socket_timeout {
        args.push("--socket-timeout".to_string());
        args.push(timeout.as_secs().max(1).to_string());
    }

    args
}

/// Cookie file arguments, shared by both tools
pub fn get_cookie_args(cookies: Option<&Path>) -> Vec<String> {
    match cookies {
        Some(path) => vec!["--cookies".to_string(), path.display().to_string()],
        None => Vec::new(),
    }
}

/// Replace characters that are invalid in file names on common platforms
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_end_matches('.');
    trimmed.to_string()
}

/// First `limit` characters, never splitting a code point
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
