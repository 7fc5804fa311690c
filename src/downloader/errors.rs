// Error types for resolvers, engines and the batch pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::diagnostics::diagnose_error;
use super::models::DownloadResult;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// URL does not belong to a supported provider
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Resolver could not produce metadata
    #[error("Could not resolve metadata: {0}")]
    ResolutionFailure(String),

    /// External invocation exceeded its time budget
    #[error("{operation} timed out after {}s", .limit.as_secs())]
    Timeout { operation: String, limit: Duration },

    /// External tool exited non-zero
    #[error("{tool} failed: {message}")]
    EngineFailure { tool: String, message: String },

    /// Tool reported success but left nothing we could find
    #[error("Download produced no discoverable file (expected .{expected} in '{}')", .dir.display())]
    ArtifactNotFound { dir: PathBuf, expected: String },

    /// Caller submitted zero items
    #[error("No items selected for download")]
    EmptyBatch,

    /// Batch ran but nothing succeeded; `results` holds every item's failure
    #[error("No files were successfully downloaded ({} attempted)", .results.len())]
    AllItemsFailed { results: Vec<DownloadResult> },

    /// yt-dlp / spotdl not installed
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Strict format or quality parsing failed
    #[error("Unsupported {what} '{value}'")]
    InvalidFormat { what: &'static str, value: String },

    /// Tool output could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("File operation failed on '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Batch stopped before this item was attempted
    #[error("Download cancelled")]
    Cancelled,
}

/// Copyable tag for a [`DownloadError`], carried inside batch results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    ResolutionFailure,
    Timeout,
    EngineFailure,
    ArtifactNotFound,
    EmptyBatch,
    AllItemsFailed,
    ToolNotFound,
    InvalidFormat,
    ParseError,
    Io,
    Archive,
    Cancelled,
}

impl DownloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::ResolutionFailure(_) => ErrorKind::ResolutionFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::EngineFailure { .. } => ErrorKind::EngineFailure,
            Self::ArtifactNotFound { .. } => ErrorKind::ArtifactNotFound,
            Self::EmptyBatch => ErrorKind::EmptyBatch,
            Self::AllItemsFailed { .. } => ErrorKind::AllItemsFailed,
            Self::ToolNotFound(_) => ErrorKind::ToolNotFound,
            Self::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            Self::ParseError(_) => ErrorKind::ParseError,
            Self::Io { .. } => ErrorKind::Io,
            Self::Archive(_) => ErrorKind::Archive,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an `EngineFailure` from a tool's stderr, prefixed with the
    /// diagnosed blocking reason when one is recognised.
    pub fn from_tool_stderr(tool: &str, exit_code: Option<i32>, stderr: &str) -> Self {
        let summary = summarize_stderr(stderr);
        let code = exit_code
            .map(|c| format!("exit code {}", c))
            .unwrap_or_else(|| "terminated by signal".to_string());

        let message = match diagnose_error(stderr) {
            Some(reason) => format!("{} ({}): {}", reason.description(), code, summary),
            None => format!("{}: {}", code, summary),
        };

        Self::EngineFailure {
            tool: tool.to_string(),
            message,
        }
    }

    /// Tool failures during metadata lookup are reported as resolution
    /// failures; timeouts and missing tools keep their own kind.
    pub fn into_resolution_failure(self) -> Self {
        match self {
            Self::EngineFailure { tool, message } => {
                Self::ResolutionFailure(format!("{}: {}", tool, message))
            }
            Self::ParseError(message) => Self::ResolutionFailure(message),
            other => other,
        }
    }

    /// Per-item failures behind an `AllItemsFailed`, empty otherwise
    pub fn item_failures(&self) -> &[DownloadResult] {
        match self {
            Self::AllItemsFailed { results } => results,
            _ => &[],
        }
    }
}

/// Keep the lines a user can act on: `ERROR:` lines first, else the last
/// non-empty line, capped so UI messages stay short.
pub fn summarize_stderr(stderr: &str) -> String {
    let important: Vec<&str> = stderr
        .lines()
        .map(|l| l.trim())
        .filter(|l| {
            l.starts_with("ERROR:")
                || l.contains("HTTP Error")
                || l.contains("Forbidden")
                || l.contains("LookupError")
                || l.contains("Requested format is not available")
        })
        .take(2)
        .collect();

    if !important.is_empty() {
        return important.join(" | ");
    }

    stderr
        .lines()
        .rev()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .map(|l| l.chars().take(200).collect())
        .unwrap_or_else(|| "no error output".to_string())
}
