// External tool discovery: yt-dlp, spotdl and ffmpeg

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    SpotDl,
    Ffmpeg,
}

impl ToolType {
    pub const ALL: [ToolType; 3] = [ToolType::YtDlp, ToolType::SpotDl, ToolType::Ffmpeg];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::SpotDl => "spotdl",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::Ffmpeg => "-version", // ffmpeg takes a single dash
            _ => "--version",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

/// Locate `binary_name`: well-known install directories first, then `PATH`.
///
/// Falls back to the bare name so that spawning still consults `PATH` and a
/// missing tool surfaces as `ToolNotFound` at invocation time.
pub fn find_binary(binary_name: &str) -> String {
    detect_path(binary_name).unwrap_or_else(|| binary_name.to_string())
}

fn candidate_dirs() -> Vec<PathBuf> {
    let mut candidates = vec![
        PathBuf::from("/opt/homebrew/bin"), // Homebrew on Apple Silicon
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/usr/bin"),
    ];
    // pipx / pip --user installs
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".local").join("bin"));
    }
    candidates
}

fn detect_path(binary_name: &str) -> Option<String> {
    for dir in candidate_dirs() {
        let path = dir.join(binary_name);
        if path.exists() {
            return Some(path.to_string_lossy().into_owned());
        }
    }

    let output = Command::new("which").arg(binary_name).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

pub struct ToolManager;

impl ToolManager {
    pub fn new() -> Self {
        Self
    }

    pub fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = detect_path(tool_type.as_str());
        let version = path
            .as_deref()
            .and_then(|p| self.get_version(Path::new(p), tool_type));

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            is_available: path.is_some(),
            path,
        }
    }

    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        ToolType::ALL
            .iter()
            .map(|t| self.get_tool_info(*t))
            .collect()
    }

    /// Log what is installed; returns the tools that are missing
    pub fn status(&self) -> Vec<ToolType> {
        let mut missing = Vec::new();
        for info in self.get_all_tools() {
            if info.is_available {
                tracing::info!(
                    "{} found at {} ({})",
                    info.name,
                    info.path.as_deref().unwrap_or("?"),
                    info.version.as_deref().unwrap_or("unknown version")
                );
            } else {
                tracing::warn!("{} not found", info.name);
                missing.push(info.tool_type);
            }
        }
        missing
    }

    fn get_version(&self, path: &Path, tool_type: ToolType) -> Option<String> {
        match Command::new(path).arg(tool_type.version_arg()).output() {
            Ok(output) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout);
                // ffmpeg prints a banner; keep the first line only
                out.lines().next().map(|l| l.trim().to_string())
            }
            _ => None,
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_binary_falls_back_to_bare_name() {
        let name = "no-such-media-tool-42";
        assert_eq!(find_binary(name), name);
        let info = ToolManager::new().get_tool_info(ToolType::SpotDl);
        assert_eq!(info.is_available, info.path.is_some());
    }

    #[test]
    fn home_local_bin_is_searched() {
        if let Some(home) = dirs::home_dir() {
            assert!(candidate_dirs().contains(&home.join(".local").join("bin")));
        }
    }
}
