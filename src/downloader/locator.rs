// Artifact locator
//
// Engines never say which file they wrote. After a successful run the
// target directory is scanned for a file with the requested extension,
// falling back to any extension of the same media family.

use std::fs;
use std::path::{Path, PathBuf};

use super::errors::DownloadError;
use super::formats::OutputFormat;

/// Find the artifact for `format` directly inside `dir`
pub fn locate(dir: &Path, format: &OutputFormat) -> Result<PathBuf, DownloadError> {
    locate_with(dir, format.extension(), format.alternatives())
}

/// Non-recursive scan: first file ending in `.{primary}`, else the first
/// file ending in any of `alternatives`. Matching ignores ASCII case.
pub fn locate_with(
    dir: &Path,
    primary: &str,
    alternatives: &[&str],
) -> Result<PathBuf, DownloadError> {
    let entries = fs::read_dir(dir).map_err(|e| DownloadError::io(dir, e))?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DownloadError::io(dir, e))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file {
            files.push(entry.path());
        }
    }

    if let Some(found) = files.iter().find(|p| has_extension(p, primary)) {
        return Ok(found.clone());
    }

    for ext in alternatives {
        if let Some(found) = files.iter().find(|p| has_extension(p, ext)) {
            tracing::debug!(
                "No .{} in {}, using .{} artifact",
                primary,
                dir.display(),
                ext
            );
            return Ok(found.clone());
        }
    }

    Err(DownloadError::ArtifactNotFound {
        dir: dir.to_path_buf(),
        expected: primary.to_string(),
    })
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::formats::{AudioFormat, Container, VideoFormat};

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"data").unwrap();
    }

    #[test]
    fn finds_requested_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "cover.jpg");
        touch(dir.path(), "song.mp3");

        let found = locate(dir.path(), &OutputFormat::Audio(AudioFormat::Mp3)).unwrap();
        assert_eq!(found.file_name().unwrap(), "song.mp3");
    }

    #[test]
    fn falls_back_to_same_family() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "clip.webm");

        let format = OutputFormat::Video(VideoFormat::Capped {
            container: Container::Mp4,
            height: 720,
        });
        let found = locate(dir.path(), &format).unwrap();
        assert_eq!(found.file_name().unwrap(), "clip.webm");
    }

    #[test]
    fn primary_wins_over_alternatives() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.m4a");
        touch(dir.path(), "b.flac");

        let found = locate(dir.path(), &OutputFormat::Audio(AudioFormat::Flac)).unwrap();
        assert_eq!(found.file_name().unwrap(), "b.flac");
    }

    #[test]
    fn partial_files_and_subdirectories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "video.mp4.part");
        fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let err = locate(dir.path(), &OutputFormat::Video(VideoFormat::Best)).unwrap_err();
        assert!(matches!(err, DownloadError::ArtifactNotFound { .. }));
    }

    #[test]
    fn extension_match_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "LOUD.MP3");
        let found = locate_with(dir.path(), "mp3", &[]).unwrap();
        assert_eq!(found.file_name().unwrap(), "LOUD.MP3");
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate_with(&dir.path().join("gone"), "mp3", &[]).unwrap_err();
        assert!(matches!(err, DownloadError::Io { .. }));
    }
}
