// Archive packager: one success passes through, several are zipped

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::errors::DownloadError;
use super::models::{Deliverable, DownloadResult, Payload};
use super::utils::{sanitize_filename, truncate_chars};

/// Default bound on the collection title used in archive names
pub const DEFAULT_TITLE_LIMIT: usize = 30;

/// Mime type for an artifact, by extension
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "opus" | "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map(mime_for_extension)
        .unwrap_or("application/octet-stream")
}

/// `{title}_downloads.zip`, title sanitized and cut to `limit` characters
pub fn archive_filename(title: Option<&str>, limit: usize) -> String {
    let sanitized = title.map(sanitize_filename).unwrap_or_default();
    let base = truncate_chars(sanitized.trim(), limit);
    let base = base.trim();
    if base.is_empty() {
        "media_downloads.zip".to_string()
    } else {
        format!("{}_downloads.zip", base)
    }
}

/// Turn batch results into a deliverable.
///
/// Zero successes is `AllItemsFailed`, carrying every result. Source
/// artifacts are read, never deleted.
pub fn pack(
    results: &[DownloadResult],
    title: Option<&str>,
    title_limit: usize,
) -> Result<Deliverable, DownloadError> {
    let successes: Vec<(&PathBuf, &String)> = results
        .iter()
        .filter_map(|r| match r {
            DownloadResult::Success {
                file_path,
                display_filename,
            } => Some((file_path, display_filename)),
            DownloadResult::Failure { .. } => None,
        })
        .collect();

    match successes.as_slice() {
        [] => Err(DownloadError::AllItemsFailed {
            results: results.to_vec(),
        }),
        [(path, filename)] => Ok(Deliverable::SingleFile {
            path: (*path).clone(),
            filename: (*filename).clone(),
            mime_hint: mime_for_path(path),
        }),
        many => {
            let bytes = zip_entries(many)?;
            let filename = archive_filename(title, title_limit);
            tracing::info!("Packed {} files into {}", many.len(), filename);
            Ok(Deliverable::Archive { bytes, filename })
        }
    }
}

/// Entries keep the position of their first occurrence; a repeated display
/// name takes the content of its last occurrence.
fn dedup_entries<'a>(entries: &[(&'a PathBuf, &'a String)]) -> Vec<(&'a PathBuf, &'a String)> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<(&PathBuf, &String)> = Vec::new();
    for &(path, name) in entries {
        match position.get(name.as_str()) {
            Some(&i) => {
                tracing::warn!("Duplicate archive entry '{}', keeping the last one", name);
                unique[i] = (path, name);
            }
            None => {
                position.insert(name.as_str(), unique.len());
                unique.push((path, name));
            }
        }
    }
    unique
}

fn zip_entries(entries: &[(&PathBuf, &String)]) -> Result<Vec<u8>, DownloadError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, name) in dedup_entries(entries) {
        writer.start_file(name.as_str(), options)?;
        let mut source = File::open(path).map_err(|e| DownloadError::io(path, e))?;
        io::copy(&mut source, &mut writer).map_err(|e| DownloadError::io(path, e))?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

impl Deliverable {
    /// Read the deliverable into memory and remove the file from disk
    pub fn into_payload(self) -> Result<Payload, DownloadError> {
        match self {
            Deliverable::SingleFile {
                path,
                filename,
                mime_hint,
            } => {
                let bytes = std::fs::read(&path).map_err(|e| DownloadError::io(&path, e))?;
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!("Could not remove {}: {}", path.display(), e);
                }
                Ok(Payload {
                    bytes,
                    filename,
                    mime: mime_hint,
                })
            }
            Deliverable::Archive { bytes, filename } => Ok(Payload {
                bytes,
                filename,
                mime: mime_for_extension("zip"),
            }),
        }
    }
}
