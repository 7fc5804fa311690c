// Batch downloader
//
// Items run strictly one after another. Each item gets its own numbered
// subdirectory so the locator only ever sees that item's files, and every
// item yields exactly one result in input order, whatever happens to the
// others.

use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::errors::DownloadError;
use super::models::{BatchRequest, DownloadRequest, DownloadResult};
use super::orchestrator::Downloader;
use super::traits::{ProgressEvent, ProgressSink};

pub struct BatchDownloader {
    downloader: Downloader,
}

impl BatchDownloader {
    pub fn new(downloader: Downloader) -> Self {
        Self { downloader }
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Download every item of `request` under `directory`.
    ///
    /// Emits `(index + 1, total, label)` before each attempt. Once `cancel`
    /// fires, remaining items are reported as cancelled without being
    /// attempted; the item in flight is allowed to finish.
    pub async fn download_all(
        &self,
        request: &BatchRequest,
        directory: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Vec<DownloadResult> {
        let total = request.items.len();
        let mut results = Vec::with_capacity(total);

        for (index, item) in request.items.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(
                    "Batch cancelled before item {} of {}: {}",
                    index + 1,
                    total,
                    item.label()
                );
                results.push(DownloadResult::failure(
                    item.label(),
                    &DownloadError::Cancelled,
                ));
                continue;
            }

            progress.emit(ProgressEvent::labelled(index + 1, total, item.label()));

            let single = DownloadRequest {
                item: item.clone(),
                format: request.format,
                quality: request.quality,
                target_directory: directory.join(format!("{:03}", index + 1)),
            };
            results.push(self.downloader.download(&single, progress).await);
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        tracing::info!("Batch finished: {} of {} succeeded", succeeded, total);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::errors::ErrorKind;
    use crate::downloader::formats::{AudioFormat, OutputFormat};
    use crate::downloader::models::{MediaItem, Provider};
    use crate::downloader::orchestrator::tests::{video, Behaviour, StubEngine};
    use crate::downloader::traits::NoProgress;
    use std::sync::Mutex;

    fn items(n: usize) -> Vec<MediaItem> {
        (1..=n).map(|i| video(&i.to_string())).collect()
    }

    fn batch_with(script: Vec<(String, Behaviour)>) -> BatchDownloader {
        let engine = StubEngine::new(Provider::YouTube, script);
        BatchDownloader::new(Downloader::new().with_engine(Box::new(engine)))
    }

    fn mp3_request(items: Vec<MediaItem>) -> BatchRequest {
        BatchRequest::new(items, OutputFormat::Audio(AudioFormat::Mp3))
    }

    #[tokio::test]
    async fn order_is_preserved_when_even_indices_fail() {
        let items = items(6);
        let script = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let behaviour = if i % 2 == 0 {
                    Behaviour::Fail
                } else {
                    Behaviour::Write(format!("{}.mp3", item.label()))
                };
                (item.source_url().to_string(), behaviour)
            })
            .collect();
        let dir = tempfile::tempdir().unwrap();

        let results = batch_with(script)
            .download_all(&mp3_request(items.clone()), dir.path(), &NoProgress, &CancellationToken::new())
            .await;

        assert_eq!(results.len(), 6);
        for (i, (result, item)) in results.iter().zip(&items).enumerate() {
            match result {
                DownloadResult::Failure { item_label, .. } => {
                    assert_eq!(i % 2, 0);
                    assert_eq!(item_label, item.label());
                }
                DownloadResult::Success {
                    display_filename, ..
                } => {
                    assert_eq!(i % 2, 1);
                    assert_eq!(display_filename, &format!("{}.mp3", item.label()));
                }
            }
        }
    }

    #[tokio::test]
    async fn failure_of_third_item_does_not_stop_the_rest() {
        let items = items(5);
        let script = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let behaviour = if i == 2 {
                    Behaviour::Fail
                } else {
                    Behaviour::Write("track.mp3".to_string())
                };
                (item.source_url().to_string(), behaviour)
            })
            .collect();
        let dir = tempfile::tempdir().unwrap();

        let results = batch_with(script)
            .download_all(&mp3_request(items), dir.path(), &NoProgress, &CancellationToken::new())
            .await;

        let outcome: Vec<bool> = results.iter().map(DownloadResult::is_success).collect();
        assert_eq!(outcome, vec![true, true, false, true, true]);

        // same filename in every item, but each in its own subdirectory
        if let DownloadResult::Success { file_path, .. } = &results[4] {
            assert_eq!(file_path, &dir.path().join("005").join("track.mp3"));
        }
    }

    #[tokio::test]
    async fn progress_is_emitted_once_per_item_in_order() {
        let items = items(3);
        let script = items
            .iter()
            .map(|item| (item.source_url().to_string(), Behaviour::Write("x.mp3".into())))
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let seen = Mutex::new(Vec::new());
        let sink = |event: ProgressEvent| {
            if let ProgressEvent::Determinate { current, total, label } = event {
                seen.lock().unwrap().push((current, total, label));
            }
        };

        batch_with(script)
            .download_all(&mp3_request(items), dir.path(), &sink, &CancellationToken::new())
            .await;

        let seen = seen.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                (1, 3, Some("title 1".to_string())),
                (2, 3, Some("title 2".to_string())),
                (3, 3, Some("title 3".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn cancellation_skips_remaining_items() {
        let items = items(4);
        let script = items
            .iter()
            .map(|item| (item.source_url().to_string(), Behaviour::Write("x.mp3".into())))
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        // cancel as soon as the second item is announced
        let sink = move |event: ProgressEvent| {
            if let ProgressEvent::Determinate { current: 2, .. } = event {
                trigger.cancel();
            }
        };

        let results = batch_with(script)
            .download_all(&mp3_request(items), dir.path(), &sink, &cancel)
            .await;

        assert_eq!(results.len(), 4);
        assert!(results[0].is_success());
        assert!(results[1].is_success());
        for skipped in &results[2..] {
            assert!(matches!(
                skipped,
                DownloadResult::Failure { kind: ErrorKind::Cancelled, .. }
            ));
        }
    }

    #[tokio::test]
    async fn empty_batch_returns_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let results = batch_with(Vec::new())
            .download_all(&mp3_request(Vec::new()), dir.path(), &NoProgress, &CancellationToken::new())
            .await;
        assert!(results.is_empty());
    }
}
