use async_trait::async_trait;
use media_downloader::downloader::extractors::MetadataResolver;
use media_downloader::downloader::formats::{AudioFormat, Container, VideoFormat};
use media_downloader::downloader::models::{TrackItem, VideoItem};
use media_downloader::downloader::traits::{DownloadEngine, EngineInvocation, NoProgress};
use media_downloader::downloader::Downloader;
use media_downloader::{
    BatchRequest, CancellationToken, Collection, DownloadError, DownloadResult, ErrorKind,
    FetcherConfig, MediaFetcher, MediaItem, OutputFormat, ProgressEvent, ProgressSink, Provider,
    Resolved,
};
use std::io::Cursor;
use std::sync::Mutex;
use std::time::Duration;

/// Writes `<title>.<ext>` unless the URL contains "fail" or "hang"
struct ScriptedEngine {
    provider: Provider,
}

#[async_trait]
impl DownloadEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn download_timeout(&self) -> Duration {
        Duration::from_secs(2)
    }

    async fn invoke(
        &self,
        invocation: &EngineInvocation,
        progress: &dyn ProgressSink,
    ) -> Result<(), DownloadError> {
        if invocation.source_url.contains("hang") {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        if invocation.source_url.contains("fail") {
            return Err(DownloadError::EngineFailure {
                tool: "scripted".to_string(),
                message: "Private video (exit code 1)".to_string(),
            });
        }
        progress.emit(ProgressEvent::status("100.0%"));
        let id = invocation
            .source_url
            .rsplit('=')
            .next()
            .unwrap_or("file")
            .to_string();
        let name = format!("{}.{}", id, invocation.format.extension());
        std::fs::write(invocation.output_dir.join(name), id.as_bytes()).unwrap();
        Ok(())
    }
}

struct FixedResolver;

#[async_trait]
impl MetadataResolver for FixedResolver {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn provider(&self) -> Provider {
        Provider::YouTube
    }

    async fn resolve(
        &self,
        _url: &str,
        progress: &dyn ProgressSink,
    ) -> Result<Resolved, DownloadError> {
        let items: Vec<MediaItem> = ["one", "two", "three"]
            .iter()
            .map(|id| video(id, &format!("https://www.youtube.com/watch?v={}", id)))
            .collect();
        for i in 0..items.len() {
            progress.emit(ProgressEvent::step(i + 1, items.len()));
        }
        Ok(Resolved::Collection(Collection::new(
            "PL1",
            "Road Trip: Vol/1",
            "Channel",
            Provider::YouTube,
            items,
        )))
    }
}

fn video(id: &str, url: &str) -> MediaItem {
    MediaItem::Video(VideoItem {
        id: id.to_string(),
        title: format!("Video {}", id),
        duration_seconds: 100,
        thumbnail_url: String::new(),
        source_url: url.to_string(),
        uploader: "Channel".to_string(),
        view_count: 1,
        upload_date: "20240101".to_string(),
    })
}

fn fetcher(work_root: &std::path::Path) -> MediaFetcher {
    let downloader = Downloader::new()
        .with_engine(Box::new(ScriptedEngine {
            provider: Provider::YouTube,
        }))
        .with_engine(Box::new(ScriptedEngine {
            provider: Provider::Spotify,
        }));
    let resolvers: Vec<Box<dyn MetadataResolver>> = vec![Box::new(FixedResolver)];
    MediaFetcher::from_parts(
        FetcherConfig::default().with_work_root(work_root),
        resolvers,
        downloader,
    )
}

fn leftover_entries(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn resolve_select_download_and_zip() {
    let root = tempfile::tempdir().unwrap();
    let fetcher = fetcher(root.path());

    let resolved = fetcher
        .fetch_info("https://www.youtube.com/playlist?list=PL1", &NoProgress)
        .await
        .unwrap();
    let Resolved::Collection(collection) = resolved else {
        panic!("expected a collection");
    };
    assert_eq!(collection.total_duration, Duration::from_secs(300));

    let request = BatchRequest::new(
        collection.select(&[0, 2]),
        OutputFormat::Audio(AudioFormat::Mp3),
    )
    .with_title(collection.title.clone());

    let outcome = fetcher
        .download(&request, &NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.summary(), "2 of 2 succeeded");
    assert!(!outcome.is_partial());
    assert_eq!(outcome.payload.filename, "Road Trip_ Vol_1_downloads.zip");
    assert_eq!(outcome.payload.mime, "application/zip");

    let mut archive = zip::ZipArchive::new(Cursor::new(outcome.payload.bytes.clone())).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["one.mp3", "three.mp3"]);

    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test(start_paused = true)]
async fn middle_timeout_yields_partial_archive() {
    let root = tempfile::tempdir().unwrap();
    let fetcher = fetcher(root.path());
    let items = vec![
        video("a", "https://www.youtube.com/watch?v=a"),
        video("b", "https://www.youtube.com/watch?v=hang"),
        video("c", "https://www.youtube.com/watch?v=c"),
    ];
    let request = BatchRequest::new(items, OutputFormat::Audio(AudioFormat::Mp3));

    let labels = Mutex::new(Vec::new());
    let sink = |event: ProgressEvent| {
        if let ProgressEvent::Determinate {
            label: Some(label), ..
        } = event
        {
            labels.lock().unwrap().push(label);
        }
    };

    let outcome = fetcher
        .download(&request, &sink, &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.results[0].is_success());
    assert!(matches!(
        outcome.results[1],
        DownloadResult::Failure {
            kind: ErrorKind::Timeout,
            ..
        }
    ));
    assert!(outcome.results[2].is_success());
    assert!(outcome.is_partial());
    assert_eq!(outcome.summary(), "2 of 3 succeeded");
    assert_eq!(outcome.payload.filename, "media_downloads.zip");

    let archive = zip::ZipArchive::new(Cursor::new(outcome.payload.bytes.clone())).unwrap();
    assert_eq!(archive.len(), 2);
    assert_eq!(
        labels.into_inner().unwrap(),
        vec!["Video a", "Video b", "Video c"]
    );
}

#[tokio::test]
async fn single_success_is_delivered_raw() {
    let root = tempfile::tempdir().unwrap();
    let fetcher = fetcher(root.path());
    let request = BatchRequest::new(
        vec![video("solo", "https://youtu.be/x?v=solo")],
        OutputFormat::Video(VideoFormat::Capped {
            container: Container::Mp4,
            height: 720,
        }),
    );

    let outcome = fetcher
        .download(&request, &NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.payload.filename, "solo.mp4");
    assert_eq!(outcome.payload.mime, "video/mp4");
    assert_eq!(outcome.payload.bytes, b"solo");
    assert_eq!(leftover_entries(root.path()), 0);
}

#[tokio::test]
async fn spotify_tracks_use_the_spotify_engine() {
    let root = tempfile::tempdir().unwrap();
    let fetcher = fetcher(root.path());
    let track = MediaItem::Track(TrackItem {
        id: "t1".to_string(),
        name: "Song".to_string(),
        artists: vec!["Artist".to_string()],
        album: "Album".to_string(),
        duration_ms: 180_000,
        source_url: "https://open.spotify.com/track/x?si=t1".to_string(),
        cover_url: String::new(),
    });
    let request = BatchRequest::new(vec![track], OutputFormat::Audio(AudioFormat::Flac));

    let outcome = fetcher
        .download(&request, &NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.payload.filename, "t1.flac");
    assert_eq!(outcome.payload.mime, "audio/flac");
}

#[tokio::test]
async fn hard_errors_surface_to_the_caller() {
    let root = tempfile::tempdir().unwrap();
    let fetcher = fetcher(root.path());
    let format = OutputFormat::Audio(AudioFormat::Mp3);

    let err = fetcher
        .download(
            &BatchRequest::new(Vec::new(), format),
            &NoProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::EmptyBatch));

    let all_fail = BatchRequest::new(
        vec![
            video("x", "https://www.youtube.com/watch?v=fail1"),
            video("y", "https://www.youtube.com/watch?v=fail2"),
        ],
        format,
    );
    let err = fetcher
        .download(&all_fail, &NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AllItemsFailed);
    let failures = err.item_failures();
    assert_eq!(failures.len(), 2);
    for (failure, label) in failures.iter().zip(["Video x", "Video y"]) {
        match failure {
            DownloadResult::Failure {
                item_label,
                kind,
                error_message,
            } => {
                assert_eq!(item_label, label);
                assert_eq!(*kind, ErrorKind::EngineFailure);
                assert!(error_message.contains("Private video"));
            }
            other => panic!("unexpected success: {:?}", other),
        }
    }
    assert_eq!(leftover_entries(root.path()), 0);

    let err = fetcher
        .fetch_info("https://example.com/video", &NoProgress)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUrl);
}

#[tokio::test]
async fn cancelled_request_reports_every_item() {
    let root = tempfile::tempdir().unwrap();
    let fetcher = fetcher(root.path());
    let request = BatchRequest::new(
        vec![
            video("a", "https://www.youtube.com/watch?v=a"),
            video("b", "https://www.youtube.com/watch?v=b"),
        ],
        OutputFormat::Audio(AudioFormat::Mp3),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fetcher
        .download(&request, &NoProgress, &cancel)
        .await
        .unwrap_err();
    assert!(err
        .item_failures()
        .iter()
        .all(|r| matches!(r, DownloadResult::Failure { kind: ErrorKind::Cancelled, .. })));
    assert_eq!(err.item_failures().len(), 2);
}
