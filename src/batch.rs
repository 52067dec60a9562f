//! Windowed batch downloads with aggregate accounting.

use std::path::Path;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::core::{Catalog, Outcome, QualityStrategy, Track};
use crate::credential::Credential;
use crate::download::Fetch;
use crate::downloader::Downloader;
use crate::error::{QmdlError, Result};
use crate::utils::percent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Tracks downloaded together in one window
    pub concurrency: usize,
    /// Pause between windows, not after the last one
    pub delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Running totals, reported after every window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub done: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchProgress {
    pub fn percent(&self) -> usize {
        percent(self.done, self.total)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// One entry per input track, in input order
    pub outcomes: Vec<Outcome>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Download `tracks` in windows of `options.concurrency`.
///
/// Members of a window are polled concurrently on the current task and the
/// next window starts once all of them finish. A failing track is counted,
/// never propagated.
pub async fn download_many<C: Catalog, F: Fetch>(
    downloader: &Downloader<C, F>,
    tracks: &[Track],
    strategy: &QualityStrategy,
    credential: Option<&Credential>,
    folder: &Path,
    options: BatchOptions,
    mut on_progress: impl FnMut(&BatchProgress),
) -> Result<BatchSummary> {
    if options.concurrency == 0 {
        return Err(QmdlError::ValidationError(
            "batch concurrency must be at least 1".to_string(),
        ));
    }

    let total = tracks.len();
    let mut summary = BatchSummary::default();
    let windows = tracks.chunks(options.concurrency);
    let window_count = windows.len();

    for (index, window) in windows.enumerate() {
        let results = join_all(
            window
                .iter()
                .map(|track| downloader.download_one(track, strategy, credential, folder)),
        )
        .await;

        for (track, result) in window.iter().zip(results) {
            let outcome = result.unwrap_or_else(|e| {
                warn!(track = %track.display_name(), error = %e, "download aborted");
                Outcome::Failed
            });
            if outcome.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            summary.outcomes.push(outcome);
        }

        let progress = BatchProgress {
            done: summary.outcomes.len(),
            total,
            succeeded: summary.succeeded,
            failed: summary.failed,
        };
        info!(
            done = progress.done,
            total,
            percent = progress.percent(),
            succeeded = progress.succeeded,
            failed = progress.failed,
            "batch progress"
        );
        on_progress(&progress);

        if index + 1 < window_count && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::QualityTier;
    use crate::downloader::DownloadOptions;
    use crate::testing::{FakeCatalog, FakeFetch, audio_bytes};
    use std::time::Instant;

    fn no_delay(concurrency: usize) -> BatchOptions {
        BatchOptions {
            concurrency,
            delay: Duration::ZERO,
        }
    }

    fn tracks(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("song{i}"), "artist", format!("mid{i}")))
            .collect()
    }

    fn downloader_for(tracks: &[Track]) -> Downloader<FakeCatalog, FakeFetch> {
        let mut catalog = FakeCatalog::default();
        let mut fetch = FakeFetch::default();
        for track in tracks {
            let url = format!("https://stream.test/{}.mp3", track.mid);
            catalog = catalog.with_url(&track.mid, QualityTier::Mp3_320, &url);
            fetch = fetch.with(&url, audio_bytes(2048));
        }
        Downloader::new(catalog, fetch).with_options(DownloadOptions {
            write_metadata: false,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_progress_after_each_window() {
        let dir = tempfile::tempdir().unwrap();
        let tracks = tracks(7);
        let downloader = downloader_for(&tracks);

        let mut reports = Vec::new();
        let summary = download_many(
            &downloader,
            &tracks,
            &QualityStrategy::standard(),
            None,
            dir.path(),
            no_delay(3),
            |p| reports.push(*p),
        )
        .await
        .unwrap();

        let done: Vec<_> = reports.iter().map(|p| p.done).collect();
        assert_eq!(done, vec![3, 6, 7]);
        assert_eq!(reports.last().unwrap().percent(), 100);
        assert_eq!(summary.succeeded, 7);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.total(), 7);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = tracks(2);
        list.insert(1, Track::new("ghost", "artist", "missing"));
        list.push(Track::new("no mid", "artist", ""));
        let downloader = downloader_for(&list[..1]);

        let summary = download_many(
            &downloader,
            &list,
            &QualityStrategy::standard(),
            None,
            dir.path(),
            no_delay(2),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 3);
        assert!(matches!(summary.outcomes[0], Outcome::Succeeded { .. }));
        assert_eq!(summary.outcomes[1], Outcome::Failed);
    }

    #[tokio::test]
    async fn test_io_errors_count_as_failures() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("file");
        std::fs::write(&not_a_dir, b"x").unwrap();
        let tracks = tracks(2);
        let downloader = downloader_for(&tracks);

        let summary = download_many(
            &downloader,
            &tracks,
            &QualityStrategy::standard(),
            None,
            &not_a_dir,
            no_delay(5),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(summary.failed, 2);
    }

    #[tokio::test]
    async fn test_skipped_tracks_count_as_success() {
        let dir = tempfile::tempdir().unwrap();
        let tracks = tracks(2);
        std::fs::write(dir.path().join("artist - song0.mp3"), b"done").unwrap();
        let downloader = downloader_for(&tracks);

        let summary = download_many(
            &downloader,
            &tracks,
            &QualityStrategy::standard(),
            None,
            dir.path(),
            no_delay(3),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(summary.succeeded, 2);
        assert!(matches!(summary.outcomes[0], Outcome::Skipped { .. }));
        assert_eq!(downloader.fetch().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_delay_between_windows() {
        let dir = tempfile::tempdir().unwrap();
        let tracks = tracks(4);
        let downloader = downloader_for(&tracks);
        let options = BatchOptions {
            concurrency: 2,
            delay: Duration::from_millis(50),
        };

        let start = Instant::now();
        download_many(
            &downloader,
            &tracks,
            &QualityStrategy::standard(),
            None,
            dir.path(),
            options,
            |_| {},
        )
        .await
        .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader_for(&[]);
        let result = download_many(
            &downloader,
            &tracks(1),
            &QualityStrategy::standard(),
            None,
            dir.path(),
            no_delay(0),
            |_| {},
        )
        .await;
        assert!(matches!(result, Err(QmdlError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader_for(&[]);
        let mut calls = 0;
        let summary = download_many(
            &downloader,
            &[],
            &QualityStrategy::standard(),
            None,
            dir.path(),
            no_delay(3),
            |_| calls += 1,
        )
        .await
        .unwrap();
        assert_eq!(summary, BatchSummary::default());
        assert_eq!(calls, 0);
    }
}
