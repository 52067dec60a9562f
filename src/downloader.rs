//! Quality-fallback download of a single track.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::{Catalog, Outcome, QualityStrategy, QualityTier, Track};
use crate::cover::CoverResolver;
use crate::credential::Credential;
use crate::download::Fetch;
use crate::error::Result;
use crate::tag::{TrackTags, write_metadata};
use crate::utils::{MIN_FILE_SIZE, sanitize};

const PART_SUFFIX: &str = ".part";

/// Tunables for [`Downloader`]
#[derive(Debug, Clone, Copy)]
pub struct DownloadOptions {
    pub min_file_size: usize,
    pub write_metadata: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            min_file_size: MIN_FILE_SIZE,
            write_metadata: true,
        }
    }
}

/// File name for a track at a tier: `"{singer} - {title}{ext}"`, sanitized
pub fn file_name(track: &Track, tier: QualityTier) -> String {
    format!("{}{}", sanitize(&track.display_name()), tier.extension())
}

pub fn destination(folder: &Path, track: &Track, tier: QualityTier) -> PathBuf {
    folder.join(file_name(track, tier))
}

/// Downloads one track, walking the strategy until a tier yields a usable file.
/// Owns its byte fetcher; dropping the downloader releases it.
pub struct Downloader<C, F> {
    catalog: C,
    fetch: F,
    covers: CoverResolver,
    options: DownloadOptions,
}

impl<C: Catalog, F: Fetch> Downloader<C, F> {
    pub fn new(catalog: C, fetch: F) -> Self {
        Self {
            catalog,
            fetch,
            covers: CoverResolver::default(),
            options: DownloadOptions::default(),
        }
    }

    pub fn with_covers(mut self, covers: CoverResolver) -> Self {
        self.covers = covers;
        self
    }

    pub fn with_options(mut self, options: DownloadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn fetch(&self) -> &F {
        &self.fetch
    }

    /// Try each tier in order. A file already on disk for any of the
    /// strategy's tiers means `Skipped` before any network call; only local
    /// I/O failures are returned as errors.
    pub async fn download_one(
        &self,
        track: &Track,
        strategy: &QualityStrategy,
        credential: Option<&Credential>,
        folder: &Path,
    ) -> Result<Outcome> {
        let name = track.display_name();
        if track.mid.is_empty() {
            warn!(track = %name, "track has no mid, cannot download");
            return Ok(Outcome::Failed);
        }
        if track.vip && credential.is_none() {
            info!(track = %name, "VIP track without credential, higher tiers may be unavailable");
        }

        if let Some((tier, path)) = existing(folder, track, strategy).await? {
            info!(track = %name, tier = tier.label(), path = %path.display(), "file exists, skipping");
            return Ok(Outcome::Skipped { path });
        }

        for &tier in strategy.tiers() {
            let path = destination(folder, track, tier);
            info!(track = %name, tier = tier.label(), vip = track.vip, "trying tier");
            let Some(data) = self.fetch_tier(track, tier, credential).await else {
                continue;
            };

            tokio::fs::create_dir_all(folder).await?;
            persist(&path, &part_path(&path, track, tier), &data).await?;
            info!(track = %name, tier = tier.label(), path = %path.display(), size = data.len(), "downloaded");

            if self.options.write_metadata
                && let Err(e) = self.tag(&path, track).await
            {
                warn!(track = %name, path = %path.display(), error = %e, "failed to write metadata");
            }
            return Ok(Outcome::Succeeded { tier, path });
        }

        warn!(track = %name, strategy = %strategy.describe(), "all tiers failed");
        Ok(Outcome::Failed)
    }

    /// Resolve and download one tier; `None` is a soft miss
    async fn fetch_tier(
        &self,
        track: &Track,
        tier: QualityTier,
        credential: Option<&Credential>,
    ) -> Option<Vec<u8>> {
        let name = track.display_name();
        let mids = [track.mid.clone()];
        let url = match self.catalog.song_urls(&mids, tier, credential).await {
            Ok(mut urls) => urls.remove(&track.mid).flatten(),
            Err(e) => {
                warn!(track = %name, tier = tier.label(), error = %e, "failed to resolve stream url");
                None
            }
        };
        let Some(url) = url else {
            info!(track = %name, tier = tier.label(), "no stream url");
            return None;
        };

        match self.fetch.get_bytes(&url).await {
            Ok(data) if data.len() > self.options.min_file_size => Some(data),
            Ok(data) => {
                warn!(track = %name, tier = tier.label(), size = data.len(), "payload too small");
                None
            }
            Err(e) => {
                warn!(track = %name, tier = tier.label(), error = %e, "download failed");
                None
            }
        }
    }

    /// Lyrics and cover are best effort; only the tag write itself can fail.
    async fn tag(&self, path: &Path, track: &Track) -> Result<()> {
        let lyrics = match self.catalog.lyrics(&track.mid).await {
            Ok(lyrics) => lyrics,
            Err(e) => {
                debug!(track = %track.display_name(), error = %e, "lyrics unavailable");
                None
            }
        };
        let cover = self.covers.resolve(&self.fetch, track).await;

        let tags = TrackTags::new(track, lyrics, cover);
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || write_metadata(&path, &tags)).await?
    }
}

/// First tier of the strategy whose destination is already on disk
async fn existing(
    folder: &Path,
    track: &Track,
    strategy: &QualityStrategy,
) -> Result<Option<(QualityTier, PathBuf)>> {
    for &tier in strategy.tiers() {
        let path = destination(folder, track, tier);
        if tokio::fs::try_exists(&path).await? {
            return Ok(Some((tier, path)));
        }
    }
    Ok(None)
}

/// Staging file for one download attempt, unique per track, tier and attempt
fn part_path(path: &Path, track: &Track, tier: QualityTier) -> PathBuf {
    let mut part = path.as_os_str().to_owned();
    part.push(format!(
        ".{}{}-{:08x}{PART_SUFFIX}",
        tier.prefix(),
        sanitize(&track.mid),
        rand::random::<u32>()
    ));
    PathBuf::from(part)
}

/// Write to `part`, then rename it over the destination. The staging file
/// never outlives a failed attempt.
async fn persist(path: &Path, part: &Path, data: &[u8]) -> Result<()> {
    let result = match tokio::fs::write(part, data).await {
        Ok(()) => tokio::fs::rename(part, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        let _ = tokio::fs::remove_file(part).await;
        return Err(e.into());
    }
    Ok(())
}
