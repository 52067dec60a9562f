pub mod batch;
pub mod config;
pub mod core;
pub mod cover;
pub mod credential;
pub mod download;
pub mod downloader;
pub mod error;
pub mod playlist;
pub mod qqmusic;
pub mod tag;
pub mod utils;

#[cfg(test)]
mod testing;

pub use batch::{BatchOptions, BatchProgress, BatchSummary, download_many};
pub use config::Config;
pub use core::{Catalog, Lyrics, Outcome, PlaylistSummary, QualityStrategy, QualityTier, Track};
pub use cover::{Cover, CoverResolver, CoverSize};
pub use credential::{Credential, CredentialProvider};
pub use download::{Fetch, HttpClient};
pub use downloader::{DownloadOptions, Downloader};
pub use error::{QmdlError, Result};
pub use qqmusic::QqMusic;

/// Downloader wired to the QQ Music catalog and a fresh HTTP session
pub fn downloader(config: &Config) -> Result<Downloader<QqMusic, HttpClient>> {
    let covers = CoverResolver::new(config.cover_size()?).with_min_size(config.min_file_size);
    Ok(Downloader::new(QqMusic::new(config.timeout()), HttpClient::new(config.timeout()))
        .with_covers(covers)
        .with_options(DownloadOptions {
            min_file_size: config.min_file_size,
            write_metadata: config.write_metadata,
        }))
}
