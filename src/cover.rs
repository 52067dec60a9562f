//! Cover art discovery.
//!
//! Candidates come from the album mid first, then from the track's `vs` hints.
//! Each candidate is confirmed by downloading it and sniffing the bytes; the
//! first real JPEG/PNG wins and its bytes are kept for embedding.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Track;
use crate::download::Fetch;
use crate::error::{QmdlError, Result};
use crate::utils::{MIN_FILE_SIZE, is_valid_image};

const VS_MIN_LEN: usize = 3;

/// Allowed cover edge lengths
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CoverSize {
    S150,
    S300,
    #[default]
    S500,
    S800,
}

impl CoverSize {
    pub fn pixels(&self) -> u32 {
        match self {
            CoverSize::S150 => 150,
            CoverSize::S300 => 300,
            CoverSize::S500 => 500,
            CoverSize::S800 => 800,
        }
    }
}

impl TryFrom<u32> for CoverSize {
    type Error = QmdlError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            150 => Ok(CoverSize::S150),
            300 => Ok(CoverSize::S300),
            500 => Ok(CoverSize::S500),
            800 => Ok(CoverSize::S800),
            _ => Err(QmdlError::ValidationError(format!(
                "cover size must be 150, 300, 500 or 800, got {value}"
            ))),
        }
    }
}

/// Where a candidate came from; lower sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CoverSource {
    Album = 0,
    VsAtomic = 1,
    VsPart = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverCandidate {
    pub value: String,
    pub source: CoverSource,
}

impl CoverCandidate {
    pub fn url(&self, size: CoverSize) -> String {
        match self.source {
            CoverSource::Album => album_cover_url(&self.value, size),
            CoverSource::VsAtomic | CoverSource::VsPart => vs_cover_url(&self.value, size),
        }
    }
}

/// A validated cover image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub url: String,
    pub data: Vec<u8>,
}

impl Cover {
    pub fn mime_type(&self) -> &'static str {
        let is_png = url::Url::parse(&self.url)
            .map(|u| u.path().to_ascii_lowercase().ends_with(".png"))
            .unwrap_or_else(|_| self.url.to_ascii_lowercase().ends_with(".png"));
        if is_png { "image/png" } else { "image/jpeg" }
    }
}

pub fn album_cover_url(album_mid: &str, size: CoverSize) -> String {
    let px = size.pixels();
    format!("https://y.gtimg.cn/music/photo_new/T002R{px}x{px}M000{album_mid}.jpg")
}

pub fn vs_cover_url(vs: &str, size: CoverSize) -> String {
    let px = size.pixels();
    format!("https://y.qq.com/music/photo_new/T062R{px}x{px}M000{vs}.jpg")
}

/// Candidates built from `vs` hints, stable-sorted by priority
pub fn vs_candidates(vs: &[String]) -> Vec<CoverCandidate> {
    let mut candidates = Vec::new();
    for hint in vs {
        if hint.contains(',') {
            candidates.extend(
                hint.split(',')
                    .map(str::trim)
                    .filter(|part| part.len() >= VS_MIN_LEN)
                    .map(|part| CoverCandidate {
                        value: part.to_string(),
                        source: CoverSource::VsPart,
                    }),
            );
        } else {
            let hint = hint.trim();
            if hint.len() >= VS_MIN_LEN {
                candidates.push(CoverCandidate {
                    value: hint.to_string(),
                    source: CoverSource::VsAtomic,
                });
            }
        }
    }
    candidates.sort_by_key(|c| c.source);
    candidates
}

/// Every candidate for a track in the order they are probed
pub fn candidates(track: &Track) -> Vec<CoverCandidate> {
    let mut list = Vec::new();
    if let Some(mid) = track.album_mid.as_deref()
        && !mid.is_empty()
    {
        list.push(CoverCandidate {
            value: mid.to_string(),
            source: CoverSource::Album,
        });
    }
    list.extend(vs_candidates(&track.vs));
    list
}

#[derive(Debug, Clone, Copy)]
pub struct CoverResolver {
    size: CoverSize,
    min_size: usize,
}

impl Default for CoverResolver {
    fn default() -> Self {
        Self::new(CoverSize::default())
    }
}

impl CoverResolver {
    pub fn new(size: CoverSize) -> Self {
        Self {
            size,
            min_size: MIN_FILE_SIZE,
        }
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// First candidate that downloads as a real image. Absence is not an error.
    pub async fn resolve<F: Fetch + ?Sized>(&self, fetch: &F, track: &Track) -> Option<Cover> {
        for candidate in candidates(track) {
            let url = candidate.url(self.size);
            if let Some(data) = self.probe(fetch, &url).await {
                debug!(track = %track.display_name(), url = %url, source = ?candidate.source, "cover resolved");
                return Some(Cover { url, data });
            }
        }
        debug!(track = %track.display_name(), "no cover found");
        None
    }

    async fn probe<F: Fetch + ?Sized>(&self, fetch: &F, url: &str) -> Option<Vec<u8>> {
        match fetch.get_bytes(url).await {
            Ok(data) if is_valid_image(&data, self.min_size) => Some(data),
            Ok(data) => {
                debug!(url, len = data.len(), "cover probe returned no usable image");
                None
            }
            Err(e) => {
                debug!(url, error = %e, "cover probe failed");
                None
            }
        }
    }
}
