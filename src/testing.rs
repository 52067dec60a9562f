//! In-memory fakes of the network collaborators, for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::{Catalog, Lyrics, PlaylistSummary, QualityTier, Track};
use crate::credential::Credential;
use crate::download::Fetch;
use crate::error::{QmdlError, Result};

pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.resize(len, 0x11);
    data
}

pub fn audio_bytes(len: usize) -> Vec<u8> {
    vec![0x55; len]
}

/// Serves fixed bodies by URL; anything else is a 404
#[derive(Debug, Default)]
pub struct FakeFetch {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetch {
    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetch for FakeFetch {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| QmdlError::HttpError {
                status: 404,
                url: url.to_string(),
            })
    }
}

/// Catalog with canned stream URLs per (mid, tier)
#[derive(Debug, Default)]
pub struct FakeCatalog {
    urls: HashMap<(String, QualityTier), String>,
    failing_mids: Vec<String>,
    lyrics: HashMap<String, Lyrics>,
    tracks: Vec<Track>,
    url_requests: Mutex<Vec<(String, QualityTier, bool)>>,
    lyric_requests: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn with_url(mut self, mid: &str, tier: QualityTier, url: &str) -> Self {
        self.urls.insert((mid.to_string(), tier), url.to_string());
        self
    }

    /// URL resolution for this mid returns an error
    pub fn with_failing_mid(mut self, mid: &str) -> Self {
        self.failing_mids.push(mid.to_string());
        self
    }

    pub fn with_lyrics(mut self, mid: &str, lyrics: Lyrics) -> Self {
        self.lyrics.insert(mid.to_string(), lyrics);
        self
    }

    pub fn with_tracks(mut self, tracks: Vec<Track>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn url_requests(&self) -> Vec<(String, QualityTier, bool)> {
        self.url_requests.lock().unwrap().clone()
    }

    pub fn lyric_requests(&self) -> Vec<String> {
        self.lyric_requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Catalog for FakeCatalog {
    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<Track>> {
        Ok(self
            .tracks
            .iter()
            .filter(|t| t.name.contains(keyword))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn song_urls(
        &self,
        mids: &[String],
        tier: QualityTier,
        credential: Option<&Credential>,
    ) -> Result<HashMap<String, Option<String>>> {
        let mut result = HashMap::new();
        for mid in mids {
            self.url_requests
                .lock()
                .unwrap()
                .push((mid.clone(), tier, credential.is_some()));
            if self.failing_mids.contains(mid) {
                return Err(QmdlError::ApiError {
                    code: 104003,
                    context: "UrlGetVkey".to_string(),
                });
            }
            result.insert(mid.clone(), self.urls.get(&(mid.clone(), tier)).cloned());
        }
        Ok(result)
    }

    async fn lyrics(&self, mid: &str) -> Result<Option<Lyrics>> {
        self.lyric_requests.lock().unwrap().push(mid.to_string());
        Ok(self.lyrics.get(mid).cloned())
    }

    async fn user_playlists(
        &self,
        _user_id: &str,
        _credential: &Credential,
    ) -> Result<Vec<PlaylistSummary>> {
        Ok(vec![])
    }

    async fn playlist_tracks(
        &self,
        _tid: u64,
        _dir_id: u64,
        _credential: Option<&Credential>,
    ) -> Result<Vec<Track>> {
        Ok(self.tracks.clone())
    }
}
