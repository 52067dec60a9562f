//! QQ Music catalog client over the unified `musicu.fcg` endpoint.

pub mod api;
pub mod types;

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use tracing::debug;

use crate::core::{Catalog, Lyrics, PlaylistSummary, QualityTier, Track};
use crate::credential::Credential;
use crate::download::HttpClient;
use crate::error::{QmdlError, Result};
use api::{ApiRequest, STREAM_DOMAIN, call, random_id};
use types::{DissInfoData, LyricData, SearchData, UserPlaylistData, VkeyData};

/// The stream service accepts at most this many mids per request
const URL_BATCH: usize = 100;
const PLAYLIST_PAGE: u64 = 100;

#[derive(Debug, Default)]
pub struct QqMusic {
    http: HttpClient,
}

impl QqMusic {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpClient::new(timeout),
        }
    }
}

/// Map a vkey response onto the requested mids; streams are always served
/// from [`STREAM_DOMAIN`]
pub fn stream_urls(mids: &[String], data: VkeyData) -> HashMap<String, Option<String>> {
    let mut urls: HashMap<String, Option<String>> =
        mids.iter().map(|mid| (mid.clone(), None)).collect();
    for info in data.midurlinfo {
        if info.purl.is_empty() {
            continue;
        }
        urls.insert(info.songmid, Some(format!("{STREAM_DOMAIN}{}", info.purl)));
    }
    urls
}

/// Decode a base64 lyric payload; empty input stays empty
pub fn decode_lyric(encoded: &str) -> Result<String> {
    if encoded.is_empty() {
        return Ok(String::new());
    }
    let bytes = STANDARD.decode(encoded.trim())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Decoded lyrics; `None` when the song has no lyric text
pub fn lyrics_from(data: LyricData) -> Result<Option<Lyrics>> {
    let lyric = decode_lyric(&data.lyric)?;
    if lyric.trim().is_empty() {
        return Ok(None);
    }
    let trans = decode_lyric(&data.trans)?;
    Ok(Some(Lyrics {
        lyric,
        trans: Some(trans).filter(|t| !t.trim().is_empty()),
    }))
}

#[async_trait::async_trait]
impl Catalog for QqMusic {
    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<Track>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(QmdlError::ValidationError(
                "search keyword must not be empty".to_string(),
            ));
        }
        if limit == 0 {
            return Err(QmdlError::ValidationError(
                "search limit must be at least 1".to_string(),
            ));
        }

        let request = ApiRequest::new(
            "music.search.SearchCgiService",
            "DoSearchForQQMusicDesktop",
            json!({
                "searchid": random_id(),
                "query": keyword,
                "search_type": 0,
                "num_per_page": limit,
                "page_num": 1,
                "highlight": 0,
                "grp": 1,
            }),
        );
        let data: SearchData = call(&self.http, &request, None).await?;
        Ok(data
            .body
            .song
            .list
            .into_iter()
            .take(limit)
            .map(Track::from)
            .collect())
    }

    async fn song_urls(
        &self,
        mids: &[String],
        tier: QualityTier,
        credential: Option<&Credential>,
    ) -> Result<HashMap<String, Option<String>>> {
        let mut urls = HashMap::with_capacity(mids.len());
        for chunk in mids.chunks(URL_BATCH) {
            let filenames: Vec<String> = chunk.iter().map(|mid| tier.stream_filename(mid)).collect();
            let uin = credential.map(|c| c.musicid.to_string()).unwrap_or_default();
            let request = ApiRequest::new(
                "music.vkey.GetVkey",
                "UrlGetVkey",
                json!({
                    "filename": filenames,
                    "guid": random_id(),
                    "songmid": chunk,
                    "songtype": vec![0; chunk.len()],
                    "uin": uin,
                    "loginflag": 1,
                    "platform": "20",
                }),
            );
            let data: VkeyData = call(&self.http, &request, credential).await?;
            urls.extend(stream_urls(chunk, data));
        }
        debug!(
            tier = tier.label(),
            requested = mids.len(),
            resolved = urls.values().filter(|u| u.is_some()).count(),
            "resolved stream urls"
        );
        Ok(urls)
    }

    async fn lyrics(&self, mid: &str) -> Result<Option<Lyrics>> {
        let request = ApiRequest::new(
            "music.musichallSong.PlayLyricInfo",
            "GetPlayLyricInfo",
            json!({
                "songMID": mid,
                "crypt": 0,
                "ct": 11,
                "cv": 13020508,
                "lrc_t": 0,
                "qrc": 0,
                "qrc_t": 0,
                "roma": 0,
                "roma_t": 0,
                "trans": 1,
                "trans_t": 0,
                "type": 1,
            }),
        );
        let data: LyricData = call(&self.http, &request, None).await?;
        lyrics_from(data)
    }

    async fn user_playlists(
        &self,
        user_id: &str,
        credential: &Credential,
    ) -> Result<Vec<PlaylistSummary>> {
        if user_id.trim().is_empty() {
            return Err(QmdlError::ValidationError(
                "user id must not be empty".to_string(),
            ));
        }
        let request = ApiRequest::new(
            "music.musicasset.PlaylistBaseRead",
            "GetPlaylistByUin",
            json!({ "uin": user_id.trim() }),
        );
        let data: UserPlaylistData = call(&self.http, &request, Some(credential)).await?;
        Ok(data.v_playlist.into_iter().map(PlaylistSummary::from).collect())
    }

    async fn playlist_tracks(
        &self,
        tid: u64,
        dir_id: u64,
        credential: Option<&Credential>,
    ) -> Result<Vec<Track>> {
        let mut tracks = Vec::new();
        let mut begin = 0;
        loop {
            let request = ApiRequest::new(
                "music.srfDissInfo.aiDissInfo",
                "uniform_get_Dissinfo",
                json!({
                    "disstid": tid,
                    "dirid": dir_id,
                    "tag": 1,
                    "song_begin": begin,
                    "song_num": PLAYLIST_PAGE,
                    "userinfo": 1,
                    "orderlist": 1,
                    "onlysonglist": 0,
                }),
            );
            let data: DissInfoData = call(&self.http, &request, credential).await?;
            let page_len = data.songlist.len() as u64;
            tracks.extend(data.songlist.into_iter().map(Track::from));
            begin += page_len;

            if page_len < PLAYLIST_PAGE || (data.total_song_num > 0 && begin >= data.total_song_num)
            {
                break;
            }
        }
        debug!(tid, dir_id, count = tracks.len(), "fetched playlist tracks");
        Ok(tracks)
    }
}
