use serde::{Deserialize, Serialize};

use crate::core::{PlaylistSummary, Track};

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicuResponse<T> {
    #[serde(default)]
    pub code: i64,
    pub req_0: Option<ModuleResponse<T>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleResponse<T> {
    #[serde(default)]
    pub code: i64,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Singer {
    pub id: u64,
    pub mid: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Album {
    pub id: u64,
    pub mid: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pay {
    pub pay_play: i64,
}

/// Song entry shared by search and playlist responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SongInfo {
    pub id: u64,
    pub mid: String,
    pub name: String,
    pub title: String,
    pub singer: Vec<Singer>,
    pub album: Album,
    pub pay: Pay,
    pub vs: Vec<String>,
}

impl From<SongInfo> for Track {
    fn from(song: SongInfo) -> Self {
        let name = [song.title, song.name]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let singer = song
            .singer
            .into_iter()
            .map(|s| s.name)
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let album_name = Some(song.album.name).filter(|s| !s.is_empty());
        let album_mid = Some(song.album.mid).filter(|s| !s.is_empty());

        Track {
            name,
            singer,
            mid: song.mid,
            vip: song.pay.pay_play != 0,
            album_name,
            album_mid,
            vs: song.vs.into_iter().filter(|v| !v.is_empty()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchData {
    pub body: SearchBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBody {
    pub song: SongList,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SongList {
    pub list: Vec<SongInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VkeyData {
    pub midurlinfo: Vec<MidUrlInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MidUrlInfo {
    pub songmid: String,
    pub filename: String,
    pub purl: String,
}

/// Base64 encoded lyric payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricData {
    pub lyric: String,
    pub trans: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPlaylistData {
    pub v_playlist: Vec<PlaylistItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistItem {
    pub tid: u64,
    #[serde(rename = "dirId")]
    pub dir_id: u64,
    #[serde(rename = "dirName")]
    pub dir_name: String,
    #[serde(rename = "songNum")]
    pub song_num: u64,
}

impl From<PlaylistItem> for PlaylistSummary {
    fn from(item: PlaylistItem) -> Self {
        PlaylistSummary {
            tid: item.tid,
            dir_id: item.dir_id,
            title: item.dir_name,
            song_count: item.song_num,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DissInfoData {
    pub songlist: Vec<SongInfo>,
    pub total_song_num: u64,
}
