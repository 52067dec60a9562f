//! Tag embedding, one writer per container format.

mod flac;
mod mp3;

use std::path::Path;

pub use flac::LosslessTagWriter;
pub use mp3::LossyTagWriter;

use crate::core::{Lyrics, Track};
use crate::cover::Cover;
use crate::error::{QmdlError, Result};

/// Everything written into a downloaded file
#[derive(Debug, Clone, Default)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub lyrics: Option<Lyrics>,
    pub cover: Option<Cover>,
}

impl TrackTags {
    pub fn new(track: &Track, lyrics: Option<Lyrics>, cover: Option<Cover>) -> Self {
        Self {
            title: track.name.clone(),
            artist: track.singer.clone(),
            album: track.album_name.clone().filter(|a| !a.is_empty()),
            lyrics: lyrics.filter(|l| !l.lyric.is_empty()),
            cover,
        }
    }
}

/// Writes [`TrackTags`] into one container format
pub trait TagWriter: Send + Sync {
    fn write(&self, path: &Path, tags: &TrackTags) -> Result<()>;
}

/// Pick the writer for a file by its extension
pub fn writer_for(path: &Path) -> Option<&'static dyn TagWriter> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "flac" => Some(&LosslessTagWriter),
        "mp3" => Some(&LossyTagWriter),
        _ => None,
    }
}

/// Embed tags into `path`. The audio file is left in place on failure.
pub fn write_metadata(path: &Path, tags: &TrackTags) -> Result<()> {
    let writer = writer_for(path).ok_or_else(|| {
        QmdlError::MetadataError(format!("unsupported container: {}", path.display()))
    })?;
    writer.write(path, tags)
}
