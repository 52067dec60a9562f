use std::path::Path;

use id3::frame::{Lyrics, Picture, PictureType};
use id3::{ErrorKind, Tag, TagLike, Version};
use tracing::debug;

use super::{TagWriter, TrackTags};
use crate::error::Result;

const LYRICS_LANG: &str = "chi";

/// ID3v2.4 frames for MP3 files. There is no slot for translated lyrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct LossyTagWriter;

impl TagWriter for LossyTagWriter {
    fn write(&self, path: &Path, tags: &TrackTags) -> Result<()> {
        let mut tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, ErrorKind::NoTag) => Tag::new(),
            Err(e) => return Err(e.into()),
        };

        // stale frames from an earlier run
        for id in ["TIT2", "TPE1", "TALB", "APIC", "USLT"] {
            tag.remove(id);
        }

        tag.set_title(tags.title.as_str());
        tag.set_artist(tags.artist.as_str());
        if let Some(album) = &tags.album {
            tag.set_album(album.as_str());
        }

        if let Some(cover) = &tags.cover {
            tag.add_frame(Picture {
                mime_type: cover.mime_type().to_string(),
                picture_type: PictureType::CoverFront,
                description: String::new(),
                data: cover.data.clone(),
            });
        }

        if let Some(lyrics) = &tags.lyrics {
            tag.add_frame(Lyrics {
                lang: LYRICS_LANG.to_string(),
                description: String::new(),
                text: lyrics.lyric.clone(),
            });
        }

        tag.write_to_path(path, Version::Id3v24)?;
        debug!(path = %path.display(), "wrote ID3 tags");
        Ok(())
    }
}
