use std::fs::File;
use std::path::Path;

use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::AudioFile;
use lofty::flac::FlacFile;
use lofty::ogg::{OggPictureStorage, VorbisComments};
use lofty::picture::{MimeType, Picture, PictureInformation, PictureType};
use tracing::debug;

use super::{TagWriter, TrackTags};
use crate::error::Result;

const FLAC_MARKER: &[u8] = b"fLaC";
const LAST_BLOCK: u8 = 0x80;
const PADDING_TYPE: u8 = 1;
const PADDING_LEN: usize = 8192;
const STAGING_SUFFIX: &str = ".tagging";

const TITLE: &str = "TITLE";
const ARTIST: &str = "ARTIST";
const ALBUM: &str = "ALBUM";
const LYRICS: &str = "LYRICS";
const TRANSLATED_LYRICS: &str = "TRANSLATEDLYRICS";

/// Vorbis comments and a PICTURE block for FLAC files
#[derive(Debug, Clone, Copy, Default)]
pub struct LosslessTagWriter;

impl TagWriter for LosslessTagWriter {
    fn write(&self, path: &Path, tags: &TrackTags) -> Result<()> {
        ensure_padding(path)?;

        let mut file = File::open(path)?;
        let mut flac = FlacFile::read_from(&mut file, ParseOptions::new().read_properties(false))?;
        drop(file);

        let mut comments = flac.remove_vorbis_comments().unwrap_or_default();
        set_text(&mut comments, TITLE, Some(&tags.title));
        set_text(&mut comments, ARTIST, Some(&tags.artist));
        set_text(&mut comments, ALBUM, tags.album.as_deref());
        set_text(
            &mut comments,
            LYRICS,
            tags.lyrics.as_ref().map(|l| l.lyric.as_str()),
        );
        set_text(
            &mut comments,
            TRANSLATED_LYRICS,
            tags.lyrics
                .as_ref()
                .and_then(|l| l.trans.as_deref())
                .filter(|t| !t.is_empty()),
        );

        if let Some(cover) = &tags.cover {
            let old_types: Vec<PictureType> =
                comments.pictures().iter().map(|(p, _)| p.pic_type()).collect();
            for pic_type in old_types {
                comments.remove_picture_type(pic_type);
            }
            flac.remove_pictures();

            let mime = match cover.mime_type() {
                "image/png" => MimeType::Png,
                _ => MimeType::Jpeg,
            };
            let picture =
                Picture::new_unchecked(PictureType::CoverFront, Some(mime), None, cover.data.clone());
            let info = PictureInformation::from_picture(&picture).unwrap_or_default();
            flac.insert_picture(picture, Some(info))?;
        }

        flac.set_vorbis_comments(comments);
        flac.save_to_path(path, WriteOptions::default())?;
        debug!(path = %path.display(), "wrote FLAC tags");
        Ok(())
    }
}

/// Give a stream whose STREAMINFO is the only metadata block a PADDING block.
///
/// The tag writer can only grow metadata after STREAMINFO when another block
/// follows it; without one the rewrite loses the tags and clobbers audio.
/// The padded copy is staged next to the file and renamed over it.
fn ensure_padding(path: &Path) -> Result<()> {
    let data = std::fs::read(path)?;
    if !data.starts_with(FLAC_MARKER) || data.len() < 8 || data[4] & LAST_BLOCK == 0 {
        return Ok(());
    }
    let info_end = 8 + u32::from_be_bytes([0, data[5], data[6], data[7]]) as usize;
    if data.len() < info_end {
        return Ok(());
    }

    let mut padded = Vec::with_capacity(data.len() + 4 + PADDING_LEN);
    padded.extend_from_slice(&data[..4]);
    padded.push(data[4] & !LAST_BLOCK);
    padded.extend_from_slice(&data[5..info_end]);
    padded.push(LAST_BLOCK | PADDING_TYPE);
    padded.extend_from_slice(&(PADDING_LEN as u32).to_be_bytes()[1..]);
    padded.resize(padded.len() + PADDING_LEN, 0);
    padded.extend_from_slice(&data[info_end..]);

    let mut staging = path.as_os_str().to_owned();
    staging.push(STAGING_SUFFIX);
    if let Err(e) = std::fs::write(&staging, &padded).and_then(|_| std::fs::rename(&staging, path)) {
        let _ = std::fs::remove_file(&staging);
        return Err(e.into());
    }
    debug!(path = %path.display(), "added padding after STREAMINFO");
    Ok(())
}

/// Replace every value of `key`; `None` clears it
fn set_text(comments: &mut VorbisComments, key: &str, value: Option<&str>) {
    comments.remove(key).for_each(drop);
    if let Some(value) = value {
        comments.insert(key.to_string(), value.to_string());
    }
}
