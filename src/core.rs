use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
pub use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString};

use crate::credential::Credential;
use crate::error::{QmdlError, Result};

/// Audio fidelity levels offered by the catalog, best first.
#[allow(non_camel_case_types)]
#[derive(
    EnumIter, EnumString, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[strum(ascii_case_insensitive)]
pub enum QualityTier {
    #[strum(serialize = "master")]
    Master,
    #[strum(serialize = "atmos2", serialize = "atmos")]
    Atmos2,
    #[strum(serialize = "atmos51")]
    Atmos51,
    #[strum(serialize = "flac", serialize = "lossless")]
    Flac,
    #[strum(serialize = "ogg640")]
    Ogg640,
    #[strum(serialize = "ogg320")]
    Ogg320,
    #[strum(serialize = "ogg192")]
    Ogg192,
    #[strum(serialize = "ogg96")]
    Ogg96,
    #[strum(serialize = "mp3_320", serialize = "mp3-320", serialize = "320")]
    Mp3_320,
    #[strum(serialize = "mp3_128", serialize = "mp3-128", serialize = "128")]
    Mp3_128,
    #[strum(serialize = "aac192")]
    Aac192,
    #[strum(serialize = "aac96")]
    Aac96,
    #[strum(serialize = "aac48")]
    Aac48,
}

impl QualityTier {
    /// File name prefix the stream service expects for this tier
    pub fn prefix(&self) -> &'static str {
        match self {
            QualityTier::Master => "AI00",
            QualityTier::Atmos2 => "Q000",
            QualityTier::Atmos51 => "Q001",
            QualityTier::Flac => "F000",
            QualityTier::Ogg640 => "O801",
            QualityTier::Ogg320 => "O800",
            QualityTier::Ogg192 => "O600",
            QualityTier::Ogg96 => "O400",
            QualityTier::Mp3_320 => "M800",
            QualityTier::Mp3_128 => "M500",
            QualityTier::Aac192 => "C600",
            QualityTier::Aac96 => "C400",
            QualityTier::Aac48 => "C200",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            QualityTier::Master | QualityTier::Atmos2 | QualityTier::Atmos51 | QualityTier::Flac => {
                ".flac"
            }
            QualityTier::Ogg640 | QualityTier::Ogg320 | QualityTier::Ogg192 | QualityTier::Ogg96 => {
                ".ogg"
            }
            QualityTier::Mp3_320 | QualityTier::Mp3_128 => ".mp3",
            QualityTier::Aac192 | QualityTier::Aac96 | QualityTier::Aac48 => ".m4a",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::Master => "Master",
            QualityTier::Atmos2 => "Atmos 2.0",
            QualityTier::Atmos51 => "Atmos 5.1",
            QualityTier::Flac => "FLAC",
            QualityTier::Ogg640 => "OGG 640kbps",
            QualityTier::Ogg320 => "OGG 320kbps",
            QualityTier::Ogg192 => "OGG 192kbps",
            QualityTier::Ogg96 => "OGG 96kbps",
            QualityTier::Mp3_320 => "320kbps",
            QualityTier::Mp3_128 => "128kbps",
            QualityTier::Aac192 => "AAC 192kbps",
            QualityTier::Aac96 => "AAC 96kbps",
            QualityTier::Aac48 => "AAC 48kbps",
        }
    }

    /// Stream file name for a track at this tier
    pub fn stream_filename(&self, mid: &str) -> String {
        format!("{}{mid}{mid}{}", self.prefix(), self.extension())
    }
}

/// Ordered fallback chain of tiers for one download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityStrategy(Vec<QualityTier>);

impl QualityStrategy {
    /// Build a custom chain; must be non-empty and without duplicates.
    pub fn new(tiers: Vec<QualityTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(QmdlError::ValidationError(
                "quality strategy needs at least one tier".to_string(),
            ));
        }
        for (i, tier) in tiers.iter().enumerate() {
            if tiers[..i].contains(tier) {
                return Err(QmdlError::ValidationError(format!(
                    "tier {} listed more than once",
                    tier.label()
                )));
            }
        }
        Ok(Self(tiers))
    }

    /// 320kbps -> 128kbps
    pub fn standard() -> Self {
        Self(vec![QualityTier::Mp3_320, QualityTier::Mp3_128])
    }

    /// FLAC -> 320kbps -> 128kbps
    pub fn lossless() -> Self {
        Self(vec![QualityTier::Flac, QualityTier::Mp3_320, QualityTier::Mp3_128])
    }

    pub fn tiers(&self) -> &[QualityTier] {
        &self.0
    }

    pub fn describe(&self) -> String {
        self.0
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl Default for QualityStrategy {
    fn default() -> Self {
        Self::standard()
    }
}

/// One song as extracted from a catalog response
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub name: String,
    pub singer: String,
    pub mid: String,
    pub vip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vs: Vec<String>,
}

impl Track {
    pub fn new(name: impl Into<String>, singer: impl Into<String>, mid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            singer: singer.into(),
            mid: mid.into(),
            ..Default::default()
        }
    }

    pub fn with_album(mut self, name: impl Into<String>, mid: impl Into<String>) -> Self {
        self.album_name = Some(name.into());
        self.album_mid = Some(mid.into());
        self
    }

    pub fn with_vs(mut self, vs: Vec<String>) -> Self {
        self.vs = vs;
        self
    }

    pub fn with_vip(mut self, vip: bool) -> Self {
        self.vip = vip;
        self
    }

    /// "singer - title", as used for file names and log lines
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.singer, self.name)
    }
}

/// Lyric text with an optional translation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lyrics {
    pub lyric: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans: Option<String>,
}

/// A user's playlist as listed by the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub tid: u64,
    pub dir_id: u64,
    pub title: String,
    pub song_count: u64,
}

/// Result of downloading one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A file for one of the strategy's tiers was already on disk
    Skipped { path: PathBuf },
    Succeeded { tier: QualityTier, path: PathBuf },
    Failed,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed)
    }
}

/// Remote music catalog: search, stream URLs, lyrics and playlists
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Search songs by keyword
    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<Track>>;

    /// Resolve stream URLs for the given mids at one tier.
    /// A mid mapped to `None` is not available at this tier.
    async fn song_urls(
        &self,
        mids: &[String],
        tier: QualityTier,
        credential: Option<&Credential>,
    ) -> Result<HashMap<String, Option<String>>>;

    async fn lyrics(&self, mid: &str) -> Result<Option<Lyrics>>;

    async fn user_playlists(
        &self,
        user_id: &str,
        credential: &Credential,
    ) -> Result<Vec<PlaylistSummary>>;

    async fn playlist_tracks(
        &self,
        tid: u64,
        dir_id: u64,
        credential: Option<&Credential>,
    ) -> Result<Vec<Track>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_tier_parse() {
        assert_eq!(QualityTier::from_str("FLAC").unwrap(), QualityTier::Flac);
        assert_eq!(QualityTier::from_str("320").unwrap(), QualityTier::Mp3_320);
        assert_eq!(QualityTier::from_str("mp3-128").unwrap(), QualityTier::Mp3_128);
        assert!(QualityTier::from_str("wav").is_err());
    }

    #[test]
    fn test_stream_filename() {
        assert_eq!(
            QualityTier::Mp3_320.stream_filename("003a"),
            "M800003a003a.mp3"
        );
        assert_eq!(QualityTier::Flac.stream_filename("x"), "F000xx.flac");
    }

    #[test]
    fn test_tiers_ordered_best_first() {
        let tiers: Vec<_> = QualityTier::iter().collect();
        assert_eq!(tiers.first(), Some(&QualityTier::Master));
        assert!(QualityTier::Flac < QualityTier::Mp3_320);
    }

    #[test]
    fn test_strategy_validation() {
        assert!(QualityStrategy::new(vec![]).is_err());
        assert!(QualityStrategy::new(vec![QualityTier::Flac, QualityTier::Flac]).is_err());
        let s = QualityStrategy::new(vec![QualityTier::Flac, QualityTier::Mp3_128]).unwrap();
        assert_eq!(s.describe(), "FLAC -> 128kbps");
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            QualityStrategy::lossless().tiers(),
            &[QualityTier::Flac, QualityTier::Mp3_320, QualityTier::Mp3_128]
        );
        assert_eq!(QualityStrategy::default(), QualityStrategy::standard());
    }
}
