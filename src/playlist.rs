//! Playlist selection and folder layout.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::{Catalog, PlaylistSummary, Track};
use crate::credential::Credential;
use crate::error::{QmdlError, Result};
use crate::utils::sanitize;

/// `dirId` of a user's own "liked songs" list
pub const FAVORITES_DIR_ID: u64 = 201;

impl PlaylistSummary {
    pub fn is_favorites(&self) -> bool {
        self.dir_id == FAVORITES_DIR_ID
    }
}

/// Folder for a playlist's downloads, prefixed with the owner to keep
/// same-named lists of different users apart
pub fn playlist_folder(root: &Path, playlist: &PlaylistSummary, user_id: Option<&str>) -> PathBuf {
    let name = match user_id {
        Some(user) if !user.is_empty() => format!("{user}_{}", playlist.title),
        _ => playlist.title.clone(),
    };
    root.join(sanitize(&name))
}

/// Pick a playlist by 1-based position in the listing, or by its `tid`
pub fn select<'a>(playlists: &'a [PlaylistSummary], selector: &str) -> Result<&'a PlaylistSummary> {
    let value: u64 = selector.trim().parse().map_err(|_| {
        QmdlError::ValidationError(format!("playlist selector must be a number: {selector}"))
    })?;
    if value >= 1
        && let Some(playlist) = usize::try_from(value - 1).ok().and_then(|i| playlists.get(i))
    {
        return Ok(playlist);
    }
    playlists
        .iter()
        .find(|p| p.tid == value && p.tid != 0)
        .ok_or_else(|| QmdlError::ValidationError(format!("no playlist matches {selector}")))
}

/// Tracks of `playlist`. The favorites list is only readable by its owner.
pub async fn tracks<C: Catalog + ?Sized>(
    catalog: &C,
    playlist: &PlaylistSummary,
    owner_id: &str,
    credential: Option<&Credential>,
) -> Result<Vec<Track>> {
    if playlist.is_favorites() {
        let own = credential.is_some_and(|c| c.musicid.to_string() == owner_id.trim());
        if !own {
            return Err(QmdlError::CredentialError(
                "the favorites playlist is private to its owner".to_string(),
            ));
        }
        let tracks = catalog.playlist_tracks(0, FAVORITES_DIR_ID, credential).await?;
        info!(playlist = %playlist.title, count = tracks.len(), "loaded favorites");
        return Ok(tracks);
    }

    let tracks = catalog.playlist_tracks(playlist.tid, 0, credential).await?;
    info!(playlist = %playlist.title, count = tracks.len(), "loaded playlist");
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCatalog;

    fn lists() -> Vec<PlaylistSummary> {
        vec![
            PlaylistSummary {
                tid: 0,
                dir_id: FAVORITES_DIR_ID,
                title: "我喜欢".to_string(),
                song_count: 3,
            },
            PlaylistSummary {
                tid: 7788,
                dir_id: 2,
                title: "Road/Trip".to_string(),
                song_count: 1,
            },
        ]
    }

    #[test]
    fn test_playlist_folder() {
        let lists = lists();
        assert_eq!(
            playlist_folder(Path::new("music"), &lists[1], Some("123")),
            Path::new("music").join("123_Road_Trip")
        );
        assert_eq!(
            playlist_folder(Path::new("music"), &lists[1], None),
            Path::new("music").join("Road_Trip")
        );
    }

    #[test]
    fn test_select() {
        let lists = lists();
        assert_eq!(select(&lists, "1").unwrap().dir_id, FAVORITES_DIR_ID);
        assert_eq!(select(&lists, "7788").unwrap().title, "Road/Trip");
        assert!(select(&lists, "0").is_err());
        assert!(select(&lists, "3").is_err());
        assert!(select(&lists, "abc").is_err());
    }

    #[tokio::test]
    async fn test_favorites_require_owner() {
        let catalog = FakeCatalog::default().with_tracks(vec![Track::new("a", "b", "c")]);
        let lists = lists();
        let favorites = &lists[0];
        let cred = Credential {
            musicid: 123,
            musickey: "k".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            tracks(&catalog, favorites, "456", Some(&cred)).await,
            Err(QmdlError::CredentialError(_))
        ));
        assert!(tracks(&catalog, favorites, "123", None).await.is_err());
        assert_eq!(
            tracks(&catalog, favorites, "123", Some(&cred)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_regular_playlist() {
        let catalog = FakeCatalog::default().with_tracks(vec![Track::new("a", "b", "c")]);
        let lists = lists();
        let list = &lists[1];
        assert_eq!(tracks(&catalog, list, "456", None).await.unwrap().len(), 1);
    }
}
