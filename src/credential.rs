//! Session credential: local persistence, remote provider and expiry checks.
//!
//! The token is produced by an external QR-code login flow. This crate only
//! stores it as JSON and reads it back; without one, downloads run anonymously
//! and fall back to the tiers the catalog serves for free.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::download::HttpClient;
use crate::error::{QmdlError, Result};

/// Authenticated session token
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Credential {
    pub openid: String,
    pub refresh_token: String,
    pub access_token: String,
    pub expired_at: i64,
    pub musicid: u64,
    pub musickey: String,
    pub unionid: String,
    pub str_musicid: String,
    pub refresh_key: String,
    pub encrypt_uin: String,
    pub login_type: i64,
    pub musickey_createtime: i64,
    pub key_expires_in: i64,
}

impl Credential {
    /// Read a credential file; a missing file is not an error.
    pub async fn load(path: &Path) -> Result<Option<Credential>> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let credential: Credential = serde_json::from_slice(&content)?;
        if credential.musicid == 0 || credential.musickey.is_empty() {
            return Err(QmdlError::CredentialError(format!(
                "{} has no musicid/musickey",
                path.display()
            )));
        }
        Ok(Some(credential))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Fetch a credential from `GET {endpoint}/api/credential`
    pub async fn fetch_remote(http: &HttpClient, endpoint: &str) -> Result<Credential> {
        let url = format!("{}/api/credential", endpoint.trim_end_matches('/'));
        let credential: Credential = http.get_json(&url).await?;
        if credential.musicid == 0 || credential.musickey.is_empty() {
            return Err(QmdlError::CredentialError(format!(
                "{url} returned an empty credential"
            )));
        }
        Ok(credential)
    }

    /// When the music key stops being accepted, if known
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.musickey_createtime <= 0 || self.key_expires_in <= 0 {
            return None;
        }
        DateTime::from_timestamp(self.musickey_createtime + self.key_expires_in, 0)
    }

    /// Keys without expiry information are assumed valid
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|t| t <= now)
    }

    pub fn can_refresh(&self) -> bool {
        !self.refresh_key.is_empty() && !self.refresh_token.is_empty()
    }

    /// Cookie header carrying the session
    pub fn cookie(&self) -> String {
        format!(
            "uin={}; qqmusic_key={}; qm_keyst={}",
            self.musicid, self.musickey, self.musickey
        )
    }

    /// Field listing with secrets shortened, for status output
    pub fn masked(&self) -> Vec<(&'static str, String)> {
        vec![
            ("musicid", self.musicid.to_string()),
            ("musickey", mask(&self.musickey)),
            ("refresh_token", mask(&self.refresh_token)),
            ("access_token", mask(&self.access_token)),
            ("login_type", self.login_type.to_string()),
            (
                "expires_at",
                self.expires_at()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
        ]
    }
}

fn mask(value: &str) -> String {
    if value.chars().count() > 10 {
        let head: String = value.chars().take(10).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}

/// Resolves the optional credential from a file, then a remote endpoint
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    pub file: PathBuf,
    pub endpoint: Option<String>,
}

impl CredentialProvider {
    pub fn new(file: impl Into<PathBuf>, endpoint: Option<String>) -> Self {
        Self {
            file: file.into(),
            endpoint,
        }
    }

    /// `None` means anonymous operation; every failure degrades to that.
    pub async fn resolve(&self, http: &HttpClient) -> Option<Credential> {
        match Credential::load(&self.file).await {
            Ok(Some(cred)) if cred.is_expired(Utc::now()) => {
                warn!(file = %self.file.display(), "local credential expired, ignoring it");
            }
            Ok(Some(cred)) => {
                info!(musicid = cred.musicid, "using local credential");
                return Some(cred);
            }
            Ok(None) => {}
            Err(e) => warn!(file = %self.file.display(), error = %e, "failed to load credential"),
        }

        let endpoint = self.endpoint.as_deref()?;
        match Credential::fetch_remote(http, endpoint).await {
            Ok(cred) => {
                info!(musicid = cred.musicid, endpoint, "using remote credential");
                Some(cred)
            }
            Err(e) => {
                warn!(endpoint, error = %e, "failed to fetch remote credential");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credential {
        Credential {
            musicid: 12345,
            musickey: "Q_H_L_abcdefghijklmnop".to_string(),
            musickey_createtime: 1_700_000_000,
            key_expires_in: 259_200,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cred.json");

        let cred = sample();
        cred.save(&path).await.unwrap();
        let loaded = Credential::load(&path).await.unwrap();
        assert_eq!(loaded, Some(cred));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Credential::load(&dir.path().join("absent.json")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_rejects_empty_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cred.json");
        tokio::fs::write(&path, r#"{"musicid": 1}"#).await.unwrap();
        assert!(matches!(
            Credential::load(&path).await,
            Err(QmdlError::CredentialError(_))
        ));
    }

    #[test]
    fn test_expiry() {
        let cred = sample();
        let before = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let after = DateTime::from_timestamp(1_700_259_200, 0).unwrap();
        assert!(!cred.is_expired(before));
        assert!(cred.is_expired(after));

        let unknown = Credential {
            key_expires_in: 0,
            ..sample()
        };
        assert!(!unknown.is_expired(after));
    }

    #[test]
    fn test_masked() {
        let masked = sample().masked();
        assert_eq!(masked[0], ("musicid", "12345".to_string()));
        assert_eq!(masked[1], ("musickey", "Q_H_L_abcd...".to_string()));
    }

    #[tokio::test]
    async fn test_provider_without_sources_is_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CredentialProvider::new(dir.path().join("none.json"), None);
        assert!(provider.resolve(&HttpClient::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_provider_ignores_expired_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cred.json");
        sample().save(&path).await.unwrap();

        let provider = CredentialProvider::new(&path, None);
        assert!(provider.resolve(&HttpClient::default()).await.is_none());
    }
}
