//! Runtime settings, passed explicitly into the components that need them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::BatchOptions;
use crate::cover::CoverSize;
use crate::credential::CredentialProvider;
use crate::error::{QmdlError, Result};
use crate::utils::MIN_FILE_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Root directory for downloads
    pub music_dir: PathBuf,
    /// Tracks downloaded concurrently per window
    pub batch_size: usize,
    /// Pause between windows
    pub batch_delay_secs: u64,
    /// Cover edge length in pixels: 150, 300, 500 or 800
    pub cover_size: u32,
    pub timeout_secs: u64,
    pub min_file_size: usize,
    pub write_metadata: bool,
    pub credential_file: PathBuf,
    pub credential_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            music_dir: PathBuf::from("./music"),
            batch_size: 3,
            batch_delay_secs: 1,
            cover_size: 500,
            timeout_secs: 30,
            min_file_size: MIN_FILE_SIZE,
            write_metadata: true,
            credential_file: PathBuf::from("qqmusic_cred.json"),
            credential_endpoint: None,
        }
    }
}

impl Config {
    /// Load settings from a JSON file; absent keys keep their defaults.
    pub async fn load(path: &Path) -> Result<Config> {
        let content = tokio::fs::read(path).await?;
        let config: Config = serde_json::from_slice(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(QmdlError::ValidationError(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(QmdlError::ValidationError(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        CoverSize::try_from(self.cover_size)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cover_size(&self) -> Result<CoverSize> {
        CoverSize::try_from(self.cover_size)
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            concurrency: self.batch_size,
            delay: Duration::from_secs(self.batch_delay_secs),
        }
    }

    pub fn credential_provider(&self) -> CredentialProvider {
        CredentialProvider::new(&self.credential_file, self.credential_endpoint.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.min_file_size, 1024);
        assert_eq!(config.cover_size().unwrap(), CoverSize::S500);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qmdl.json");
        tokio::fs::write(&path, r#"{"batch_size": 5, "cover_size": 800}"#)
            .await
            .unwrap();

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.cover_size().unwrap(), CoverSize::S800);
        assert_eq!(config.music_dir, PathBuf::from("./music"));
    }

    #[tokio::test]
    async fn test_load_rejects_bad_cover_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qmdl.json");
        tokio::fs::write(&path, r#"{"cover_size": 640}"#).await.unwrap();
        assert!(matches!(
            Config::load(&path).await,
            Err(QmdlError::ValidationError(_))
        ));
    }
}
