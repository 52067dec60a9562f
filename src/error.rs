use thiserror::Error;

#[derive(Error, Debug)]
pub enum QmdlError {
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Request timeout for URL: {0}")]
    RequestTimeout(String),

    #[error("HTTP error {status} for URL: {url}")]
    HttpError { status: u16, url: String },

    #[error("Catalog API error {code}: {context}")]
    ApiError { code: i64, context: String },

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to decode payload: {0}")]
    DecodeError(#[from] base64::DecodeError),

    #[error("Metadata error: {0}")]
    MetadataError(String),

    #[error("Invalid argument: {0}")]
    ValidationError(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

impl From<lofty::error::LoftyError> for QmdlError {
    fn from(e: lofty::error::LoftyError) -> Self {
        QmdlError::MetadataError(e.to_string())
    }
}

impl From<id3::Error> for QmdlError {
    fn from(e: id3::Error) -> Self {
        QmdlError::MetadataError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QmdlError>;
