use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{QmdlError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";
const DEFAULT_REFERER: &str = "https://y.qq.com/";

/// Byte-level GET used by the download pipeline
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    /// Download the full body of `url`
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Reusable HTTP session; the underlying client is created on first use
/// and released by [`HttpClient::close`] or on drop.
#[derive(Debug)]
pub struct HttpClient {
    client: OnceCell<reqwest::Client>,
    timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: OnceCell::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a connection pool has been established yet
    pub fn is_open(&self) -> bool {
        self.client.initialized()
    }

    /// Drop the connection pool; the next request opens a new one
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("HTTP session closed");
        }
    }

    async fn client(&self) -> Result<&reqwest::Client> {
        self.client
            .get_or_try_init(|| async {
                debug!(timeout = ?self.timeout, "opening HTTP session");
                reqwest::Client::builder()
                    .timeout(self.timeout)
                    .connect_timeout(self.timeout)
                    .cookie_store(true)
                    .build()
                    .map_err(QmdlError::from)
            })
            .await
    }

    /// Execute HTTP request with error handling
    async fn execute_request(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response> {
        let request = request.headers(create_custom_headers(headers));

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                QmdlError::RequestTimeout(url.to_string())
            } else {
                QmdlError::NetworkError(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(QmdlError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            })
        }
    }

    /// Download and parse JSON response from URL
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let client = self.client().await?;
        let response = self.execute_request(client.get(url), url, None).await?;
        response.json::<T>().await.map_err(QmdlError::from)
    }

    /// Download binary data from URL with custom headers
    pub async fn get_bytes_with_headers(&self, url: &str, headers: HeaderMap) -> Result<Vec<u8>> {
        let client = self.client().await?;
        let response = self
            .execute_request(client.get(url), url, Some(headers))
            .await?;
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                QmdlError::RequestTimeout(url.to_string())
            } else {
                QmdlError::NetworkError(e)
            }
        })?;
        Ok(bytes.to_vec())
    }

    /// Execute POST request with JSON body and custom headers
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<T> {
        let client = self.client().await?;
        let response = self
            .execute_request(client.post(url).json(body), url, Some(headers))
            .await?;
        response.json::<T>().await.map_err(QmdlError::from)
    }
}

#[async_trait::async_trait]
impl Fetch for HttpClient {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.get_bytes_with_headers(url, HeaderMap::new()).await
    }
}

/// Get default headers for requests
fn get_default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(REFERER, HeaderValue::from_static(DEFAULT_REFERER));
    headers
}

/// Create custom headers with additional values
fn create_custom_headers(additional_headers: Option<HeaderMap>) -> HeaderMap {
    let mut headers = get_default_headers();

    if let Some(custom) = additional_headers {
        headers.extend(custom);
    }

    headers
}
