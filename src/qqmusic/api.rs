use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::credential::Credential;
use crate::download::HttpClient;
use crate::error::{QmdlError, Result};
use crate::qqmusic::types::MusicuResponse;

pub const MUSICU_URL: &str = "https://u.y.qq.com/cgi-bin/musicu.fcg";
pub const STREAM_DOMAIN: &str = "https://isure.stream.qqmusic.qq.com/";

const CLIENT_VERSION: u64 = 13020508;
const CLIENT_TYPE: u64 = 11;

/// One `module.method` call against the unified endpoint
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    pub module: &'a str,
    pub method: &'a str,
    pub param: Value,
}

impl<'a> ApiRequest<'a> {
    pub fn new(module: &'a str, method: &'a str, param: Value) -> Self {
        Self {
            module,
            method,
            param,
        }
    }

    /// Request body, with the session in `comm` when logged in
    pub fn body(&self, credential: Option<&Credential>) -> Value {
        let mut comm = json!({
            "cv": CLIENT_VERSION,
            "ct": CLIENT_TYPE,
            "format": "json",
            "inCharset": "utf-8",
            "outCharset": "utf-8",
            "tmeAppID": "qqmusic",
        });
        if let Some(cred) = credential {
            comm["uin"] = json!(cred.musicid);
            comm["qq"] = json!(cred.musicid.to_string());
            comm["authst"] = json!(cred.musickey);
            comm["tmeLoginType"] = json!(cred.login_type);
        }
        json!({
            "comm": comm,
            "req_0": {
                "module": self.module,
                "method": self.method,
                "param": self.param,
            }
        })
    }

    pub fn context(&self) -> String {
        format!("{}.{}", self.module, self.method)
    }
}

fn headers(credential: Option<&Credential>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(cred) = credential {
        headers.insert(COOKIE, HeaderValue::from_str(&cred.cookie()).map_err(|e| {
            QmdlError::CredentialError(format!("credential is not a valid cookie: {e}"))
        })?);
    }
    Ok(headers)
}

/// Pull `req_0.data` out of an envelope, mapping non-zero codes to errors
pub fn unwrap_response<T>(response: MusicuResponse<T>, context: &str) -> Result<T> {
    if response.code != 0 {
        return Err(QmdlError::ApiError {
            code: response.code,
            context: context.to_string(),
        });
    }
    let module = response.req_0.ok_or_else(|| QmdlError::ApiError {
        code: -1,
        context: format!("{context}: missing req_0"),
    })?;
    if module.code != 0 {
        return Err(QmdlError::ApiError {
            code: module.code,
            context: context.to_string(),
        });
    }
    module.data.ok_or_else(|| QmdlError::ApiError {
        code: -1,
        context: format!("{context}: missing data"),
    })
}

pub async fn call<T: DeserializeOwned>(
    http: &HttpClient,
    request: &ApiRequest<'_>,
    credential: Option<&Credential>,
) -> Result<T> {
    let context = request.context();
    debug!(request = %context, "calling catalog");
    let body = request.body(credential);
    let response: MusicuResponse<T> = http
        .post_json(MUSICU_URL, &body, headers(credential)?)
        .await?;
    unwrap_response(response, &context)
}

/// Random numeric id the service expects as `guid`/`searchid`
pub fn random_id() -> String {
    rand::random_range(1_000_000_000u64..10_000_000_000u64).to_string()
}
