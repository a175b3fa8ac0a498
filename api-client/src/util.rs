use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, RemoteError};

/// Helpers for consuming response bodies, turning any status above 299 into an [`ApiError`]
#[async_trait]
pub trait ToBodyContent: Sized {
    /// Pass the response through if it succeeded, otherwise decode the failure
    async fn error_for_api_status(self) -> Result<Response, ApiError>;
    async fn to_json<T: DeserializeOwned>(self) -> Result<ParsedJson<T>, ApiError>;
    async fn to_text(self) -> Result<String, ApiError>;
    /// Succeed without looking at the body
    async fn to_empty(self) -> Result<(), ApiError>;
}

/// Whether the media type (ignoring parameters such as charset) is `application/json`
pub(crate) fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}

async fn into_api_error(response: Response) -> ApiError {
    let status = response.status().as_u16();

    if !is_json(response.headers()) {
        return ApiError::Status(status);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(status, "Parsing response as remote error");

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(error) => return ApiError::Body(error),
    };

    match serde_json::from_slice::<RemoteError>(&bytes) {
        Ok(remote) => ApiError::Remote(remote),
        Err(error) => ApiError::Decode(error),
    }
}

/// Tries to convert bytes to string. If not possible, returns a string symbolizing the bytes and the length
fn bytes_to_string_with_fallback(bytes: &Bytes) -> String {
    String::from_utf8(bytes.to_vec()).unwrap_or_else(|_| format!("[{} bytes]", bytes.len()))
}

/// A decoded body together with the JSON text it came from
pub struct ParsedJson<T> {
    inner: T,
    pub raw_json: String,
}

impl<T> ParsedJson<T> {
    pub fn into_inner(self) -> T {
        self.inner
    }
    pub fn into_parts(self) -> (T, String) {
        (self.inner, self.raw_json)
    }
}

impl<T> AsRef<T> for ParsedJson<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

impl<T: Debug> Debug for ParsedJson<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

#[async_trait]
impl ToBodyContent for Response {
    async fn error_for_api_status(self) -> Result<Response, ApiError> {
        if self.status().as_u16() > 299 {
            return Err(into_api_error(self).await);
        }

        Ok(self)
    }

    async fn to_json<T: DeserializeOwned>(self) -> Result<ParsedJson<T>, ApiError> {
        let bytes = self
            .error_for_api_status()
            .await?
            .bytes()
            .await
            .map_err(ApiError::Body)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(response = %bytes_to_string_with_fallback(&bytes), "Parsing response as JSON");

        let inner = serde_json::from_slice(&bytes).map_err(ApiError::Decode)?;

        Ok(ParsedJson {
            inner,
            raw_json: bytes_to_string_with_fallback(&bytes),
        })
    }

    async fn to_text(self) -> Result<String, ApiError> {
        let bytes = self
            .error_for_api_status()
            .await?
            .bytes()
            .await
            .map_err(ApiError::Body)?;

        Ok(bytes_to_string_with_fallback(&bytes))
    }

    async fn to_empty(self) -> Result<(), ApiError> {
        self.error_for_api_status().await.map(|_| ())
    }
}
