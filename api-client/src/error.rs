use reqwest::header::InvalidHeaderValue;
use serde::{Deserialize, Serialize};

/// The `{code, error}` envelope the service returns alongside a failing status
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("remote error: {message} ({code})")]
pub struct RemoteError {
    pub code: i64,
    #[serde(rename = "error")]
    pub message: String,
}

/// Every way a call through [`crate::LabApiClient`] can fail.
///
/// Exactly one of these, or success, comes out of a single call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to build the HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("invalid header value")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("error marshaling request")]
    Encode(#[source] serde_json::Error),

    /// The request never produced a response (refused, timed out, bad URL, ...)
    #[error("error sending request to: {path}")]
    Transport {
        path: String,
        #[source]
        source: reqwest_middleware::Error,
    },

    /// The connection dropped while the response body was being read
    #[error("error reading response body")]
    Body(#[source] reqwest::Error),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A failing status without a JSON body to explain it
    #[error("Unexpected status: {0}")]
    Status(u16),

    #[error("error decoding response")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// True when the call could not be completed at the network level
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. } | ApiError::Body(_))
    }

    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ApiError::Remote(remote) => Some(remote),
            _ => None,
        }
    }

    /// The HTTP status behind a generic status failure
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status(status) => Some(*status),
            _ => None,
        }
    }
}
