//! Network related error types

use thiserror::Error;

/// HTTP transport and remote API errors
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Request failed at the transport level
    #[error("Transport failure for '{url}': {message}")]
    Transport { url: String, message: String },

    /// Request neither completed nor errored within the bound
    #[error("Request to '{url}' timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    /// Remote host answered with a failure status
    #[error("HTTP {status} from '{url}'")]
    Http { url: String, status: u16 },

    /// Response body could not be decoded
    #[error("Failed to decode response from '{url}': {message}")]
    Decode { url: String, message: String },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {message}")]
    ClientBuild { message: String },
}

impl NetworkError {
    /// Create a transport failure error
    pub fn transport(url: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(url: &str, seconds: u64) -> Self {
        Self::Timeout {
            url: url.to_string(),
            seconds,
        }
    }

    /// Create an HTTP status error
    pub fn http(url: &str, status: u16) -> Self {
        Self::Http {
            url: url.to_string(),
            status,
        }
    }

    /// Create a decode error
    pub fn decode(url: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Create an error from a reqwest error, classifying it by cause
    pub fn from_reqwest(source: reqwest::Error) -> Self {
        let url = source
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if source.is_timeout() {
            return Self::Timeout { url, seconds: 0 };
        }
        if source.is_builder() {
            return Self::ClientBuild {
                message: source.to_string(),
            };
        }
        if let Some(status) = source.status() {
            return Self::Http {
                url,
                status: status.as_u16(),
            };
        }
        if source.is_decode() {
            return Self::Decode {
                url,
                message: source.to_string(),
            };
        }
        Self::Transport {
            url,
            message: source.to_string(),
        }
    }

    /// Whether the failure is transient enough that a later retry makes sense
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            Self::Decode { .. } | Self::ClientBuild { .. } => false,
        }
    }
}
