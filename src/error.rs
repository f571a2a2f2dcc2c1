// Error types shared by every step of the publisher. Each pipeline step
// returns `Result<T>` and the first error aborts the run.

use std::path::PathBuf;

use thiserror::Error;

/// VK error codes that mean the token or app lacks rights for the call.
const AUTH_ERROR_CODES: &[i64] = &[5, 7, 15, 17, 27, 28];

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("configuration error: {name} {reason}")]
    Config { name: &'static str, reason: String },

    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} failed with status {status}")]
    RemoteFetch { url: String, status: u16 },

    #[error("malformed response from {context}: {reason}")]
    MalformedResponse { context: String, reason: String },

    #[error("VK API error {code}: {message}")]
    Platform { code: i64, message: String },

    #[error("VK authorization error {code}: {message}")]
    Auth { code: i64, message: String },

    #[error("photo upload failed with status {status}")]
    Upload { status: u16 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Build the domain error for an embedded VK error object, picking
    /// `Auth` for authorization and permission codes.
    pub fn embedded(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        if AUTH_ERROR_CODES.contains(&code) {
            PublishError::Auth { code, message }
        } else {
            PublishError::Platform { code, message }
        }
    }

    pub(crate) fn malformed(context: impl Into<String>, reason: impl ToString) -> Self {
        PublishError::MalformedResponse {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PublishError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
