use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Http { status: StatusCode, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to read response body (status {status}): {source}")]
    ReadBody {
        status: StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid response format (status {status}): {source}")]
    Decode {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request timeout after {attempts} attempts")]
    Timeout { attempts: usize },
}

impl ApiError {
    /// Status code of the response this error was built from, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. }
            | ApiError::ReadBody { status, .. }
            | ApiError::Decode { status, .. } => Some(*status),
            ApiError::RequestFailed(err) => err.status(),
            _ => None,
        }
    }

    /// True when the request never reached the server or got no usable reply.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::RequestFailed(_) | ApiError::Timeout { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Http { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            ApiError::RequestFailed(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self.status() {
            Some(StatusCode::UNAUTHORIZED) => {
                Some("Verify your API token using: jira-users auth test")
            }
            Some(StatusCode::FORBIDDEN) => {
                Some("The account lacks permission; user administration needs admin rights")
            }
            Some(StatusCode::NOT_FOUND) => Some("Check that the username or account ID is correct"),
            Some(StatusCode::TOO_MANY_REQUESTS) => Some("Reduce request frequency and retry later"),
            Some(StatusCode::BAD_REQUEST) => Some("Review the request parameters"),
            _ if matches!(self, ApiError::Timeout { .. }) => {
                Some("Check your network connection or try again later")
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
