use jira_users_api::error::ApiError;
use jira_users_api::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserError {
    /// The request could not be built; nothing was sent.
    #[error(transparent)]
    Request(ApiError),

    /// The request was sent (or attempted) and failed.
    #[error("{operation} failed: {source}")]
    Api {
        operation: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("could not read the returned data: {source}")]
    ReadBody {
        #[source]
        source: ApiError,
    },

    #[error("could not unmarshal the returned data into a user (status {status}): {source}")]
    DecodeBody {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
}

impl UserError {
    pub(crate) fn api(operation: &'static str) -> impl FnOnce(ApiError) -> Self {
        move |source| UserError::Api { operation, source }
    }

    /// Status code of the response behind this error, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UserError::Request(_) => None,
            UserError::Api { source, .. } | UserError::ReadBody { source } => source.status(),
            UserError::DecodeBody { status, .. } => Some(*status),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            UserError::Api {
                source: ApiError::Cancelled,
                ..
            }
        )
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            UserError::Api { source, .. } => source.suggestion(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, UserError>;
