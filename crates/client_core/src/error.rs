use std::time::Duration;

use shared::domain::EntityId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed backend response: {0}")]
    Decode(String),
    #[error("failed to encode request payload: {0}")]
    Encode(String),
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl GatewayError {
    /// Timeouts, connection failures and 5xx responses may succeed if the
    /// user tries again; nothing is retried automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) | Self::Encode(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("an attachment is required")]
    MissingAttachment,
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} {id} is not present in the current view")]
    NotFoundLocally { kind: &'static str, id: EntityId },
    #[error("a mutation for {kind} {id} is already in flight")]
    MutationInFlight { kind: &'static str, id: EntityId },
    #[error("row {index} is outside the current page window of {len} rows")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no edit buffer is staged")]
    NoBuffer,
    #[error("the staged buffer is read-only")]
    ReadOnlyBuffer,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ListError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway(err) => err.is_retryable(),
            Self::MutationInFlight { .. } => true,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),
    #[error("email and password are required")]
    MissingCredentials,
    #[error("authentication request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
