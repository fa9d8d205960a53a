//! Collaborator errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No signed-in session")]
    NotAuthenticated,

    /// The roster store refused a row because the (user, group) pair already exists
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl ClientError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }
}
