//! Crate-level error
//!
//! Each stage has its own error enum next to the code that raises it
//! ([`RejectionReason`], [`SendError`], [`ConfirmError`], [`EnrollError`],
//! [`SessionError`]). `VerifyError` is what wiring and setup code returns.

use thiserror::Error;

pub use crate::document::RejectionReason;
pub use crate::enrollment::EnrollError;
pub use crate::otc::{ConfirmError, SendError};
pub use crate::session::SessionError;

use crate::config::ConfigError;
use campus_client::ClientError;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Collaborator error: {0}")]
    Client(#[from] ClientError),

    #[error("Verification error: {0}")]
    Session(#[from] SessionError),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VerifyError>;
