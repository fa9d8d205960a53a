//! Collaborator traits - the only boundary between the verification core and
//! the outside world. The core depends on these traits, never on a concrete
//! backend.
//!
//! - [`IdentityProvider`]: who is signed in, their profile attributes, session changes
//! - [`RemoteFunctions`]: the gateway that dispatches OTP mail and issues campus codes
//! - [`RosterStore`]: institutions, their membership groups, membership rows
//!
//! `http` talks to the hosted services; `memory` backs tests and demos.

pub mod error;
pub mod functions;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use campus_types::{
    AuthSession, Institution, MembershipGroup, MembershipRecord, ProfilePatch, SessionToken,
    UserIdentity,
};
use tokio::sync::watch;
use uuid::Uuid;

pub use error::ClientError;
pub use functions::{FunctionRequest, FunctionResponse};

pub type Result<T> = std::result::Result<T, ClientError>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    async fn current_user(&self) -> Result<Option<UserIdentity>>;

    /// Credential of the current session, if any.
    async fn current_session(&self) -> Result<Option<SessionToken>>;

    /// Merge `patch` into the user's profile attributes.
    async fn update_user_metadata(&self, patch: &ProfilePatch) -> Result<()>;

    /// Session-change notifications. Each value is the current session, `None` when signed out.
    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>>;
}

#[async_trait]
pub trait RemoteFunctions: Send + Sync {
    /// Invoke one gateway action. A negative `{success: false}` answer is `Ok`;
    /// only transport and protocol failures are `Err`.
    async fn invoke(
        &self,
        request: &FunctionRequest,
        credential: Option<&SessionToken>,
    ) -> Result<FunctionResponse>;
}

/// Institution names compare case- and accent-insensitively
/// (see [`campus_types::fold_locale`]).
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn find_institution_exact(&self, name: &str) -> Result<Option<Institution>>;

    /// First institution (ordered by name) whose name contains `fragment`.
    async fn find_institution_containing(&self, fragment: &str) -> Result<Option<Institution>>;

    async fn first_group(&self, institution_id: Uuid) -> Result<Option<MembershipGroup>>;

    /// Insert a membership row. A duplicate (user, group) pair is reported as
    /// [`ClientError::UniqueViolation`].
    async fn insert_membership(&self, record: &MembershipRecord) -> Result<()>;
}
