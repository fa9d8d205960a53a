//! Campus verification core
//!
//! Issues a campus entry code once a user has shown a plausible student
//! certificate and proved control of a mailbox at the claimed institution.
//!
//! ```text
//! upload ─► document::DocumentAnalyzer ─► VerificationClaim
//!                                            │
//! email ─► domain_match::matches ─► otc::OtcFlow (send / confirm)
//!                                            │
//!                    enrollment::EnrollmentResolver ─► IssuedCode + membership
//! ```
//!
//! [`session::VerificationFlow`] sequences these stages; collaborators come
//! in through [`context::VerifyContext`].

pub mod config;
pub mod context;
pub mod document;
pub mod domain_match;
pub mod enrollment;
pub mod error;
pub mod otc;
pub mod session;

#[cfg(feature = "database")]
pub mod database;

pub use config::VerifyConfig;
pub use context::VerifyContext;
pub use document::{DocumentAnalyzer, DocumentUpload, RejectionReason};
pub use enrollment::{EnrollError, EnrollmentResolver};
pub use error::VerifyError;
pub use otc::{ConfirmError, OtcFlow, OtcState, SendError};
pub use session::{SessionError, SessionView, VerificationFlow, VerificationStage};

pub use campus_types::{EnrollmentOutcome, IssuedCode, StoredVerification, VerificationClaim};
