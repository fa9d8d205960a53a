//! Verification session: stage data and the state machine driving it.

pub mod flow;
pub mod state;

pub use flow::{SessionError, VerificationFlow};
pub use state::{SessionView, VerificationSession, VerificationStage};
