//! OTC Verification Flow
//!
//! Sends a six-digit one-time code to an email address through the remote
//! function gateway and confirms it. A successful confirmation captures the
//! session credential used for the privileged calls that follow
//! (code issuance).
//!
//! ```text
//! NotSent ──send──► Sent ──confirm ok──► Verified
//!    │               │ ▲
//!    └──send err──► Failed ◄──confirm err
//!                    └──send──► Sent
//! ```
//!
//! One remote attempt per call, no retry loop and no attempt ceiling.

use std::sync::Arc;

use campus_client::{FunctionRequest, IdentityProvider, RemoteFunctions};
use campus_types::{mask_email, SessionToken};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Length of an emailed code
pub const CODE_LENGTH: usize = 6;

/// Gateway messages that mean "this address cannot receive codes"
const UNKNOWN_RECIPIENT_MARKERS: &[&str] =
    &["signups not allowed", "not allowed", "not found", "unknown"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtcState {
    NotSent,
    Sent,
    Verified,
    Failed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("Recipient is not allowed to receive codes")]
    UnknownRecipient,

    #[error("Code could not be sent: {0}")]
    Transient(String),
}

impl SendError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnknownRecipient => "Bu e-posta adresiyle kayıtlı bir hesap bulunamadı.",
            Self::Transient(_) => "Kod gönderilemedi. Lütfen tekrar deneyin.",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfirmError {
    #[error("Code must be exactly 6 characters")]
    MalformedCode,

    #[error("Code is invalid or expired")]
    InvalidOrExpired,

    #[error("No code was sent to this address")]
    NotRequested,

    #[error("Code could not be checked: {0}")]
    Transient(String),

    #[error("No session credential after confirmation")]
    SessionUnavailable,
}

impl ConfirmError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MalformedCode => "Lütfen 6 haneli kodu girin.",
            Self::InvalidOrExpired => "Kod hatalı veya süresi dolmuş.",
            Self::NotRequested => "Önce doğrulama kodu gönderin.",
            Self::Transient(_) => "Kod doğrulanamadı. Lütfen tekrar deneyin.",
            Self::SessionUnavailable => "Oturum oluşturulamadı.",
        }
    }
}

pub struct OtcFlow {
    functions: Arc<dyn RemoteFunctions>,
    identity: Arc<dyn IdentityProvider>,
    state: OtcState,
    /// Address of the last send, normalised
    email: Option<String>,
    credential: Option<SessionToken>,
}

impl OtcFlow {
    pub fn new(functions: Arc<dyn RemoteFunctions>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            functions,
            identity,
            state: OtcState::NotSent,
            email: None,
            credential: None,
        }
    }

    pub fn state(&self) -> OtcState {
        self.state
    }

    /// Address the flow is bound to, once a send succeeded
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Credential captured by the last successful confirmation
    pub fn credential(&self) -> Option<&SessionToken> {
        self.credential.as_ref()
    }

    /// Send (or re-send) a code to `email`. A re-send restarts the code window.
    pub async fn send(&mut self, email: &str) -> Result<(), SendError> {
        let email = normalize_email(email);
        let request = FunctionRequest::SendEmailOtp {
            email: email.clone(),
        };

        let outcome = match self.functions.invoke(&request, None).await {
            Ok(response) if response.success => Ok(()),
            Ok(response) => {
                let message = response.error.unwrap_or_default();
                Err(classify_send_failure(&message))
            }
            Err(e) => Err(SendError::Transient(e.to_string())),
        };

        match outcome {
            Ok(()) => {
                info!(email = %mask_email(&email), "OTP sent");
                self.state = OtcState::Sent;
                self.email = Some(email);
                self.credential = None;
                Ok(())
            }
            Err(e) => {
                warn!(email = %mask_email(&email), error = %e, "OTP send failed");
                self.state = OtcState::Failed;
                self.email = None;
                Err(e)
            }
        }
    }

    /// Check `code` for `email`. Malformed codes fail before any remote call.
    pub async fn confirm(&mut self, email: &str, code: &str) -> Result<SessionToken, ConfirmError> {
        let code = code.trim();
        if code.chars().count() != CODE_LENGTH {
            return Err(ConfirmError::MalformedCode);
        }

        let email = normalize_email(email);
        let pending = matches!(self.state, OtcState::Sent | OtcState::Failed)
            && self.email.as_deref() == Some(email.as_str());
        if !pending {
            return Err(ConfirmError::NotRequested);
        }

        let request = FunctionRequest::VerifyEmailOtp {
            email: email.clone(),
            code: code.to_string(),
        };
        let response = self
            .functions
            .invoke(&request, None)
            .await
            .map_err(|e| ConfirmError::Transient(e.to_string()))?;

        if !response.success {
            debug!(email = %mask_email(&email), error = ?response.error, "OTP rejected");
            self.state = OtcState::Failed;
            return Err(ConfirmError::InvalidOrExpired);
        }

        let credential = match response.access_token {
            Some(token) => Some(SessionToken::new(token)),
            None => self.identity.current_session().await.unwrap_or_else(|e| {
                warn!(error = %e, "Identity session lookup failed after OTP");
                None
            }),
        };

        match credential {
            Some(token) => {
                info!(email = %mask_email(&email), "OTP verified");
                self.state = OtcState::Verified;
                self.credential = Some(token.clone());
                Ok(token)
            }
            None => {
                self.state = OtcState::Failed;
                Err(ConfirmError::SessionUnavailable)
            }
        }
    }

    /// Back to `NotSent`, forgetting address and credential
    pub fn reset(&mut self) {
        self.state = OtcState::NotSent;
        self.email = None;
        self.credential = None;
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn classify_send_failure(message: &str) -> SendError {
    let lowered = message.to_lowercase();
    if UNKNOWN_RECIPIENT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        SendError::UnknownRecipient
    } else {
        SendError::Transient(message.to_string())
    }
}
