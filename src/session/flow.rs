//! Verification Session State Machine
//!
//! Sequences analyzer, domain gate, OTC flow and enrollment into one
//! ordered workflow:
//!
//! ```text
//! Idle ─► Analyzing ─┬─► Rejected
//!                    └─► Verified ─► EmailPending ─► OtpPending ─┬─► Completed
//!                                                                └─► Rejected
//! any ──reset──► Idle
//! ```
//!
//! An operation called from a stage it does not accept fails with
//! [`SessionError::InvalidStage`] and leaves the session untouched. Every
//! stage change is published to [`VerificationFlow::subscribe`].

use std::sync::Arc;

use campus_client::ClientError;
use campus_types::{mask_email, AuthSession, ProfilePatch, StoredVerification, VerificationClaim};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use super::state::{SessionView, VerificationSession, VerificationStage};
use crate::context::VerifyContext;
use crate::document::{DocumentAnalyzer, DocumentReader, DocumentUpload, RejectionReason};
use crate::domain_match;
use crate::enrollment::{EnrollError, EnrollmentResolver};
use crate::otc::{normalize_email, ConfirmError, OtcFlow, SendError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Operation '{operation}' not allowed in stage {stage}")]
    InvalidStage {
        stage: VerificationStage,
        operation: &'static str,
    },

    #[error(transparent)]
    Rejected(#[from] RejectionReason),

    #[error("Email domain does not match institution '{institution}'")]
    DomainMismatch { institution: String },

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Confirm(#[from] ConfirmError),

    #[error(transparent)]
    Enroll(#[from] EnrollError),

    #[error("No signed-in user")]
    NotSignedIn,

    #[error("Identity provider error: {0}")]
    Identity(#[from] ClientError),
}

impl SessionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidStage { .. } => "Bu işlem şu anda yapılamaz. Lütfen sayfayı yenileyin.",
            Self::Rejected(e) => e.user_message(),
            Self::DomainMismatch { .. } => {
                "E-posta adresi belgedeki üniversiteyle eşleşmiyor. Lütfen üniversite e-posta adresinizi (.edu.tr) girin."
            }
            Self::Send(e) => e.user_message(),
            Self::Confirm(e) => e.user_message(),
            Self::Enroll(e) => e.user_message(),
            Self::NotSignedIn => "Lütfen önce giriş yapın.",
            Self::Identity(_) => "Hesap bilgilerine ulaşılamadı. Lütfen tekrar deneyin.",
        }
    }
}

pub struct VerificationFlow {
    context: VerifyContext,
    analyzer: DocumentAnalyzer,
    otc: OtcFlow,
    enrollment: EnrollmentResolver,
    session: VerificationSession,
    view_tx: watch::Sender<SessionView>,
}

impl VerificationFlow {
    pub fn new(context: VerifyContext) -> Self {
        let analyzer = DocumentAnalyzer::new(context.config.document.clone());
        Self::with_analyzer(context, analyzer)
    }

    /// Flow whose analyzer reads documents with `reader`
    pub fn with_reader(context: VerifyContext, reader: Arc<dyn DocumentReader>) -> Self {
        let analyzer = DocumentAnalyzer::with_reader(reader, context.config.document.clone());
        Self::with_analyzer(context, analyzer)
    }

    fn with_analyzer(context: VerifyContext, analyzer: DocumentAnalyzer) -> Self {
        let otc = OtcFlow::new(context.functions.clone(), context.identity.clone());
        let enrollment = EnrollmentResolver::new(
            context.roster.clone(),
            context.functions.clone(),
            context.identity.clone(),
        );
        let session = VerificationSession::default();
        let (view_tx, _) = watch::channel(session.view());
        Self {
            context,
            analyzer,
            otc,
            enrollment,
            session,
            view_tx,
        }
    }

    pub fn stage(&self) -> VerificationStage {
        self.session.stage
    }

    pub fn session(&self) -> &VerificationSession {
        &self.session
    }

    pub fn view(&self) -> SessionView {
        self.session.view()
    }

    /// Receives a fresh [`SessionView`] after every change
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Idle → Analyzing → Verified | Rejected
    pub async fn submit_document(
        &mut self,
        upload: DocumentUpload,
    ) -> Result<VerificationClaim, SessionError> {
        self.require("submit_document", &[VerificationStage::Idle])?;
        self.set_stage(VerificationStage::Analyzing);

        match self.analyzer.analyze(upload).await {
            Ok(claim) => {
                self.session.claim = Some(claim.clone());
                self.session.last_error = None;
                self.set_stage(VerificationStage::Verified);
                Ok(claim)
            }
            Err(reason) => {
                self.fail(VerificationStage::Rejected, SessionError::Rejected(reason))
            }
        }
    }

    /// Verified | EmailPending → EmailPending → OtpPending.
    /// Gate or send failures leave the session in EmailPending.
    pub async fn submit_email(&mut self, email: &str) -> Result<(), SessionError> {
        self.require(
            "submit_email",
            &[VerificationStage::Verified, VerificationStage::EmailPending],
        )?;

        let email = normalize_email(email);
        self.session.email = Some(email.clone());
        self.set_stage(VerificationStage::EmailPending);

        let institution = self
            .session
            .claim
            .as_ref()
            .and_then(|c| c.institution_name_raw())
            .unwrap_or_default()
            .to_string();

        if !domain_match::matches(&email, &institution) {
            info!(email = %mask_email(&email), institution = %institution, "Email domain rejected");
            return self.fail(
                VerificationStage::EmailPending,
                SessionError::DomainMismatch { institution },
            );
        }

        match self.otc.send(&email).await {
            Ok(()) => {
                self.session.last_error = None;
                self.set_stage(VerificationStage::OtpPending);
                Ok(())
            }
            Err(e) => self.fail(VerificationStage::EmailPending, e.into()),
        }
    }

    /// Re-send to the captured address, restarting the code window
    pub async fn resend_code(&mut self) -> Result<(), SessionError> {
        self.require("resend_code", &[VerificationStage::OtpPending])?;
        let email = self.captured_email("resend_code")?;

        match self.otc.send(&email).await {
            Ok(()) => {
                self.session.last_error = None;
                self.publish();
                Ok(())
            }
            Err(e) => self.fail(VerificationStage::OtpPending, e.into()),
        }
    }

    /// OtpPending → Completed. A confirm failure stays in OtpPending; an
    /// enrollment failure is terminal (Rejected).
    pub async fn submit_code(&mut self, code: &str) -> Result<(), SessionError> {
        self.require("submit_code", &[VerificationStage::OtpPending])?;
        let email = self.captured_email("submit_code")?;

        let user = match self.context.identity.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => return self.fail(VerificationStage::OtpPending, SessionError::NotSignedIn),
            Err(e) => return self.fail(VerificationStage::OtpPending, e.into()),
        };

        let credential = match self.otc.confirm(&email, code).await {
            Ok(token) => token,
            Err(e) => return self.fail(VerificationStage::OtpPending, e.into()),
        };

        let Some(claim) = self.session.claim.clone() else {
            return Err(SessionError::InvalidStage {
                stage: self.session.stage,
                operation: "submit_code",
            });
        };

        match self
            .enrollment
            .resolve(&claim, &email, user.id, &credential)
            .await
        {
            Ok(outcome) => {
                info!(
                    user_id = %user.id,
                    institution = %outcome.institution.name,
                    "Verification completed"
                );
                self.session.issued_code = Some(outcome.code.clone());
                self.session.enrollment = Some(outcome);
                self.session.last_error = None;
                self.set_stage(VerificationStage::Completed);
                Ok(())
            }
            Err(e) => self.fail(VerificationStage::Rejected, e.into()),
        }
    }

    /// Any stage → Idle, and ask the identity provider to clear the
    /// mirrored profile attributes. The local reset always happens; a
    /// failed clear is logged and returned.
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        self.discard();

        if let Err(e) = self
            .context
            .identity
            .update_user_metadata(&ProfilePatch::cleared())
            .await
        {
            warn!(error = %e, "Profile clear failed on reset");
            return Err(SessionError::Identity(e));
        }
        info!("Verification session reset");
        Ok(())
    }

    /// Session-change notification. Sign-out drops the local session
    /// without contacting the identity provider; sign-in is a no-op.
    pub fn on_session_change(&mut self, session: Option<&AuthSession>) {
        if session.is_none() && self.session.stage != VerificationStage::Idle {
            info!(stage = %self.session.stage, "Signed out; discarding verification session");
            self.discard();
        }
    }

    /// A verification mirrored on the profile by an earlier attempt
    pub async fn stored_status(&self) -> Result<Option<StoredVerification>, SessionError> {
        let user = self
            .context
            .identity
            .current_user()
            .await?
            .ok_or(SessionError::NotSignedIn)?;
        Ok(StoredVerification::from_metadata(&user.metadata))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn require(
        &self,
        operation: &'static str,
        allowed: &[VerificationStage],
    ) -> Result<(), SessionError> {
        if allowed.contains(&self.session.stage) {
            Ok(())
        } else {
            Err(SessionError::InvalidStage {
                stage: self.session.stage,
                operation,
            })
        }
    }

    fn captured_email(&self, operation: &'static str) -> Result<String, SessionError> {
        self.session
            .email
            .clone()
            .ok_or(SessionError::InvalidStage {
                stage: self.session.stage,
                operation,
            })
    }

    fn set_stage(&mut self, stage: VerificationStage) {
        if self.session.stage != stage {
            info!(from = %self.session.stage, to = %stage, "Verification stage change");
        }
        self.session.stage = stage;
        self.publish();
    }

    /// Record `error`, move to `stage`, hand the error back
    fn fail<T>(&mut self, stage: VerificationStage, error: SessionError) -> Result<T, SessionError> {
        self.session.last_error = Some(error.user_message().to_string());
        self.set_stage(stage);
        Err(error)
    }

    fn discard(&mut self) {
        self.otc.reset();
        self.session = VerificationSession::default();
        self.publish();
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.session.view());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentContents, ReadError};
    use campus_client::memory::{MemoryIdentityProvider, MemoryRemoteFunctions, MemoryRosterStore};
    use campus_client::IdentityProvider;

    const EMAIL: &str = "ahmet@aybu.edu.tr";
    const CERTIFICATE: &str = "ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ\nÖğrenci Belgesi\n\
        Program : Bilgisayar Mühendisliği Sınıf : 3\nSorgulama Kodu : AB12CD34";

    struct TextReader(&'static str);

    impl DocumentReader for TextReader {
        fn read(&self, _bytes: &[u8]) -> Result<DocumentContents, ReadError> {
            Ok(DocumentContents {
                producer: Some("e-Devlet".to_string()),
                creator: None,
                first_page_text: self.0.to_string(),
            })
        }
    }

    fn flow(text: &'static str) -> (VerificationFlow, Arc<MemoryIdentityProvider>) {
        let identity = Arc::new(MemoryIdentityProvider::signed_in(EMAIL));
        let context = VerifyContext::in_memory(
            identity.clone(),
            Arc::new(MemoryRemoteFunctions::new()),
            Arc::new(MemoryRosterStore::new()),
        );
        (
            VerificationFlow::with_reader(context, Arc::new(TextReader(text))),
            identity,
        )
    }

    fn upload() -> DocumentUpload {
        DocumentUpload::new(b"%PDF".to_vec(), "application/pdf")
    }

    #[tokio::test]
    async fn test_document_moves_to_verified() {
        let (mut flow, _) = flow(CERTIFICATE);
        flow.submit_document(upload()).await.unwrap();
        assert_eq!(flow.stage(), VerificationStage::Verified);
        assert!(flow.view().claim.is_some());
    }

    #[tokio::test]
    async fn test_rejected_document_is_terminal() {
        let (mut flow, _) = flow("random text");
        let err = flow.submit_document(upload()).await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(RejectionReason::ContentMismatch)));
        assert_eq!(flow.stage(), VerificationStage::Rejected);
        assert!(flow.view().last_error.is_some());

        let again = flow.submit_document(upload()).await.unwrap_err();
        assert!(matches!(
            again,
            SessionError::InvalidStage {
                stage: VerificationStage::Rejected,
                operation: "submit_document"
            }
        ));
    }

    #[tokio::test]
    async fn test_email_before_document_is_invalid() {
        let (mut flow, _) = flow(CERTIFICATE);
        let err = flow.submit_email(EMAIL).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidStage { .. }));
        assert_eq!(flow.stage(), VerificationStage::Idle);
        assert_eq!(flow.session().email, None);
    }

    #[tokio::test]
    async fn test_domain_mismatch_stays_email_pending() {
        let (mut flow, _) = flow(CERTIFICATE);
        flow.submit_document(upload()).await.unwrap();

        let err = flow.submit_email("ahmet@gmail.com").await.unwrap_err();
        assert!(matches!(err, SessionError::DomainMismatch { .. }));
        assert_eq!(flow.stage(), VerificationStage::EmailPending);

        flow.submit_email(EMAIL).await.unwrap();
        assert_eq!(flow.stage(), VerificationStage::OtpPending);
    }

    #[tokio::test]
    async fn test_sign_out_discards_session() {
        let (mut flow, identity) = flow(CERTIFICATE);
        let mut sessions = identity.subscribe();
        flow.submit_document(upload()).await.unwrap();

        identity.sign_out();
        sessions.changed().await.unwrap();
        let current = sessions.borrow_and_update().clone();
        flow.on_session_change(current.as_ref());

        assert_eq!(flow.stage(), VerificationStage::Idle);
        assert!(identity.updates().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_profile() {
        let (mut flow, identity) = flow(CERTIFICATE);
        flow.submit_document(upload()).await.unwrap();

        flow.reset().await.unwrap();
        assert_eq!(flow.stage(), VerificationStage::Idle);
        assert_eq!(identity.updates(), vec![ProfilePatch::cleared()]);
    }

    #[tokio::test]
    async fn test_reset_clear_failure_still_resets() {
        let (mut flow, identity) = flow(CERTIFICATE);
        flow.submit_document(upload()).await.unwrap();
        identity.set_fail_updates(true);

        let err = flow.reset().await.unwrap_err();
        assert!(matches!(err, SessionError::Identity(_)));
        assert_eq!(flow.stage(), VerificationStage::Idle);
    }

    #[tokio::test]
    async fn test_subscribers_see_stage_changes() {
        let (mut flow, _) = flow(CERTIFICATE);
        let views = flow.subscribe();
        flow.submit_document(upload()).await.unwrap();
        assert_eq!(views.borrow().stage, VerificationStage::Verified);
    }
}
