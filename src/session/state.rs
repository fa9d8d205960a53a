//! Verification session data and its presentation projection

use campus_types::{mask_email, EnrollmentOutcome, IssuedCode, VerificationClaim};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStage {
    Idle,
    Analyzing,
    Rejected,
    Verified,
    EmailPending,
    OtpPending,
    Completed,
}

impl VerificationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Rejected => "rejected",
            Self::Verified => "verified",
            Self::EmailPending => "email_pending",
            Self::OtpPending => "otp_pending",
            Self::Completed => "completed",
        }
    }

    /// Only a reset leaves these
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }
}

impl fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One verification attempt. Lives until reset or sign-out.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationSession {
    pub stage: VerificationStage,
    pub claim: Option<VerificationClaim>,
    pub email: Option<String>,
    pub issued_code: Option<IssuedCode>,
    pub enrollment: Option<EnrollmentOutcome>,
    /// User-facing message of the most recent failure
    pub last_error: Option<String>,
}

impl Default for VerificationSession {
    fn default() -> Self {
        Self {
            stage: VerificationStage::Idle,
            claim: None,
            email: None,
            issued_code: None,
            enrollment: None,
            last_error: None,
        }
    }
}

impl VerificationSession {
    pub fn view(&self) -> SessionView {
        SessionView {
            stage: self.stage,
            claim: self.claim.clone(),
            email_masked: self.email.as_deref().map(mask_email),
            issued_code: self.issued_code.clone(),
            institution_name: self.enrollment.as_ref().map(|e| e.institution.name.clone()),
            group_name: self.enrollment.as_ref().map(|e| e.group.name.clone()),
            last_error: self.last_error.clone(),
        }
    }
}

/// Everything the presentation layer may read. Never mutated by it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub stage: VerificationStage,
    pub claim: Option<VerificationClaim>,
    pub email_masked: Option<String>,
    pub issued_code: Option<IssuedCode>,
    pub institution_name: Option<String>,
    pub group_name: Option<String>,
    pub last_error: Option<String>,
}
