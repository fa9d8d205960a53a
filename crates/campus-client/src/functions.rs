//! Remote function wire format
//!
//! The gateway is a single function invoked by logical action name:
//!
//! ```json
//! { "action": "send-email-otp", "email": "ahmet@aybu.edu.tr" }
//! { "action": "verify-email-otp", "email": "ahmet@aybu.edu.tr", "code": "123456" }
//! { "action": "generate-code", "campus_id": "…", "university_name": "…",
//!   "department": "…", "student_class": 3, "student_no": "ahmet" }
//! ```
//!
//! Every response is `{ "success": bool, "error"?: string, ... }`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for one gateway action.
///
/// No `Debug` derive: the verify variant carries the one-time code.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum FunctionRequest {
    SendEmailOtp {
        email: String,
    },
    VerifyEmailOtp {
        email: String,
        code: String,
    },
    GenerateCode {
        campus_id: Uuid,
        university_name: String,
        department: String,
        student_class: u32,
        student_no: String,
    },
}

impl FunctionRequest {
    /// Logical action name as sent on the wire
    pub fn action(&self) -> &'static str {
        match self {
            Self::SendEmailOtp { .. } => "send-email-otp",
            Self::VerifyEmailOtp { .. } => "verify-email-otp",
            Self::GenerateCode { .. } => "generate-code",
        }
    }
}

impl std::fmt::Debug for FunctionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRequest")
            .field("action", &self.action())
            .finish_non_exhaustive()
    }
}

/// Response envelope shared by all actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Issued campus code (generate-code)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Session credential (verify-email-otp), when the gateway hands one back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FunctionResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}
