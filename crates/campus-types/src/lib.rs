//! Shared data model for campus verification
//!
//! Every type that crosses a collaborator boundary (identity provider,
//! remote function gateway, roster store) or reaches the presentation layer
//! lives here.
//!
//! ```text
//! document ──► VerificationClaim ──► Institution / MembershipGroup
//!                                        │
//!                                        ▼
//!                          IssuedCode + MembershipRecord
//! ```

pub mod text;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use text::{collapse_whitespace, fold_locale, mask_email};

/// Placeholder shown wherever a document field could not be read.
pub const UNKNOWN_FIELD: &str = "Bilinmiyor";

// ============================================================================
// CLAIM
// ============================================================================

/// Unverified institution/department/class data read from a student document.
///
/// Immutable once built: the analyzer creates it and everyone else only reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationClaim {
    institution_name_raw: Option<String>,
    department: Option<String>,
    class_year: Option<String>,
}

impl VerificationClaim {
    pub fn new(
        institution_name_raw: Option<String>,
        department: Option<String>,
        class_year: Option<String>,
    ) -> Self {
        Self {
            institution_name_raw,
            department,
            class_year,
        }
    }

    pub fn institution_name_raw(&self) -> Option<&str> {
        self.institution_name_raw.as_deref()
    }

    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    pub fn class_year(&self) -> Option<&str> {
        self.class_year.as_deref()
    }

    /// Institution name for display, or the unknown placeholder
    pub fn institution_display(&self) -> &str {
        self.institution_name_raw().unwrap_or(UNKNOWN_FIELD)
    }

    /// Department for display, or the unknown placeholder
    pub fn department_display(&self) -> &str {
        self.department().unwrap_or(UNKNOWN_FIELD)
    }

    /// Class/year for display, or the unknown placeholder
    pub fn class_year_display(&self) -> &str {
        self.class_year().unwrap_or(UNKNOWN_FIELD)
    }
}

// ============================================================================
// ROSTER
// ============================================================================

/// Canonical institution record owned by the roster store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: Uuid,
    pub name: String,
}

/// The enrollable group tied to an institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipGroup {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    Member,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
        }
    }
}

impl fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// At most one record exists per (user_id, group_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub role: MembershipRole,
}

impl MembershipRecord {
    pub fn member(user_id: Uuid, group_id: Uuid) -> Self {
        Self {
            user_id,
            group_id,
            role: MembershipRole::Member,
        }
    }
}

// ============================================================================
// TOKENS
// ============================================================================

/// Opaque campus code issued after a successful verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuedCode(String);

impl IssuedCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IssuedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IssuedCode(***)")
    }
}

/// Opaque session credential used for privileged gateway calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

// ============================================================================
// IDENTITY
// ============================================================================

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    #[serde(default, alias = "user_metadata")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Discrete session-change notification payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user: UserIdentity,
    pub access_token: SessionToken,
}

/// Partial update of the profile attributes mirrored on the user.
///
/// `None` fields serialize as `null` so a cleared patch actually clears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub is_student: bool,
    pub campus_code: Option<String>,
    pub university: Option<String>,
    pub department: Option<String>,
    pub student_class: Option<String>,
}

impl ProfilePatch {
    /// Mirror of a completed verification
    pub fn verified(
        code: &IssuedCode,
        university: impl Into<String>,
        claim: &VerificationClaim,
    ) -> Self {
        Self {
            is_student: true,
            campus_code: Some(code.as_str().to_string()),
            university: Some(university.into()),
            department: claim.department().map(str::to_string),
            student_class: claim.class_year().map(str::to_string),
        }
    }

    /// Patch that removes every mirrored verification attribute
    pub fn cleared() -> Self {
        Self {
            is_student: false,
            campus_code: None,
            university: None,
            department: None,
            student_class: None,
        }
    }
}

/// A previous verification as mirrored on the user's profile attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredVerification {
    pub campus_code: IssuedCode,
    pub university: Option<String>,
    pub department: Option<String>,
    pub student_class: Option<String>,
}

impl StoredVerification {
    /// Read the mirrored attributes; `None` unless `is_student` is set and a code exists.
    pub fn from_metadata(metadata: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        let is_student = metadata
            .get("is_student")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !is_student {
            return None;
        }

        let text = |key: &str| -> Option<String> {
            match metadata.get(key)? {
                serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };

        Some(Self {
            campus_code: IssuedCode::new(text("campus_code")?),
            university: text("university"),
            department: text("department"),
            student_class: text("student_class"),
        })
    }
}

// ============================================================================
// ENROLLMENT RESULT
// ============================================================================

/// What a successful enrollment hands back for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentOutcome {
    pub code: IssuedCode,
    pub institution: Institution,
    pub group: MembershipGroup,
    /// True when the membership row already existed
    pub already_member: bool,
    pub enrolled_at: DateTime<Utc>,
}
