//! Campus Enrollment Resolver
//!
//! Maps a claimed institution name to a roster institution and its
//! membership group, asks the gateway for a campus code, records the
//! membership and mirrors the result on the user's profile.
//!
//! Institution lookup has one deterministic fallback order:
//! exact (folded) name, then suffix-stripped substring, then
//! [`EnrollError::InstitutionUnknown`]. Institutions are never created here.
//!
//! The membership row is the source of truth. A duplicate row counts as
//! success, and a failed profile mirror is logged and ignored.

use std::sync::Arc;

use campus_client::{FunctionRequest, IdentityProvider, RemoteFunctions, RosterStore};
use campus_types::{
    fold_locale, mask_email, EnrollmentOutcome, Institution, IssuedCode, MembershipRecord,
    ProfilePatch, SessionToken, VerificationClaim,
};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::vocabulary::INSTITUTION_SUFFIX;

/// Department sent when the document did not yield one
pub const DEFAULT_DEPARTMENT: &str = "Öğrenci";

/// Class sent when the document did not yield one
pub const DEFAULT_CLASS: u32 = 1;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnrollError {
    #[error("No roster institution matches '{0}'")]
    InstitutionUnknown(String),

    #[error("Institution '{0}' has no membership group")]
    NoGroupAvailable(String),

    #[error("Campus code issuance failed: {0}")]
    IssuanceFailed(String),

    #[error("Roster store failure: {0}")]
    Store(String),
}

impl EnrollError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InstitutionUnknown(_) => {
                "Bu üniversite henüz sistemimizde tanımlı değil. Lütfen destek ekibiyle iletişime geçin."
            }
            Self::NoGroupAvailable(_) => {
                "Üniversiteniz için henüz bir topluluk oluşturulmamış. Lütfen destek ekibiyle iletişime geçin."
            }
            Self::IssuanceFailed(_) => "Kod üretilemedi. Lütfen destek ekibiyle iletişime geçin.",
            Self::Store(_) => "Kayıt işlemi tamamlanamadı. Lütfen daha sonra tekrar deneyin.",
        }
    }
}

pub struct EnrollmentResolver {
    roster: Arc<dyn RosterStore>,
    functions: Arc<dyn RemoteFunctions>,
    identity: Arc<dyn IdentityProvider>,
}

impl EnrollmentResolver {
    pub fn new(
        roster: Arc<dyn RosterStore>,
        functions: Arc<dyn RemoteFunctions>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            roster,
            functions,
            identity,
        }
    }

    pub async fn resolve(
        &self,
        claim: &VerificationClaim,
        verified_email: &str,
        user_id: Uuid,
        credential: &SessionToken,
    ) -> Result<EnrollmentOutcome, EnrollError> {
        let raw = claim
            .institution_name_raw()
            .ok_or_else(|| EnrollError::InstitutionUnknown(String::new()))?;

        let institution = self.resolve_institution(raw).await?;

        let group = self
            .roster
            .first_group(institution.id)
            .await
            .map_err(|e| EnrollError::Store(e.to_string()))?
            .ok_or_else(|| EnrollError::NoGroupAvailable(institution.name.clone()))?;

        let code = self
            .issue_code(claim, &institution, group.id, verified_email, credential)
            .await?;

        let record = MembershipRecord::member(user_id, group.id);
        let already_member = match self.roster.insert_membership(&record).await {
            Ok(()) => false,
            Err(e) if e.is_unique_violation() => {
                debug!(user_id = %user_id, group_id = %group.id, "Membership already present");
                true
            }
            Err(e) => return Err(EnrollError::Store(e.to_string())),
        };

        let patch = ProfilePatch::verified(&code, institution.name.clone(), claim);
        if let Err(e) = self.identity.update_user_metadata(&patch).await {
            warn!(user_id = %user_id, error = %e, "Profile mirror failed; membership kept");
        }

        info!(
            user_id = %user_id,
            email = %mask_email(verified_email),
            institution_id = %institution.id,
            group_id = %group.id,
            already_member,
            "Enrollment complete"
        );

        Ok(EnrollmentOutcome {
            code,
            institution,
            group,
            already_member,
            enrolled_at: Utc::now(),
        })
    }

    /// Exact folded match, then suffix-stripped substring match.
    pub async fn resolve_institution(&self, raw: &str) -> Result<Institution, EnrollError> {
        let exact = self
            .roster
            .find_institution_exact(raw)
            .await
            .map_err(|e| EnrollError::Store(e.to_string()))?;
        if let Some(institution) = exact {
            return Ok(institution);
        }

        let fragment = strip_institution_suffix(raw);
        if !fragment.is_empty() {
            let partial = self
                .roster
                .find_institution_containing(&fragment)
                .await
                .map_err(|e| EnrollError::Store(e.to_string()))?;
            if let Some(institution) = partial {
                debug!(raw = %raw, matched = %institution.name, "Institution matched by substring");
                return Ok(institution);
            }
        }

        info!(raw = %raw, "No roster institution for claim");
        Err(EnrollError::InstitutionUnknown(raw.to_string()))
    }

    async fn issue_code(
        &self,
        claim: &VerificationClaim,
        institution: &Institution,
        group_id: Uuid,
        verified_email: &str,
        credential: &SessionToken,
    ) -> Result<IssuedCode, EnrollError> {
        let request = FunctionRequest::GenerateCode {
            campus_id: group_id,
            university_name: institution.name.clone(),
            department: claim.department().unwrap_or(DEFAULT_DEPARTMENT).to_string(),
            student_class: claim
                .class_year()
                .and_then(|c| c.parse().ok())
                .unwrap_or(DEFAULT_CLASS),
            student_no: student_number(verified_email),
        };

        let response = self
            .functions
            .invoke(&request, Some(credential))
            .await
            .map_err(|e| EnrollError::IssuanceFailed(e.to_string()))?;

        if !response.success {
            return Err(EnrollError::IssuanceFailed(
                response.error.unwrap_or_else(|| "gateway refused".to_string()),
            ));
        }
        response
            .code
            .filter(|c| !c.trim().is_empty())
            .map(IssuedCode::new)
            .ok_or_else(|| EnrollError::IssuanceFailed("response carried no code".to_string()))
    }
}

/// Folded name with the institution suffix removed
fn strip_institution_suffix(raw: &str) -> String {
    let folded = fold_locale(raw);
    let suffix = fold_locale(INSTITUTION_SUFFIX);
    folded
        .trim()
        .strip_suffix(suffix.as_str())
        .unwrap_or(folded.trim())
        .trim()
        .to_string()
}

/// Local part of the verified address
fn student_number(email: &str) -> String {
    email
        .split_once('@')
        .map(|(local, _)| local)
        .unwrap_or(email)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_client::memory::{MemoryIdentityProvider, MemoryRemoteFunctions, MemoryRosterStore};

    const EMAIL: &str = "ahmet@aybu.edu.tr";

    struct Fixture {
        roster: Arc<MemoryRosterStore>,
        functions: Arc<MemoryRemoteFunctions>,
        identity: Arc<MemoryIdentityProvider>,
        resolver: EnrollmentResolver,
    }

    fn fixture() -> Fixture {
        let roster = Arc::new(MemoryRosterStore::new());
        let functions = Arc::new(MemoryRemoteFunctions::new());
        let identity = Arc::new(MemoryIdentityProvider::signed_in(EMAIL));
        let resolver = EnrollmentResolver::new(roster.clone(), functions.clone(), identity.clone());
        Fixture {
            roster,
            functions,
            identity,
            resolver,
        }
    }

    fn claim(name: &str) -> VerificationClaim {
        VerificationClaim::new(
            Some(name.to_string()),
            Some("Bilgisayar Mühendisliği".to_string()),
            Some("3".to_string()),
        )
    }

    fn token() -> SessionToken {
        SessionToken::new("test-token")
    }

    #[tokio::test]
    async fn test_exact_match_enrolls() {
        let fx = fixture();
        let inst = fx.roster.add_institution("Ankara Yıldırım Beyazıt Üniversitesi");
        let group = fx.roster.add_group(inst.id, "AYBU Kampüs");
        let user = Uuid::new_v4();

        let outcome = fx
            .resolver
            .resolve(&claim("ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ"), EMAIL, user, &token())
            .await
            .unwrap();

        assert_eq!(outcome.institution, inst);
        assert_eq!(outcome.group, group);
        assert!(!outcome.already_member);
        assert!(outcome.code.as_str().starts_with("OARK-"));
        assert_eq!(fx.roster.memberships(), vec![MembershipRecord::member(user, group.id)]);

        let updates = fx.identity.updates();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].is_student);
        assert_eq!(updates[0].campus_code.as_deref(), Some(outcome.code.as_str()));
    }

    #[tokio::test]
    async fn test_generate_code_body() {
        let fx = fixture();
        let inst = fx.roster.add_institution("Gazi Üniversitesi");
        let group = fx.roster.add_group(inst.id, "Gazi");

        let bare = VerificationClaim::new(Some("GAZİ ÜNİVERSİTESİ".to_string()), None, None);
        fx.resolver
            .resolve(&bare, "ali.veli@gazi.edu.tr", Uuid::new_v4(), &token())
            .await
            .unwrap();

        let calls = fx.functions.calls();
        assert_eq!(
            calls,
            vec![FunctionRequest::GenerateCode {
                campus_id: group.id,
                university_name: "Gazi Üniversitesi".to_string(),
                department: DEFAULT_DEPARTMENT.to_string(),
                student_class: DEFAULT_CLASS,
                student_no: "ali.veli".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_suffix_stripped_substring_match() {
        let fx = fixture();
        let inst = fx.roster.add_institution("Ankara Yıldırım Beyazıt Üniversitesi (AYBÜ)");
        fx.roster.add_group(inst.id, "AYBU");

        let resolved = fx
            .resolver
            .resolve_institution("ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ")
            .await
            .unwrap();
        assert_eq!(resolved, inst);
    }

    #[tokio::test]
    async fn test_unknown_institution_has_no_side_effects() {
        let fx = fixture();
        fx.roster.add_institution("Gazi Üniversitesi");

        let err = fx
            .resolver
            .resolve(&claim("ATLANTİS ÜNİVERSİTESİ"), EMAIL, Uuid::new_v4(), &token())
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollError::InstitutionUnknown(_)));
        assert!(fx.functions.calls().is_empty());
        assert_eq!(fx.roster.insert_attempts(), 0);
    }

    #[tokio::test]
    async fn test_missing_claim_name_is_unknown() {
        let fx = fixture();
        let empty = VerificationClaim::new(None, None, None);

        let err = fx
            .resolver
            .resolve(&empty, EMAIL, Uuid::new_v4(), &token())
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollError::InstitutionUnknown(_)));
    }

    #[tokio::test]
    async fn test_no_group() {
        let fx = fixture();
        fx.roster.add_institution("Gazi Üniversitesi");

        let err = fx
            .resolver
            .resolve(&claim("GAZİ ÜNİVERSİTESİ"), EMAIL, Uuid::new_v4(), &token())
            .await
            .unwrap_err();
        assert_eq!(err, EnrollError::NoGroupAvailable("Gazi Üniversitesi".to_string()));
        assert!(fx.functions.calls().is_empty());
    }

    #[tokio::test]
    async fn test_issuance_failure_writes_nothing() {
        let fx = fixture();
        let inst = fx.roster.add_institution("Gazi Üniversitesi");
        fx.roster.add_group(inst.id, "Gazi");
        fx.functions.set_fail_generation(true);

        let err = fx
            .resolver
            .resolve(&claim("GAZİ ÜNİVERSİTESİ"), EMAIL, Uuid::new_v4(), &token())
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollError::IssuanceFailed(_)));
        assert_eq!(fx.roster.insert_attempts(), 0);
        assert!(fx.identity.updates().is_empty());
    }

    #[tokio::test]
    async fn test_mirror_failure_does_not_fail_enrollment() {
        let fx = fixture();
        let inst = fx.roster.add_institution("Gazi Üniversitesi");
        fx.roster.add_group(inst.id, "Gazi");
        fx.identity.set_fail_updates(true);

        let outcome = fx
            .resolver
            .resolve(&claim("GAZİ ÜNİVERSİTESİ"), EMAIL, Uuid::new_v4(), &token())
            .await
            .unwrap();
        assert!(!outcome.already_member);
        assert_eq!(fx.roster.memberships().len(), 1);
    }

    #[test]
    fn test_strip_suffix() {
        assert_eq!(
            strip_institution_suffix("ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ"),
            "ankara yildirim beyazit"
        );
        assert_eq!(strip_institution_suffix("ÜNİVERSİTESİ"), "");
        assert_eq!(strip_institution_suffix("Hacettepe"), "hacettepe");
    }

    #[test]
    fn test_student_number() {
        assert_eq!(student_number("ahmet@aybu.edu.tr"), "ahmet");
        assert_eq!(student_number("no-at"), "no-at");
    }
}
