//! In-memory collaborators for tests and local demos.
//!
//! Behaviour mirrors the hosted services closely enough to drive the whole
//! verification flow: OTP codes are generated and checked, generate-code
//! issues fresh codes, the roster enforces (user, group) uniqueness.

use async_trait::async_trait;
use campus_types::{
    fold_locale, AuthSession, Institution, MembershipGroup, MembershipRecord, ProfilePatch,
    SessionToken, UserIdentity,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    ClientError, FunctionRequest, FunctionResponse, IdentityProvider, RemoteFunctions, Result,
    RosterStore,
};

fn lock_error(e: impl std::fmt::Display) -> ClientError {
    ClientError::Store(format!("Lock: {}", e))
}

// ============================================================================
// IDENTITY
// ============================================================================

pub struct MemoryIdentityProvider {
    session: watch::Sender<Option<AuthSession>>,
    updates: Mutex<Vec<ProfilePatch>>,
    fail_updates: AtomicBool,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            session,
            updates: Mutex::new(Vec::new()),
            fail_updates: AtomicBool::new(false),
        }
    }

    /// Provider with `email` already signed in.
    pub fn signed_in(email: &str) -> Self {
        let provider = Self::new();
        provider.sign_in(UserIdentity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            metadata: serde_json::Map::new(),
        });
        provider
    }

    pub fn sign_in(&self, user: UserIdentity) {
        let token = SessionToken::new(format!("mem-session-{}", Uuid::new_v4()));
        self.session.send_replace(Some(AuthSession {
            user,
            access_token: token,
        }));
    }

    pub fn sign_out(&self) {
        self.session.send_replace(None);
    }

    /// Make every subsequent metadata update fail (or succeed again).
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Every patch accepted so far, oldest first.
    pub fn updates(&self) -> Vec<ProfilePatch> {
        self.updates.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.session.borrow().as_ref().map(|s| s.user.id)
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        Ok(self.session.borrow().as_ref().map(|s| s.user.clone()))
    }

    async fn current_session(&self) -> Result<Option<SessionToken>> {
        Ok(self
            .session
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone()))
    }

    async fn update_user_metadata(&self, patch: &ProfilePatch) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 503,
                body: "identity service unavailable".to_string(),
            });
        }
        if self.session.borrow().is_none() {
            return Err(ClientError::NotAuthenticated);
        }

        let fields = match serde_json::to_value(patch)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        self.session.send_modify(|session| {
            if let Some(session) = session {
                for (key, value) in fields {
                    session.user.metadata.insert(key, value);
                }
            }
        });
        self.updates.lock().map_err(lock_error)?.push(patch.clone());
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.session.subscribe()
    }
}

// ============================================================================
// FUNCTION GATEWAY
// ============================================================================

/// Gateway double. Every request is recorded; OTP codes are random six-digit
/// strings readable through [`MemoryRemoteFunctions::pending_code`].
pub struct MemoryRemoteFunctions {
    calls: Mutex<Vec<FunctionRequest>>,
    pending: Mutex<HashMap<String, String>>,
    unknown_recipients: RwLock<HashSet<String>>,
    offline: AtomicBool,
    fail_generation: AtomicBool,
}

impl MemoryRemoteFunctions {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
            unknown_recipients: RwLock::new(HashSet::new()),
            offline: AtomicBool::new(false),
            fail_generation: AtomicBool::new(false),
        }
    }

    /// Sends to `email` will be refused as an unknown recipient.
    pub fn with_unknown_recipient(self, email: &str) -> Self {
        if let Ok(mut set) = self.unknown_recipients.write() {
            set.insert(email.to_lowercase());
        }
        self
    }

    /// Simulate a transport outage.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make generate-code answer `{success: false}`.
    pub fn set_fail_generation(&self, fail: bool) {
        self.fail_generation.store(fail, Ordering::SeqCst);
    }

    /// The code most recently mailed to `email`, if still unused.
    pub fn pending_code(&self, email: &str) -> Option<String> {
        self.pending
            .lock()
            .ok()
            .and_then(|p| p.get(&email.to_lowercase()).cloned())
    }

    pub fn calls(&self) -> Vec<FunctionRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of recorded calls for one action name.
    pub fn call_count(&self, action: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.action() == action)
            .count()
    }
}

impl Default for MemoryRemoteFunctions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteFunctions for MemoryRemoteFunctions {
    async fn invoke(
        &self,
        request: &FunctionRequest,
        _credential: Option<&SessionToken>,
    ) -> Result<FunctionResponse> {
        self.calls.lock().map_err(lock_error)?.push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 503,
                body: "gateway unavailable".to_string(),
            });
        }

        match request {
            FunctionRequest::SendEmailOtp { email } => {
                let email = email.to_lowercase();
                let unknown = self
                    .unknown_recipients
                    .read()
                    .map_err(lock_error)?
                    .contains(&email);
                if unknown {
                    return Ok(FunctionResponse::failed("Signups not allowed for otp"));
                }

                let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
                self.pending.lock().map_err(lock_error)?.insert(email, code);
                Ok(FunctionResponse::ok())
            }
            FunctionRequest::VerifyEmailOtp { email, code } => {
                let mut pending = self.pending.lock().map_err(lock_error)?;
                let key = email.to_lowercase();
                if pending.get(&key) == Some(code) {
                    pending.remove(&key);
                    Ok(FunctionResponse::ok()
                        .with_access_token(format!("mem-verified-{}", Uuid::new_v4())))
                } else {
                    Ok(FunctionResponse::failed("Token has expired or is invalid"))
                }
            }
            FunctionRequest::GenerateCode { .. } => {
                if self.fail_generation.load(Ordering::SeqCst) {
                    return Ok(FunctionResponse::failed("Kod üretilemedi"));
                }
                let suffix: String = rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(8)
                    .map(char::from)
                    .collect();
                Ok(FunctionResponse::ok().with_code(format!("OARK-{}", suffix.to_uppercase())))
            }
        }
    }
}

// ============================================================================
// ROSTER
// ============================================================================

#[derive(Default)]
pub struct MemoryRosterStore {
    institutions: RwLock<Vec<Institution>>,
    groups: RwLock<Vec<MembershipGroup>>,
    members: RwLock<Vec<MembershipRecord>>,
    insert_attempts: Mutex<usize>,
}

impl MemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_institution(&self, name: &str) -> Institution {
        let institution = Institution {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        if let Ok(mut all) = self.institutions.write() {
            all.push(institution.clone());
        }
        institution
    }

    pub fn add_group(&self, institution_id: Uuid, name: &str) -> MembershipGroup {
        let group = MembershipGroup {
            id: Uuid::new_v4(),
            institution_id,
            name: name.to_string(),
        };
        if let Ok(mut all) = self.groups.write() {
            all.push(group.clone());
        }
        group
    }

    pub fn memberships(&self) -> Vec<MembershipRecord> {
        self.members.read().map(|m| m.clone()).unwrap_or_default()
    }

    /// Calls to `insert_membership`, including refused duplicates.
    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.lock().map(|n| *n).unwrap_or_default()
    }
}

#[async_trait]
impl RosterStore for MemoryRosterStore {
    async fn find_institution_exact(&self, name: &str) -> Result<Option<Institution>> {
        let wanted = fold_locale(name.trim());
        let all = self.institutions.read().map_err(lock_error)?;
        Ok(all.iter().find(|i| fold_locale(&i.name) == wanted).cloned())
    }

    async fn find_institution_containing(&self, fragment: &str) -> Result<Option<Institution>> {
        let wanted = fold_locale(fragment.trim());
        if wanted.is_empty() {
            return Ok(None);
        }
        let all = self.institutions.read().map_err(lock_error)?;
        let mut hits: Vec<&Institution> = all
            .iter()
            .filter(|i| fold_locale(&i.name).contains(&wanted))
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hits.first().map(|i| (*i).clone()))
    }

    async fn first_group(&self, institution_id: Uuid) -> Result<Option<MembershipGroup>> {
        let all = self.groups.read().map_err(lock_error)?;
        Ok(all
            .iter()
            .find(|g| g.institution_id == institution_id)
            .cloned())
    }

    async fn insert_membership(&self, record: &MembershipRecord) -> Result<()> {
        *self.insert_attempts.lock().map_err(lock_error)? += 1;

        let mut members = self.members.write().map_err(lock_error)?;
        if members
            .iter()
            .any(|m| m.user_id == record.user_id && m.group_id == record.group_id)
        {
            return Err(ClientError::UniqueViolation(format!(
                "group_members (user_id, group_id)=({}, {})",
                record.user_id, record.group_id
            )));
        }
        members.push(record.clone());
        Ok(())
    }
}
