//! Enrollment is idempotent per (user, group).

mod helpers;

use campus_types::{MembershipRecord, SessionToken, VerificationClaim};
use campus_verify::EnrollmentResolver;
use helpers::{Harness, EMAIL};

fn aybu_claim() -> VerificationClaim {
    VerificationClaim::new(
        Some("ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ".to_string()),
        Some("Bilgisayar Mühendisliği".to_string()),
        Some("3".to_string()),
    )
}

fn resolver(harness: &Harness) -> EnrollmentResolver {
    EnrollmentResolver::new(
        harness.roster.clone(),
        harness.functions.clone(),
        harness.identity.clone(),
    )
}

#[tokio::test]
async fn test_resolve_twice_one_membership() {
    let harness = Harness::new();
    let resolver = resolver(&harness);
    let user = harness.user_id();
    let token = SessionToken::new("verified");

    let first = resolver
        .resolve(&aybu_claim(), EMAIL, user, &token)
        .await
        .unwrap();
    let second = resolver
        .resolve(&aybu_claim(), EMAIL, user, &token)
        .await
        .unwrap();

    assert!(!first.already_member);
    assert!(second.already_member);
    assert_eq!(first.group, second.group);
    assert_eq!(harness.roster.insert_attempts(), 2);
    assert_eq!(
        harness.roster.memberships(),
        vec![MembershipRecord::member(user, harness.group.id)]
    );
}

#[tokio::test]
async fn test_duplicate_still_mirrors_latest_code() {
    let harness = Harness::new();
    let resolver = resolver(&harness);
    let user = harness.user_id();
    let token = SessionToken::new("verified");

    resolver
        .resolve(&aybu_claim(), EMAIL, user, &token)
        .await
        .unwrap();
    let second = resolver
        .resolve(&aybu_claim(), EMAIL, user, &token)
        .await
        .unwrap();

    let updates = harness.identity.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(
        updates[1].campus_code.as_deref(),
        Some(second.code.as_str())
    );
}

#[tokio::test]
async fn test_distinct_users_each_enrolled() {
    let harness = Harness::new();
    let resolver = resolver(&harness);
    let token = SessionToken::new("verified");
    let users = [uuid::Uuid::new_v4(), uuid::Uuid::new_v4()];

    for user in users {
        resolver
            .resolve(&aybu_claim(), EMAIL, user, &token)
            .await
            .unwrap();
    }

    let memberships = harness.roster.memberships();
    assert_eq!(memberships.len(), 2);
    assert!(memberships.iter().all(|m| m.group_id == harness.group.id));
}

#[tokio::test]
async fn test_mirror_failure_keeps_membership() {
    let harness = Harness::new();
    harness.identity.set_fail_updates(true);
    let resolver = resolver(&harness);
    let user = harness.user_id();

    let outcome = resolver
        .resolve(&aybu_claim(), EMAIL, user, &SessionToken::new("verified"))
        .await
        .unwrap();

    assert!(!outcome.already_member);
    assert_eq!(harness.roster.memberships().len(), 1);
    assert!(harness.identity.updates().is_empty());
}
