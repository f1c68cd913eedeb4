//! Protocol suite for request/verify/commit against the in-memory store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::error::ResetError;
use super::memory::MemoryResetStore;
use super::service::{ResetConfig, ResetService};
use crate::crypto;
use crate::notify::{Delivery, Mailer};

/// Mailer that records outbound messages and reports a configurable
/// delivery outcome.
struct RecordingMailer {
    delivered: bool,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    fn reliable() -> Self {
        Self {
            delivered: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn broken() -> Self {
        Self {
            delivered: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent_bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("mailer poisoned")
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to_email: &str,
        _to_name: &str,
        _subject: &str,
        html_body: &str,
    ) -> Delivery {
        self.sent
            .lock()
            .expect("mailer poisoned")
            .push((to_email.to_string(), html_body.to_string()));
        if self.delivered {
            Delivery::sent("recorded")
        } else {
            Delivery::failed("simulated transport failure")
        }
    }
}

fn service(store: Arc<MemoryResetStore>, mailer: Arc<RecordingMailer>) -> ResetService {
    ResetService::new(store, mailer, ResetConfig::new())
}

fn seeded_store(email: &str) -> Arc<MemoryResetStore> {
    let store = Arc::new(MemoryResetStore::new());
    let hash = crypto::hash_password("OldPass1").expect("hash");
    store.add_account(email, "Asha", &hash);
    store
}

#[tokio::test]
async fn request_for_unknown_email_fails_not_found_and_creates_nothing() {
    let store = Arc::new(MemoryResetStore::new());
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));

    let err = svc.request_reset("ghost@x.com").await.unwrap_err();
    assert!(matches!(err, ResetError::NotFound));
    assert_eq!(store.otp_count(), 0);
}

#[tokio::test]
async fn request_with_empty_email_fails_validation() {
    let store = Arc::new(MemoryResetStore::new());
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));

    let err = svc.request_reset("   ").await.unwrap_err();
    assert!(matches!(err, ResetError::Validation("email")));
    assert_eq!(store.otp_count(), 0);
}

#[tokio::test]
async fn request_issues_fixed_width_code_with_ten_minute_window() {
    let store = seeded_store("a@x.com");
    let mailer = Arc::new(RecordingMailer::reliable());
    let svc = service(store.clone(), mailer.clone());

    let issued = svc.request_reset("a@x.com").await.expect("issued");

    assert_eq!(issued.code.len(), 6);
    assert!(issued.code.chars().all(|c| c.is_ascii_digit()));
    assert!(issued.delivery.delivered);

    let records = store.otps();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert!(!record.is_used);
    assert_eq!(record.code, issued.code);
    assert_eq!(record.expires_at, record.created_at + Duration::minutes(10));

    // The code is embedded in the delivered message.
    assert!(mailer.sent_bodies()[0].contains(&issued.code));
}

#[tokio::test]
async fn repeated_requests_leave_all_codes_outstanding() {
    let store = seeded_store("a@x.com");
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));

    let first = svc.request_reset("a@x.com").await.expect("first");
    let second = svc.request_reset("a@x.com").await.expect("second");

    assert_eq!(store.otp_count(), 2);
    svc.verify_reset("a@x.com", &first.code).await.expect("first still valid");
    svc.verify_reset("a@x.com", &second.code).await.expect("second valid");
}

#[tokio::test]
async fn delivery_failure_does_not_fail_issuance() {
    let store = seeded_store("a@x.com");
    let svc = service(store.clone(), Arc::new(RecordingMailer::broken()));

    let issued = svc.request_reset("a@x.com").await.expect("issued anyway");

    assert!(!issued.delivery.delivered);
    assert_eq!(issued.delivery.detail, "simulated transport failure");
    // The record is the source of truth and was persisted regardless.
    assert_eq!(store.otp_count(), 1);
    svc.verify_reset("a@x.com", &issued.code)
        .await
        .expect("code is usable despite failed delivery");
}

#[tokio::test]
async fn verify_rejects_unknown_pair_as_invalid() {
    let store = seeded_store("a@x.com");
    let svc = service(store, Arc::new(RecordingMailer::reliable()));

    let err = svc.verify_reset("a@x.com", "000000").await.unwrap_err();
    assert!(matches!(err, ResetError::InvalidCode));
}

#[tokio::test]
async fn verify_distinguishes_expired_from_invalid() {
    let store = seeded_store("a@x.com");
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));

    let issued = svc.request_reset("a@x.com").await.expect("issued");
    svc.verify_reset("a@x.com", &issued.code)
        .await
        .expect("valid inside window");

    store.expire_otps("a@x.com", &issued.code);

    let err = svc.verify_reset("a@x.com", &issued.code).await.unwrap_err();
    assert!(matches!(err, ResetError::Expired));
}

#[tokio::test]
async fn verify_does_not_consume() {
    let store = seeded_store("a@x.com");
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));

    let issued = svc.request_reset("a@x.com").await.expect("issued");
    svc.verify_reset("a@x.com", &issued.code).await.expect("ok");
    svc.verify_reset("a@x.com", &issued.code)
        .await
        .expect("verify is read-only and repeatable");
    assert!(!store.otps()[0].is_used);
}

#[tokio::test]
async fn commit_changes_password_and_consumes_exactly_once() {
    let store = seeded_store("a@x.com");
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));

    let issued = svc.request_reset("a@x.com").await.expect("issued");
    svc.commit_reset("a@x.com", &issued.code, "NewPass1")
        .await
        .expect("commit");

    let hash = store.password_hash("a@x.com").expect("account exists");
    assert!(crypto::verify_password("NewPass1", &hash).expect("verify"));
    assert!(!crypto::verify_password("OldPass1", &hash).expect("verify"));
    assert!(store.otps()[0].is_used);

    // Replay: the same pair is now indistinguishable from never-issued.
    let err = svc
        .commit_reset("a@x.com", &issued.code, "AnotherPass2")
        .await
        .unwrap_err();
    assert!(matches!(err, ResetError::InvalidCode));
    assert!(crypto::verify_password("NewPass1", &hash).expect("verify"));
}

#[tokio::test]
async fn commit_leaves_sibling_codes_usable() {
    let store = seeded_store("a@x.com");
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));

    let first = svc.request_reset("a@x.com").await.expect("first");
    let second = svc.request_reset("a@x.com").await.expect("second");

    svc.commit_reset("a@x.com", &first.code, "NewPass1")
        .await
        .expect("commit first");

    if second.code != first.code {
        svc.verify_reset("a@x.com", &second.code)
            .await
            .expect("sibling stays usable until its own expiry");
    }
}

#[tokio::test]
async fn commit_after_expiry_fails_and_leaves_password_unchanged() {
    let store = seeded_store("a@x.com");
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));
    let before = store.password_hash("a@x.com").expect("hash");

    let issued = svc.request_reset("a@x.com").await.expect("issued");
    store.expire_otps("a@x.com", &issued.code);

    let err = svc
        .commit_reset("a@x.com", &issued.code, "NewPass1")
        .await
        .unwrap_err();
    assert!(matches!(err, ResetError::Expired));
    assert_eq!(store.password_hash("a@x.com"), Some(before));
    assert!(!store.otps()[0].is_used);
}

#[tokio::test]
async fn commit_with_empty_password_fails_validation() {
    let store = seeded_store("a@x.com");
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));

    let issued = svc.request_reset("a@x.com").await.expect("issued");
    let err = svc
        .commit_reset("a@x.com", &issued.code, "")
        .await
        .unwrap_err();
    assert!(matches!(err, ResetError::Validation("new_password")));
    assert!(!store.otps()[0].is_used);
}

#[tokio::test]
async fn vanished_account_fails_not_found_without_consuming_the_code() {
    let store = seeded_store("a@x.com");
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));

    let issued = svc.request_reset("a@x.com").await.expect("issued");
    store.remove_account("a@x.com");

    let err = svc
        .commit_reset("a@x.com", &issued.code, "NewPass1")
        .await
        .unwrap_err();
    assert!(matches!(err, ResetError::NotFound));
    // Partial application would be a correctness violation.
    assert!(!store.otps()[0].is_used);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commits_resolve_to_exactly_one_winner() {
    let store = seeded_store("a@x.com");
    let svc = Arc::new(service(
        store.clone(),
        Arc::new(RecordingMailer::reliable()),
    ));

    let issued = svc.request_reset("a@x.com").await.expect("issued");

    let left = {
        let svc = svc.clone();
        let code = issued.code.clone();
        tokio::spawn(async move { svc.commit_reset("a@x.com", &code, "LeftPass1").await })
    };
    let right = {
        let svc = svc.clone();
        let code = issued.code.clone();
        tokio::spawn(async move { svc.commit_reset("a@x.com", &code, "RightPass1").await })
    };

    let left = left.await.expect("join");
    let right = right.await.expect("join");

    let winners = [&left, &right].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one commit may consume the code");

    let loser = if left.is_ok() { right } else { left };
    assert!(matches!(loser.unwrap_err(), ResetError::InvalidCode));

    // The password reflects exactly the winning commit.
    let hash = store.password_hash("a@x.com").expect("account exists");
    let left_matches = crypto::verify_password("LeftPass1", &hash).expect("verify");
    let right_matches = crypto::verify_password("RightPass1", &hash).expect("verify");
    assert!(left_matches ^ right_matches);

    // Single consumption on the ledger.
    let used = store.otps().iter().filter(|r| r.is_used).count();
    assert_eq!(used, 1);
}

#[tokio::test]
async fn issuance_scenario_end_to_end() {
    // RequestReset -> Verify -> simulated expiry -> Verify/Commit fail Expired.
    let store = seeded_store("a@x.com");
    let svc = service(store.clone(), Arc::new(RecordingMailer::reliable()));
    let before = store.password_hash("a@x.com").expect("hash");

    let issued = svc.request_reset("a@x.com").await.expect("issued");
    assert_eq!(issued.email, "a@x.com");
    svc.verify_reset("a@x.com", &issued.code)
        .await
        .expect("immediately valid");

    store.expire_otps("a@x.com", &issued.code);

    assert!(matches!(
        svc.verify_reset("a@x.com", &issued.code).await.unwrap_err(),
        ResetError::Expired
    ));
    assert!(matches!(
        svc.commit_reset("a@x.com", &issued.code, "NewPass1")
            .await
            .unwrap_err(),
        ResetError::Expired
    ));
    assert_eq!(store.password_hash("a@x.com"), Some(before));
}
