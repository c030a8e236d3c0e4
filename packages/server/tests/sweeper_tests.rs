//! Expired-invite housekeeping.

mod common;

use chrono::Utc;

use common::fixtures::*;
use common::TestHarness;

use server_core::domains::invites::actions;

#[tokio::test]
async fn test_sweep_deletes_only_expired_invites() {
    let harness = TestHarness::new(base_settings()).await;
    seed_expired_invite(&harness.state, "old00001", None).await;
    seed_expired_invite(&harness.state, "old00002", None).await;
    seed_invite(&harness.state, "live0001", 1).await;

    let deleted = harness
        .provisioner()
        .sweep_expired_invites(Utc::now())
        .await;

    assert_eq!(deleted, 2);
    assert!(harness.state.invites.get("old00001").is_none());
    assert!(harness.state.invites.get("old00002").is_none());
    assert!(harness.state.invites.get("live0001").is_some());
}

#[tokio::test]
async fn test_sweep_is_a_noop_without_expired_invites() {
    let harness = TestHarness::new(base_settings()).await;
    seed_invite(&harness.state, "live0001", 1).await;

    let writes_before = harness.mocks.store.invite_writes();
    let deleted = harness
        .provisioner()
        .sweep_expired_invites(Utc::now())
        .await;

    assert_eq!(deleted, 0);
    assert_eq!(harness.mocks.store.invite_writes(), writes_before);
}

#[tokio::test]
async fn test_sweep_persists_once_for_a_batch() {
    let harness = TestHarness::new(base_settings()).await;
    seed_expired_invite(&harness.state, "old00001", None).await;
    seed_expired_invite(&harness.state, "old00002", None).await;
    seed_expired_invite(&harness.state, "old00003", None).await;

    let writes_before = harness.mocks.store.invite_writes();
    harness
        .provisioner()
        .sweep_expired_invites(Utc::now())
        .await;

    assert_eq!(harness.mocks.store.invite_writes(), writes_before + 1);
    assert!(harness.mocks.store.stored_invites().is_empty());
}

#[tokio::test]
async fn test_sweep_notifies_expiry_subscribers() {
    let harness = TestHarness::new(email_settings()).await;
    seed_expired_invite(&harness.state, "old00001", Some("admin@example.com")).await;

    harness
        .provisioner()
        .sweep_expired_invites(Utc::now())
        .await;

    let sent = harness.mocks.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "admin@example.com");
    assert!(sent[0].1.body.contains("old00001"));
}

#[tokio::test]
async fn test_sweep_skips_notifications_when_email_disabled() {
    let harness = TestHarness::new(base_settings()).await;
    seed_expired_invite(&harness.state, "old00001", Some("admin@example.com")).await;

    let deleted = harness
        .provisioner()
        .sweep_expired_invites(Utc::now())
        .await;

    assert_eq!(deleted, 1);
    assert!(harness.mocks.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_listing_invites_sweeps_opportunistically() {
    let harness = TestHarness::new(base_settings()).await;
    seed_expired_invite(&harness.state, "old00001", None).await;
    seed_invite(&harness.state, "live0001", 1).await;

    let listed = actions::list_invites(&harness.state).await;

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].0, "live0001");
    assert!(harness.state.invites.get("old00001").is_none());
}
