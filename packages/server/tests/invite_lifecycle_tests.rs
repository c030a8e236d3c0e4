//! Invite generation, delivery, and administration.

mod common;

use common::fixtures::*;
use common::TestHarness;

use server_core::config::{ProviderSettings, ProvisioningSettings};
use server_core::domains::identity::DiscordIdentity;
use server_core::domains::invites::actions::{
    self, delete_invite, generate_invite, GenerateInviteRequest,
};
use server_core::domains::invites::NotifyPrefs;
use server_core::domains::profiles::Profile;
use server_core::kernel::test_dependencies::{
    MockDiscordService, MockMailer, TestDependencies,
};

fn delivery_settings() -> ProvisioningSettings {
    ProvisioningSettings {
        invite_messages: true,
        ..email_settings()
    }
}

fn discord_delivery_settings() -> ProvisioningSettings {
    ProvisioningSettings {
        discord: ProviderSettings {
            enabled: true,
            required: false,
        },
        ..delivery_settings()
    }
}

fn member(username: &str, channel: &str) -> DiscordIdentity {
    DiscordIdentity {
        id: format!("id-{}", username),
        username: username.to_string(),
        channel_id: channel.to_string(),
        contact: true,
    }
}

#[tokio::test]
async fn test_generated_codes_are_wellformed_and_unique_enough() {
    let harness = TestHarness::new(base_settings()).await;

    let code = generate_invite(
        &harness.state,
        GenerateInviteRequest {
            hours: 1,
            ..GenerateInviteRequest::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(code.len(), 8);
    assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert!(!code.starts_with(|c: char| c.is_ascii_digit()));

    let invite = harness.state.invites.get(&code).unwrap();
    assert_eq!(invite.remaining_uses, 1);
    assert!(!invite.no_limit);
    assert!(invite.valid_till > invite.created);
}

#[tokio::test]
async fn test_multi_use_and_unlimited_requests() {
    let harness = TestHarness::new(base_settings()).await;

    let code = generate_invite(
        &harness.state,
        GenerateInviteRequest {
            hours: 1,
            multiple_uses: true,
            remaining_uses: 5,
            ..GenerateInviteRequest::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(harness.state.invites.get(&code).unwrap().remaining_uses, 5);

    let code = generate_invite(
        &harness.state,
        GenerateInviteRequest {
            hours: 1,
            multiple_uses: true,
            no_limit: true,
            ..GenerateInviteRequest::default()
        },
    )
    .await
    .unwrap();
    let invite = harness.state.invites.get(&code).unwrap();
    assert!(invite.no_limit);
    assert_eq!(invite.remaining_uses, 0);
}

#[tokio::test]
async fn test_missing_profile_falls_back_to_default() {
    let harness = TestHarness::new(base_settings()).await;
    harness
        .state
        .profiles
        .create("Premium", Profile::default())
        .await;

    let code = generate_invite(
        &harness.state,
        GenerateInviteRequest {
            hours: 1,
            profile: "Premium".to_string(),
            ..GenerateInviteRequest::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(harness.state.invites.get(&code).unwrap().profile, "Premium");

    let code = generate_invite(
        &harness.state,
        GenerateInviteRequest {
            hours: 1,
            profile: "Deleted".to_string(),
            ..GenerateInviteRequest::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(harness.state.invites.get(&code).unwrap().profile, "Default");
}

#[tokio::test]
async fn test_invite_emailed_to_address() {
    let harness = TestHarness::new(delivery_settings()).await;

    let code = generate_invite(
        &harness.state,
        GenerateInviteRequest {
            hours: 1,
            send_to: "friend@example.com".to_string(),
            ..GenerateInviteRequest::default()
        },
    )
    .await
    .unwrap();

    let sent = harness.mocks.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "friend@example.com");
    assert!(sent[0].1.body.contains(&code));
    assert_eq!(
        harness.state.invites.get(&code).unwrap().send_to,
        "friend@example.com"
    );
}

#[tokio::test]
async fn test_delivery_failure_is_recorded_not_fatal() {
    let mocks = TestDependencies::new().with_mailer(MockMailer::new().failing());
    let harness = TestHarness::with_mocks(mocks, delivery_settings()).await;

    let code = generate_invite(
        &harness.state,
        GenerateInviteRequest {
            hours: 1,
            send_to: "friend@example.com".to_string(),
            ..GenerateInviteRequest::default()
        },
    )
    .await
    .unwrap();

    let invite = harness.state.invites.get(&code).unwrap();
    assert_eq!(invite.send_to, "Failed to send to friend@example.com");
}

#[tokio::test]
async fn test_invite_sent_to_discord_handle() {
    let mocks = TestDependencies::new()
        .with_discord(MockDiscordService::new().with_member(member("buddy", "chan-9")));
    let harness = TestHarness::with_mocks(mocks, discord_delivery_settings()).await;

    let code = generate_invite(
        &harness.state,
        GenerateInviteRequest {
            hours: 1,
            send_to: "buddy".to_string(),
            ..GenerateInviteRequest::default()
        },
    )
    .await
    .unwrap();

    let dms = harness.mocks.discord.dms();
    assert_eq!(dms.len(), 1);
    assert_eq!(dms[0].0, "chan-9");
    assert!(dms[0].1.body.contains(&code));
    assert_eq!(harness.state.invites.get(&code).unwrap().send_to, "buddy");
}

#[tokio::test]
async fn test_unknown_discord_handle_is_recorded() {
    let harness = TestHarness::new(discord_delivery_settings()).await;

    let code = generate_invite(
        &harness.state,
        GenerateInviteRequest {
            hours: 1,
            send_to: "nobody".to_string(),
            ..GenerateInviteRequest::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(
        harness.state.invites.get(&code).unwrap().send_to,
        "Failed: User not found: \"nobody\""
    );
}

#[tokio::test]
async fn test_ambiguous_discord_handle_is_recorded() {
    let mocks = TestDependencies::new().with_discord(
        MockDiscordService::new()
            .with_member(member("buddy", "chan-1"))
            .with_member(member("buddy", "chan-2")),
    );
    let harness = TestHarness::with_mocks(mocks, discord_delivery_settings()).await;

    let code = generate_invite(
        &harness.state,
        GenerateInviteRequest {
            hours: 1,
            send_to: "buddy".to_string(),
            ..GenerateInviteRequest::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(
        harness.state.invites.get(&code).unwrap().send_to,
        "Failed: Multiple users found: \"buddy\""
    );
    assert!(harness.mocks.discord.dms().is_empty());
}

#[tokio::test]
async fn test_delete_and_notify_administration() {
    let harness = TestHarness::new(base_settings()).await;
    seed_invite(&harness.state, "code1234", 1).await;

    assert!(
        actions::set_notify(
            &harness.state,
            "code1234",
            "admin@example.com",
            NotifyPrefs {
                on_expiry: true,
                on_creation: true,
            },
        )
        .await
    );
    let invite = harness.state.invites.get("code1234").unwrap();
    assert_eq!(invite.expiry_subscribers(), vec!["admin@example.com"]);
    assert_eq!(invite.creation_subscribers(), vec!["admin@example.com"]);

    assert!(delete_invite(&harness.state, "code1234").await);
    assert!(!delete_invite(&harness.state, "code1234").await);
    assert!(harness.state.invites.get("code1234").is_none());
}
