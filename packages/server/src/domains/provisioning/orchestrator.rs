//! The provisioning state machine.
//!
//! Strictly sequential, no automatic retries. Hard failures only before the
//! account exists; from `create_account` success onward every problem is
//! best-effort and lands in the diagnostics instead of unwinding real state.
//! Invite consumption is the final step so a creation failure never spends
//! the invite or any verification PIN.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use super::errors::ProvisionError;
use super::types::{ProvisionDiagnostics, ProvisionStatus, ProvisioningRequest, VerifiedPin};
use crate::common::ServerState;
use crate::domains::confirmation::{ConfirmationPayload, CONFIRMATION_TTL_HOURS};
use crate::domains::identity::{
    DiscordIdentity, EmailContact, MatrixIdentity, TelegramIdentity,
};
use crate::domains::invites::sweep_expired_invites;
use crate::domains::notify::messages;
use crate::domains::profiles::{apply_profile, Profile};
use crate::domains::verification::{provider_gates, Provider, ProviderGate, VerifiedIdentity};

pub struct Provisioner {
    state: ServerState,
    gates: Vec<ProviderGate>,
}

impl Provisioner {
    pub fn new(state: ServerState) -> Self {
        let gates = provider_gates(
            &state.settings,
            state.discord_registry.clone(),
            state.matrix_registry.clone(),
            state.telegram_registry.clone(),
        );
        Self { state, gates }
    }

    /// First-pass entry point: validate the invite and verifications, then
    /// either suspend for email confirmation or create the account.
    pub async fn begin(
        &self,
        req: ProvisioningRequest,
    ) -> Result<ProvisionStatus, ProvisionError> {
        let now = Utc::now();
        self.validate_invite(&req.code, now).await?;
        self.check_username_free(&req.code, &req.username).await?;
        let verified = self.validate_verifications(&req)?;

        if self.state.settings.email_enabled && self.state.settings.email_confirmation {
            return self.suspend_for_confirmation(&req).await;
        }

        self.create_and_configure(req, verified).await
    }

    /// Second-pass entry point: a valid confirmation token stands in for the
    /// original request body and resumes at account creation.
    pub async fn resume(&self, token: &str) -> Result<ProvisionStatus, ProvisionError> {
        let payload = match self.state.confirmation.verify(token) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Confirmation token rejected: {}", e);
                return Err(ProvisionError::InvalidToken);
            }
        };

        let now = Utc::now();
        self.validate_invite(&payload.invite_code, now).await?;
        self.check_username_free(&payload.invite_code, &payload.username)
            .await?;

        // Verification already passed before suspension; only the Telegram
        // PIN survives inside the token, so its identity is re-collected
        // opportunistically for linking.
        let mut verified = Vec::new();
        if self.state.settings.telegram.enabled && !payload.telegram_pin.is_empty() {
            match self.state.telegram_registry.check_verified(&payload.telegram_pin) {
                Some(identity) => verified.push(VerifiedPin {
                    provider: Provider::Telegram,
                    pin: payload.telegram_pin.clone(),
                    identity,
                    contact: true,
                }),
                None => debug!(
                    "{}: Telegram PIN no longer verified after confirmation",
                    payload.invite_code
                ),
            }
        }

        let req = ProvisioningRequest {
            code: payload.invite_code,
            username: payload.username,
            password: payload.password,
            email: payload.email,
            telegram_pin: payload.telegram_pin,
            ..ProvisioningRequest::default()
        };
        self.create_and_configure(req, verified).await
    }

    /// Produced-interface surface: consume a provider verification directly
    /// (used by flows that link an identity outside provisioning).
    pub fn consume_verification(&self, provider: Provider, pin: &str) -> Option<VerifiedIdentity> {
        self.state.registry_for(provider).consume(pin)
    }

    /// Produced-interface surface: run the housekeeping sweep.
    pub async fn sweep_expired_invites(&self, now: DateTime<Utc>) -> usize {
        sweep_expired_invites(&self.state, now).await
    }

    async fn validate_invite(&self, code: &str, now: DateTime<Utc>) -> Result<(), ProvisionError> {
        if !self.state.invites.validate(code, now).await {
            debug!("{}: New account failed: invalid invite code", code);
            return Err(ProvisionError::InvalidCode);
        }
        Ok(())
    }

    async fn check_username_free(&self, code: &str, username: &str) -> Result<(), ProvisionError> {
        match self.state.deps.accounts.account_by_name(username).await {
            Ok(Some(_)) => {
                info!("{}: New account failed: user {} already exists", code, username);
                Err(ProvisionError::UsernameTaken(username.to_string()))
            }
            Ok(None) => Ok(()),
            // An unreachable account service will fail loudly at creation;
            // don't reject on the pre-check.
            Err(e) => {
                debug!("{}: Username pre-check failed: {}", code, e);
                Ok(())
            }
        }
    }

    /// Walk the fixed provider order (Discord, Matrix, Telegram). The first
    /// failing provider short-circuits the rest.
    fn validate_verifications(
        &self,
        req: &ProvisioningRequest,
    ) -> Result<Vec<VerifiedPin>, ProvisionError> {
        let mut verified = Vec::new();
        for gate in &self.gates {
            if !gate.enabled {
                continue;
            }
            let pin = req.pin_for(gate.provider);
            if pin.is_empty() {
                if gate.required {
                    debug!(
                        "{}: New account failed: {} verification not completed",
                        req.code, gate.provider
                    );
                    return Err(ProvisionError::VerificationRequired(gate.provider));
                }
                continue;
            }
            match gate.registry.check_verified(pin) {
                Some(identity) => verified.push(VerifiedPin {
                    provider: gate.provider,
                    pin: pin.to_string(),
                    identity,
                    contact: req.contact_for(gate.provider),
                }),
                None => {
                    debug!(
                        "{}: New account failed: {} PIN was invalid",
                        req.code, gate.provider
                    );
                    return Err(ProvisionError::InvalidPin(gate.provider));
                }
            }
        }
        Ok(verified)
    }

    /// Issue a confirmation token, record it on the invite, and send the
    /// confirmation link. A deliberate suspension, not a failure.
    async fn suspend_for_confirmation(
        &self,
        req: &ProvisioningRequest,
    ) -> Result<ProvisionStatus, ProvisionError> {
        let payload = ConfirmationPayload {
            invite_code: req.code.clone(),
            email: req.email.clone(),
            username: req.username.clone(),
            password: req.password.clone(),
            telegram_pin: req.telegram_pin.clone(),
        };
        let token = self
            .state
            .confirmation
            .issue(&payload, Duration::hours(CONFIRMATION_TTL_HOURS))?;
        self.state
            .invites
            .append_confirmation_key(&req.code, &token)
            .await;
        debug!("{}: Email confirmation required", req.code);

        let message = messages::confirmation_link(
            &req.username,
            &self.state.settings.external_url,
            &req.code,
            &token,
        );
        match self.state.deps.mailer.send(&message, &req.email).await {
            Ok(()) => info!(
                "{}: Sent account confirmation email to \"{}\"",
                req.code, req.email
            ),
            Err(e) => error!(
                "{}: Failed to send account confirmation email: {}",
                req.code, e
            ),
        }
        Ok(ProvisionStatus::ConfirmationPending)
    }

    /// Steps shared by both entry points, from account creation onward.
    async fn create_and_configure(
        &self,
        req: ProvisioningRequest,
        verified: Vec<VerifiedPin>,
    ) -> Result<ProvisionStatus, ProvisionError> {
        let account = match self
            .state
            .deps
            .accounts
            .create_account(&req.username, &req.password)
            .await
        {
            Ok(account) => account,
            Err(e) => {
                error!("{}: Account creation failed: {}", req.code, e);
                return Err(ProvisionError::AccountCreationFailed(e.to_string()));
            }
        };

        let mut diagnostics = ProvisionDiagnostics::default();
        let now = Utc::now();
        let invite = self.state.invites.get(&req.code);

        let profile = self.apply_invite_profile(&req, &account.id, invite.as_ref(), &mut diagnostics).await;

        if !req.email.is_empty() {
            self.state
                .identities
                .set_email_contact(
                    &account.id,
                    EmailContact {
                        address: req.email.clone(),
                        contact: true,
                    },
                )
                .await;
        }

        let mut account_expiry = None;
        if let Some(offset) = invite.as_ref().and_then(|inv| inv.user_expiry) {
            let expiry = offset.apply_to(now);
            self.state.expiries.record(&account.id, expiry).await;
            account_expiry = Some(expiry);
        }

        let (discord_id, telegram_username) = self
            .link_identities(&account.id, &verified, &mut diagnostics)
            .await;

        self.link_companion_prefs(
            &req,
            profile.as_ref(),
            &discord_id,
            &telegram_username,
            &mut diagnostics,
        )
        .await;

        self.send_creation_notices(&req, invite.as_ref());

        let settings = &self.state.settings;
        if (settings.email_enabled && settings.welcome_message && !req.email.is_empty())
            || !verified.is_empty()
        {
            debug!("{}: Sending welcome message", req.username);
            let message = messages::welcome(&req.username, account_expiry);
            for failure in self
                .state
                .dispatcher
                .broadcast_to_account(&account.id, &message)
                .await
            {
                diagnostics.record("welcome", failure.to_string());
            }
        }

        self.state.invites.consume(&req.code, &req.username, now).await;

        info!("{}: Created account {}", req.code, req.username);
        Ok(ProvisionStatus::Created {
            account_id: account.id,
            diagnostics,
        })
    }

    async fn apply_invite_profile(
        &self,
        req: &ProvisioningRequest,
        account_id: &str,
        invite: Option<&crate::domains::invites::Invite>,
        diagnostics: &mut ProvisionDiagnostics,
    ) -> Option<Profile> {
        let profile_name = invite.map(|inv| inv.profile.as_str()).unwrap_or("");
        if profile_name.is_empty() {
            return None;
        }
        let Some(profile) = self.state.profiles.resolve(profile_name) else {
            debug!("Profile \"{}\" not found, skipping", profile_name);
            return None;
        };
        debug!("Applying settings from profile \"{}\"", profile_name);
        let companion = if self.state.settings.companion_enabled {
            self.state.deps.companion.as_deref()
        } else {
            None
        };
        let report = apply_profile(
            self.state.deps.accounts.as_ref(),
            companion,
            account_id,
            &req.username,
            &req.password,
            &req.email,
            &profile,
        )
        .await;
        for (aspect, reason) in report.failures() {
            diagnostics.record(aspect, reason);
        }
        Some(profile)
    }

    /// Persist identity links and consume each PIN exactly once. Provider
    /// actions (Discord role, Matrix DM room) are fallible externals whose
    /// failure never rolls back the link.
    async fn link_identities(
        &self,
        account_id: &str,
        verified: &[VerifiedPin],
        diagnostics: &mut ProvisionDiagnostics,
    ) -> (String, String) {
        let mut discord_id = String::new();
        let mut telegram_username = String::new();

        for v in verified {
            match v.provider {
                Provider::Discord => {
                    self.state
                        .identities
                        .link_discord(
                            account_id,
                            DiscordIdentity {
                                id: v.identity.user_id.clone(),
                                username: v.identity.username.clone(),
                                channel_id: v.identity.channel_id.clone(),
                                contact: v.contact,
                            },
                        )
                        .await;
                    if let Err(e) = self.state.deps.discord.apply_role(&v.identity.user_id).await
                    {
                        warn!("Failed to apply Discord member role: {}", e);
                        diagnostics.record("discord-role", e.to_string());
                    }
                    discord_id = v.identity.user_id.clone();
                }
                Provider::Matrix => {
                    let mut room_id = v.identity.channel_id.clone();
                    if room_id.is_empty() {
                        match self
                            .state
                            .deps
                            .matrix
                            .create_dm_room(&v.identity.user_id)
                            .await
                        {
                            Ok(room) => room_id = room,
                            Err(e) => {
                                warn!("Failed to create Matrix DM room: {}", e);
                                diagnostics.record("matrix-room", e.to_string());
                            }
                        }
                    }
                    self.state
                        .identities
                        .link_matrix(
                            account_id,
                            MatrixIdentity {
                                user_id: v.identity.user_id.clone(),
                                room_id,
                                contact: v.contact,
                            },
                        )
                        .await;
                }
                Provider::Telegram => {
                    let lang = self
                        .state
                        .telegram_registry
                        .language(&v.identity.channel_id)
                        .unwrap_or_default();
                    self.state
                        .identities
                        .link_telegram(
                            account_id,
                            TelegramIdentity {
                                chat_id: v.identity.channel_id.clone(),
                                username: v.identity.username.clone(),
                                lang,
                                contact: v.contact,
                            },
                        )
                        .await;
                    telegram_username = v.identity.username.clone();
                }
            }
            self.state.registry_for(v.provider).consume(&v.pin);
        }

        (discord_id, telegram_username)
    }

    /// Forward chat handles to the companion service, opportunistically.
    async fn link_companion_prefs(
        &self,
        req: &ProvisioningRequest,
        profile: Option<&Profile>,
        discord_id: &str,
        telegram_username: &str,
        diagnostics: &mut ProvisionDiagnostics,
    ) {
        if !self.state.settings.companion_enabled {
            return;
        }
        let Some(companion) = &self.state.deps.companion else {
            return;
        };
        let has_template = profile.map(|p| p.has_companion_template()).unwrap_or(false);
        if !has_template || (discord_id.is_empty() && telegram_username.is_empty()) {
            return;
        }
        match companion.user_for_account(&req.username, &req.email).await {
            Ok(Some(user)) => {
                if let Err(e) = companion
                    .set_notification_prefs(&user, discord_id, telegram_username)
                    .await
                {
                    warn!("Failed to link chat handles to companion service: {}", e);
                    diagnostics.record("companion-prefs", e.to_string());
                }
            }
            Ok(None) => {
                warn!("Companion user not found for {}", req.username);
                diagnostics.record("companion-prefs", "companion user not found");
            }
            Err(e) => {
                warn!("Failed to look up companion user: {}", e);
                diagnostics.record("companion-prefs", e.to_string());
            }
        }
    }

    /// Creation notices are fire-and-forget relative to the request.
    fn send_creation_notices(
        &self,
        req: &ProvisioningRequest,
        invite: Option<&crate::domains::invites::Invite>,
    ) {
        let settings = &self.state.settings;
        if !settings.email_enabled || !settings.notifications_enabled {
            return;
        }
        let Some(invite) = invite else { return };
        let message = messages::creation_notice(&req.code, &req.username, &req.email);
        for address in invite.creation_subscribers() {
            let dispatcher = self.state.dispatcher.clone();
            let message = message.clone();
            tokio::spawn(async move {
                match dispatcher.send_to_address(&address, &message).await {
                    Ok(()) => info!("Sent account creation notification to {}", address),
                    Err(e) => warn!("Failed to send account creation notification: {}", e),
                }
            });
        }
    }
}
