//! Email-confirmation tokens.
//!
//! A signed, time-boxed claim set standing in for "email confirmed": the
//! suspended provisioning request travels inside the token (including the
//! password, which is never stored at rest) so the resumed invocation can
//! pick up at account creation.

use anyhow::{bail, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// How long a confirmation link stays usable.
pub const CONFIRMATION_TTL_HOURS: i64 = 12;

const TOKEN_TYPE: &str = "confirmation";

/// The suspended request carried inside a confirmation token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmationPayload {
    pub invite_code: String,
    pub email: String,
    pub username: String,
    pub password: String,
    /// Telegram is the only provider whose PIN survives suspension; the
    /// others are re-verified out of band if still wanted.
    pub telegram_pin: String,
}

/// Claims as signed into the token.
#[derive(Debug, Serialize, Deserialize)]
struct ConfirmationClaims {
    valid: bool,
    invite_code: String,
    email: String,
    username: String,
    password: String,
    telegram_pin: String,
    exp: i64,
    #[serde(rename = "type")]
    typ: String,
}

/// Stateless issuer/verifier for confirmation tokens (HS256).
#[derive(Clone)]
pub struct ConfirmationTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl ConfirmationTokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign the payload with an expiry `ttl` from now.
    pub fn issue(&self, payload: &ConfirmationPayload, ttl: Duration) -> Result<String> {
        let claims = ConfirmationClaims {
            valid: true,
            invite_code: payload.invite_code.clone(),
            email: payload.email.clone(),
            username: payload.username.clone(),
            password: payload.password.clone(),
            telegram_pin: payload.telegram_pin.clone(),
            exp: (Utc::now() + ttl).timestamp(),
            typ: TOKEN_TYPE.to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify a token, failing closed on signature mismatch, wrong type, or
    /// expiry in the past.
    pub fn verify(&self, token: &str) -> Result<ConfirmationPayload> {
        let data = decode::<ConfirmationClaims>(token, &self.decoding_key, &Validation::default())?;
        let claims = data.claims;
        if claims.typ != TOKEN_TYPE || !claims.valid {
            bail!("not a confirmation token");
        }
        Ok(ConfirmationPayload {
            invite_code: claims.invite_code,
            email: claims.email,
            username: claims.username,
            password: claims.password,
            telegram_pin: claims.telegram_pin,
        })
    }
}
