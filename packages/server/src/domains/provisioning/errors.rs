use thiserror::Error;

use crate::domains::verification::Provider;

/// User-facing provisioning failures.
///
/// Everything here occurs before account creation except
/// `AccountCreationFailed`, which is terminal: nothing has been consumed when
/// it fires. Post-creation problems are never errors; they accumulate into
/// the diagnostics on a `Created` outcome.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invite code is invalid or expired")]
    InvalidCode,

    #[error("username \"{0}\" already exists")]
    UsernameTaken(String),

    #[error("{0} verification required")]
    VerificationRequired(Provider),

    #[error("invalid {0} PIN")]
    InvalidPin(Provider),

    #[error("confirmation token is invalid or expired")]
    InvalidToken,

    #[error("account creation failed: {0}")]
    AccountCreationFailed(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
