//! Unified error type for gqlauth.

use gqlauth_scheme::{ConfigError, SchemeError};

/// Top-level error returned by [`SessionController`](crate::SessionController).
///
/// Transport failures reach callers inside [`SchemeError::Transport`]; the
/// scheme is the only layer that talks to the transport.
#[derive(Debug, thiserror::Error)]
pub enum GqlAuthError {
    /// A session operation failed (expired session, missing user data).
    #[error(transparent)]
    Scheme(#[from] SchemeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Login credentials could not be turned into mutation input.
    #[error("credentials are not serializable: {0}")]
    Credentials(String),
}

impl GqlAuthError {
    /// `true` when the user has to authenticate again.
    pub fn is_expired_session(&self) -> bool {
        matches!(self, Self::Scheme(SchemeError::ExpiredSession))
    }
}
