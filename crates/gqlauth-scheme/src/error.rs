//! Error types for the scheme layer.

use gqlauth_transport::TransportError;

/// Errors surfaced by scheme operations.
///
/// `Clone` because a single refresh outcome is delivered to every caller
/// awaiting it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemeError {
    /// The refresh token has expired. The session was reset and the user
    /// must authenticate again. Never swallowed.
    #[error("auth session expired, sign in again")]
    ExpiredSession,

    /// The user query succeeded but the configured field was empty.
    #[error("user data response does not contain field {property}")]
    MissingUserData { property: String },

    /// The transport failed (network, GraphQL errors, bad status).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The refresh task ended without producing an outcome (it panicked or
    /// the runtime shut down underneath it).
    #[error("refresh aborted: {0}")]
    RefreshAborted(String),
}

/// Errors building an [`AuthConfig`](crate::AuthConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The overrides document is not valid JSON.
    #[error("config is not valid JSON: {0}")]
    Parse(String),

    /// The merged document doesn't describe a valid config.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// The scheme name namespaces storage keys and can't be blank.
    #[error("scheme name must not be empty")]
    EmptyName,

    /// A required property path is empty, so it could never resolve.
    #[error("property path {0} must not be empty")]
    EmptyPath(&'static str),

    /// `token.global` asks for a shared credential slot but none was given.
    #[error("token.global is set but no shared credential slot was provided")]
    MissingSharedSlot,
}
