//! Error types for the token layer.

/// Errors that can occur while reading tokens back from storage.
///
/// Writing never fails and an absent token is not an error, so the only
/// thing left to go wrong is storage holding something we didn't write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// A stored value has a shape no token store produces.
    #[error("corrupt value under storage key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}
