//! Combined status of the two token stores.

/// The conceptual session state, derived from both stores.
///
/// Never stored: it is recomputed from the stores on every check, so it
/// can't drift from what the stores actually hold.
///
/// ```text
///   Absent ──(login)──→ Valid ──(access expires)──→ TokenExpired
///      ↑                  ↑                              │
///      │                  └──────────(refresh)───────────┘
///      │
///      └──(reset)── RefreshExpired ←──(refresh token expires)── any
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Both tokens present and usable.
    Valid,
    /// The access token expired; the refresh token can renew it.
    TokenExpired,
    /// The refresh token expired; the user must authenticate again.
    RefreshExpired,
    /// At least one token is missing.
    Absent,
}

/// The result of checking both token stores.
///
/// With status checking off, only presence is considered: `valid` means
/// "both tokens exist". With status checking on, expiry is considered too
/// and at most one of the three flags is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchemeCheck {
    pub valid: bool,
    pub token_expired: bool,
    pub refresh_token_expired: bool,
}

impl SchemeCheck {
    pub(crate) fn absent() -> Self {
        Self::default()
    }

    pub(crate) fn valid() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    pub(crate) fn token_expired() -> Self {
        Self {
            token_expired: true,
            ..Self::default()
        }
    }

    pub(crate) fn refresh_token_expired() -> Self {
        Self {
            refresh_token_expired: true,
            ..Self::default()
        }
    }

    /// Classifies the check into a [`SessionState`].
    pub fn state(&self) -> SessionState {
        if self.refresh_token_expired {
            SessionState::RefreshExpired
        } else if self.token_expired {
            SessionState::TokenExpired
        } else if self.valid {
            SessionState::Valid
        } else {
            SessionState::Absent
        }
    }
}
