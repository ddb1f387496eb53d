//! The host session layer: how the scheme talks back to the application.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::SchemeError;

/// Which scheme operation an error came from.
///
/// Passed to [`AuthHost::call_on_error`] so the host can tell a failed
/// background refresh from a failed user fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeMethod {
    FetchUser,
    RefreshToken,
}

impl SchemeMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FetchUser => "fetchUser",
            Self::RefreshToken => "refreshToken",
        }
    }
}

impl fmt::Display for SchemeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callbacks the application provides to the scheme.
///
/// The scheme owns token state; the host owns everything user-facing:
/// where the user identity is displayed, how the credential is attached
/// to outgoing requests, and where errors are reported.
///
/// # Example
///
/// ```rust
/// use gqlauth_scheme::{AuthHost, SchemeError, SchemeMethod};
/// use serde_json::Value;
///
/// struct LoggingHost;
///
/// impl AuthHost for LoggingHost {
///     fn set_user(&self, user: Option<&Value>) {
///         println!("user is now {user:?}");
///     }
///
///     fn call_on_error(&self, error: &SchemeError, method: SchemeMethod) {
///         eprintln!("{method} failed: {error}");
///     }
///
///     async fn on_login(&self, _authorization: &str) {}
///
///     fn on_logout(&self) {}
/// }
/// ```
pub trait AuthHost: Send + Sync + 'static {
    /// Replaces the user identity. `None` clears it.
    fn set_user(&self, user: Option<&Value>);

    /// Reports a failure. The error still propagates to the caller.
    fn call_on_error(&self, error: &SchemeError, method: SchemeMethod);

    /// Called after a login produced a token, with the full header value
    /// (`"Bearer T1"`). Attach it to future requests.
    fn on_login(&self, authorization: &str) -> impl Future<Output = ()> + Send;

    /// Called on logout, before local state is cleared. Drop the attached
    /// credential.
    fn on_logout(&self);

    /// Called after a full session reset, once tokens and user are gone.
    fn on_reset(&self) {}
}

impl<H: AuthHost> AuthHost for Arc<H> {
    fn set_user(&self, user: Option<&Value>) {
        (**self).set_user(user);
    }

    fn call_on_error(&self, error: &SchemeError, method: SchemeMethod) {
        (**self).call_on_error(error, method);
    }

    fn on_login(&self, authorization: &str) -> impl Future<Output = ()> + Send {
        (**self).on_login(authorization)
    }

    fn on_logout(&self) {
        (**self).on_logout();
    }

    fn on_reset(&self) {
        (**self).on_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_method_names() {
        assert_eq!(SchemeMethod::FetchUser.to_string(), "fetchUser");
        assert_eq!(SchemeMethod::RefreshToken.to_string(), "refreshToken");
        assert_eq!(SchemeMethod::RefreshToken.as_str(), "refreshToken");
    }
}
