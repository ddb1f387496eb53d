//! Scheme configuration.
//!
//! Every option has a default, and users only spell out what differs:
//!
//! ```json
//! { "token": { "maxAge": 600 }, "user": { "autoFetch": false } }
//! ```
//!
//! [`AuthConfig::from_overrides`] merges such a document onto the defaults
//! with [`deep_merge`], so `token.required`, `token.type` and every other
//! unmentioned field keep their default values.

use gqlauth_protocol::{PropertyPath, deep_merge};
use gqlauth_token::ExpiryPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ConfigError;

/// Where the access credential lives once the user logs in.
///
/// Serialized as the boolean `token.global`, which is how users write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum CredentialScope {
    /// Attached to this session's own client only.
    #[default]
    PerInstance,
    /// Written to a process-wide slot every client reads from.
    Shared,
}

impl From<bool> for CredentialScope {
    fn from(global: bool) -> Self {
        if global { Self::Shared } else { Self::PerInstance }
    }
}

impl From<CredentialScope> for bool {
    fn from(scope: CredentialScope) -> Self {
        scope == CredentialScope::Shared
    }
}

/// Access token options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenOptions {
    /// Where the token is found in a login response.
    pub login_property: PropertyPath,
    /// Where the token is found in a refresh response.
    pub refresh_property: PropertyPath,
    #[serde(rename = "global")]
    pub scope: CredentialScope,
    /// If `false`, the token is assumed present without reading responses.
    pub required: bool,
    /// Authorization scheme prefix. `None` sends the bare token.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Lifetime in seconds. `None` leaves expiry untracked.
    pub max_age: Option<u64>,
}

impl Default for TokenOptions {
    fn default() -> Self {
        Self {
            login_property: "data.login.token".into(),
            refresh_property: "data.refresh.token".into(),
            scope: CredentialScope::PerInstance,
            required: true,
            kind: Some("Bearer".to_string()),
            max_age: Some(1800),
        }
    }
}

impl TokenOptions {
    /// The path to read, depending on which response is being processed.
    pub fn property(&self, refreshing: bool) -> &PropertyPath {
        if refreshing {
            &self.refresh_property
        } else {
            &self.login_property
        }
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::from_max_age_secs(self.max_age)
    }
}

/// Refresh token options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshTokenOptions {
    pub login_property: PropertyPath,
    pub refresh_property: PropertyPath,
    /// Input field carrying the refresh token in the refresh mutation.
    pub data: Option<String>,
    pub required: bool,
    pub max_age: Option<u64>,
    /// If `false`, a refresh keeps the stored refresh token even when the
    /// response carries a new one.
    pub update_on_refresh: bool,
}

impl Default for RefreshTokenOptions {
    fn default() -> Self {
        Self {
            login_property: "data.login.refreshToken".into(),
            refresh_property: "data.refresh.refreshToken".into(),
            data: Some("refreshToken".to_string()),
            required: true,
            max_age: Some(60 * 60 * 24 * 30),
            update_on_refresh: true,
        }
    }
}

impl RefreshTokenOptions {
    pub fn property(&self, refreshing: bool) -> &PropertyPath {
        if refreshing {
            &self.refresh_property
        } else {
            &self.login_property
        }
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::from_max_age_secs(self.max_age)
    }
}

/// User fetch options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserOptions {
    /// Where the user object is found in the user query response.
    pub property: PropertyPath,
    /// Fetch the user right after a login.
    pub auto_fetch: bool,
}

impl Default for UserOptions {
    fn default() -> Self {
        Self {
            property: "data.user".into(),
            auto_fetch: true,
        }
    }
}

/// Complete scheme configuration.
///
/// # Example
///
/// ```rust
/// use gqlauth_scheme::AuthConfig;
/// use serde_json::json;
///
/// let config = AuthConfig::from_overrides(&json!({
///     "token": { "maxAge": 600 },
///     "autoLogout": true,
/// }))
/// .unwrap();
///
/// assert_eq!(config.token.max_age, Some(600));
/// assert!(config.token.required); // untouched default
/// assert!(config.auto_logout);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    /// Scheme name. Namespaces every storage key.
    pub name: String,
    pub token: TokenOptions,
    pub refresh_token: RefreshTokenOptions,
    pub user: UserOptions,
    /// Reset instead of refreshing when the access token has expired.
    pub auto_logout: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            name: "graphql".to_string(),
            token: TokenOptions::default(),
            refresh_token: RefreshTokenOptions::default(),
            user: UserOptions::default(),
            auto_logout: false,
        }
    }
}

impl AuthConfig {
    /// Deep-merges `overrides` onto the defaults.
    ///
    /// `null` means "no overrides". Any other non-object is rejected.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] when the merged document has wrongly typed
    /// fields, plus anything [`validate`](Self::validate) rejects.
    pub fn from_overrides(overrides: &Value) -> Result<Self, ConfigError> {
        if overrides.is_null() {
            return Ok(Self::default());
        }
        if !overrides.is_object() {
            return Err(ConfigError::Invalid(
                "overrides must be a JSON object".to_string(),
            ));
        }

        let mut merged = serde_json::to_value(Self::default())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        deep_merge(&mut merged, overrides);

        let config: Self = serde_json::from_value(merged)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document and merges it onto the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let overrides: Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_overrides(&overrides)
    }

    /// Checks invariants serde can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.token.required {
            if self.token.login_property.is_empty() {
                return Err(ConfigError::EmptyPath("token.loginProperty"));
            }
            if self.token.refresh_property.is_empty() {
                return Err(ConfigError::EmptyPath("token.refreshProperty"));
            }
        }
        if self.refresh_token.required {
            if self.refresh_token.login_property.is_empty() {
                return Err(ConfigError::EmptyPath("refreshToken.loginProperty"));
            }
            if self.refresh_token.refresh_property.is_empty() {
                return Err(ConfigError::EmptyPath("refreshToken.refreshProperty"));
            }
        }
        if self.user.property.is_empty() {
            return Err(ConfigError::EmptyPath("user.property"));
        }
        Ok(())
    }

    // -- Builder-style setters --

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_scope(mut self, scope: CredentialScope) -> Self {
        self.token.scope = scope;
        self
    }

    pub fn with_token_max_age(mut self, secs: Option<u64>) -> Self {
        self.token.max_age = secs;
        self
    }

    pub fn with_refresh_max_age(mut self, secs: Option<u64>) -> Self {
        self.refresh_token.max_age = secs;
        self
    }

    pub fn with_update_on_refresh(mut self, update: bool) -> Self {
        self.refresh_token.update_on_refresh = update;
        self
    }

    pub fn with_auto_fetch_user(mut self, auto_fetch: bool) -> Self {
        self.user.auto_fetch = auto_fetch;
        self
    }

    pub fn with_auto_logout(mut self, auto_logout: bool) -> Self {
        self.auto_logout = auto_logout;
        self
    }
}
