//! Token stores: a credential, its expiry, and its persisted copy.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::Value;

use crate::{Credential, Storage, TokenError, TokenStatus};

// ---------------------------------------------------------------------------
// Token kinds
// ---------------------------------------------------------------------------

/// Distinguishes the access store from the refresh store at the type level.
///
/// Both stores behave identically; what differs is where they persist and
/// how they're labelled in logs. A marker type keeps the two from being
/// swapped by accident: a `RefreshTokenStore` can't be passed where an
/// `AccessTokenStore` is expected.
pub trait TokenKind: Send + Sync + 'static {
    /// Storage key prefix; the scheme name is appended (`_token.graphql`).
    const KEY_PREFIX: &'static str;
    /// Human-readable label for logs.
    const LABEL: &'static str;
}

/// Marker for the short-lived access token.
#[derive(Debug)]
pub struct Access;

impl TokenKind for Access {
    const KEY_PREFIX: &'static str = "_token";
    const LABEL: &'static str = "access";
}

/// Marker for the long-lived refresh token.
#[derive(Debug)]
pub struct Refresh;

impl TokenKind for Refresh {
    const KEY_PREFIX: &'static str = "_refresh_token";
    const LABEL: &'static str = "refresh";
}

pub type AccessTokenStore = TokenStore<Access>;
pub type RefreshTokenStore = TokenStore<Refresh>;

// ---------------------------------------------------------------------------
// ExpiryPolicy
// ---------------------------------------------------------------------------

/// How a store derives the expiry of a freshly set value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// No expiry is tracked; status is "unknown" while a value is present.
    #[default]
    Untracked,
    /// The value expires this long after it was set.
    MaxAge(Duration),
}

impl ExpiryPolicy {
    /// Builds a policy from an optional max age in seconds.
    pub fn from_max_age_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(secs) => Self::MaxAge(Duration::from_secs(secs)),
            None => Self::Untracked,
        }
    }

    /// The expiry of a value set at `now`.
    pub fn expires_from(self, now: SystemTime) -> Option<SystemTime> {
        match self {
            Self::Untracked => None,
            Self::MaxAge(age) => now.checked_add(age),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenStore
// ---------------------------------------------------------------------------

/// Holds one credential and its expiry, mirrored into [`Storage`].
///
/// ## Lifecycle
///
/// ```text
///   set(Some) ──→ [present, expiry derived] ──(time passes)──→ [expired]
///       ↑                    │                                     │
///       │                  reset() / set(None)                     │
///       │                    ▼                                     │
///       └──────────────── [absent] ←──────────── reset() ──────────┘
/// ```
///
/// Every mutation writes through to storage immediately. [`sync`] goes the
/// other way, picking up values written by someone else sharing the same
/// storage (another tab, a previous process).
///
/// [`sync`]: TokenStore::sync
pub struct TokenStore<K: TokenKind> {
    storage: Arc<dyn Storage>,
    value_key: String,
    expiration_key: String,
    policy: ExpiryPolicy,
    value: Option<Credential>,
    expires_at: Option<SystemTime>,
    _kind: PhantomData<K>,
}

impl<K: TokenKind> TokenStore<K> {
    /// Creates an empty store for the scheme named `scheme_name`.
    ///
    /// Nothing is read from storage until [`sync`](Self::sync).
    pub fn new(scheme_name: &str, policy: ExpiryPolicy, storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            value_key: format!("{}.{scheme_name}", K::KEY_PREFIX),
            expiration_key: format!("{}_expiration.{scheme_name}", K::KEY_PREFIX),
            policy,
            value: None,
            expires_at: None,
            _kind: PhantomData,
        }
    }

    /// Stores `value` and derives its expiry from the policy.
    ///
    /// `None` is "not present": both value and expiry are cleared. That is
    /// never an error; a login response without a refresh token is
    /// ordinary.
    pub fn set(&mut self, value: Option<Credential>) {
        self.set_at(value, SystemTime::now());
    }

    /// [`set`](Self::set) with an explicit clock reading.
    pub fn set_at(&mut self, value: Option<Credential>, now: SystemTime) {
        match value {
            Some(value) => {
                self.storage.set(&self.value_key, Some(value.to_value()));
                self.value = Some(value);
                self.write_expiration(self.policy.expires_from(now));
                tracing::trace!(kind = K::LABEL, "token stored");
            }
            None => self.clear(),
        }
    }

    /// The current value, if any.
    pub fn get(&self) -> Option<&Credential> {
        self.value.as_ref()
    }

    /// The instant the current value expires, if tracked.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    /// Overrides the derived expiry.
    ///
    /// For hosts that know better than the policy (e.g. they decoded an
    /// `exp` claim). Ignored while no value is present.
    pub fn set_expiration(&mut self, expires_at: Option<SystemTime>) {
        if self.value.is_some() {
            self.write_expiration(expires_at);
        }
    }

    /// Usability as of now.
    pub fn status(&self) -> TokenStatus {
        self.status_at(SystemTime::now())
    }

    /// Usability as of `now`.
    pub fn status_at(&self, now: SystemTime) -> TokenStatus {
        TokenStatus::new(self.value.is_some(), self.expires_at, now)
    }

    /// Clears value and expiry. Safe to call any number of times.
    pub fn reset(&mut self) {
        self.clear();
    }

    /// Reloads value and expiry from storage, tolerating corrupt entries.
    ///
    /// A corrupt entry is logged and cleared, leaving the store absent.
    pub fn sync(&mut self) -> Option<&Credential> {
        let synced = self.try_sync().map(|_| ());
        if let Err(err) = synced {
            tracing::warn!(kind = K::LABEL, error = %err, "discarding stored token");
            self.clear();
        }
        self.value.as_ref()
    }

    /// Reloads value and expiry from storage.
    ///
    /// # Errors
    /// Returns [`TokenError::Corrupt`] if storage holds something no token
    /// store writes. The in-memory state is left untouched in that case.
    pub fn try_sync(&mut self) -> Result<Option<&Credential>, TokenError> {
        let value = decode_credential(&self.value_key, self.storage.get(&self.value_key))?;
        let expires_at =
            decode_expiration(&self.expiration_key, self.storage.get(&self.expiration_key))?;

        self.expires_at = value.as_ref().and(expires_at);
        self.value = value;
        Ok(self.value.as_ref())
    }

    fn write_expiration(&mut self, expires_at: Option<SystemTime>) {
        self.expires_at = expires_at;
        self.storage
            .set(&self.expiration_key, expires_at.map(|at| Value::from(to_millis(at))));
    }

    fn clear(&mut self) {
        self.value = None;
        self.expires_at = None;
        self.storage.set(&self.value_key, None);
        self.storage.set(&self.expiration_key, None);
    }
}

impl<K: TokenKind> std::fmt::Debug for TokenStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("kind", &K::LABEL)
            .field("value", &self.value)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Persistence format
// ---------------------------------------------------------------------------

// Values are stored as the credential's JSON form; expiries as epoch millis.

fn decode_credential(key: &str, stored: Option<Value>) -> Result<Option<Credential>, TokenError> {
    match stored {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(Credential::Token(s))),
        Some(Value::Bool(true)) => Ok(Some(Credential::Implicit)),
        Some(other) => Err(TokenError::Corrupt {
            key: key.to_string(),
            reason: format!("unexpected token value {other}"),
        }),
    }
}

fn decode_expiration(key: &str, stored: Option<Value>) -> Result<Option<SystemTime>, TokenError> {
    match stored {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(|ms| Some(from_millis(ms))).ok_or_else(|| {
            TokenError::Corrupt {
                key: key.to_string(),
                reason: format!("expiration {n} is not epoch milliseconds"),
            }
        }),
        Some(other) => Err(TokenError::Corrupt {
            key: key.to_string(),
            reason: format!("expiration {other} is not a number"),
        }),
    }
}

fn to_millis(at: SystemTime) -> u64 {
    let since_epoch = at.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX)
}

fn from_millis(ms: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::MemoryStorage;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn access(policy: ExpiryPolicy) -> (AccessTokenStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = AccessTokenStore::new("graphql", policy, storage.clone());
        (store, storage)
    }

    // =====================================================================
    // set()
    // =====================================================================

    #[test]
    fn test_set_value_persists_value_and_expiry() {
        let (mut store, storage) = access(ExpiryPolicy::MaxAge(Duration::from_secs(60)));

        store.set_at(Some("T1".into()), at(1_000));

        assert_eq!(store.get(), Some(&Credential::from("T1")));
        assert_eq!(store.expires_at(), Some(at(1_060)));
        assert_eq!(storage.get("_token.graphql"), Some(json!("T1")));
        assert_eq!(storage.get("_token_expiration.graphql"), Some(json!(1_060_000)));
    }

    #[test]
    fn test_set_none_clears_value_and_expiry() {
        let (mut store, storage) = access(ExpiryPolicy::MaxAge(Duration::from_secs(60)));
        store.set(Some("T1".into()));

        store.set(None);

        assert_eq!(store.get(), None);
        assert_eq!(store.expires_at(), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_set_untracked_policy_has_no_expiry() {
        let (mut store, storage) = access(ExpiryPolicy::Untracked);
        store.set(Some("T1".into()));

        assert_eq!(store.expires_at(), None);
        assert!(store.status().unknown());
        assert_eq!(storage.get("_token_expiration.graphql"), None);
    }

    #[test]
    fn test_refresh_store_uses_its_own_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = RefreshTokenStore::new("graphql", ExpiryPolicy::Untracked, storage.clone());

        store.set(Some("R1".into()));

        assert_eq!(storage.keys(), vec!["_refresh_token.graphql".to_string()]);
    }

    // =====================================================================
    // status()
    // =====================================================================

    #[test]
    fn test_status_empty_store_is_expired() {
        let (store, _) = access(ExpiryPolicy::MaxAge(Duration::from_secs(60)));
        assert!(store.status().expired());
    }

    #[test]
    fn test_status_zero_max_age_expires_immediately() {
        let (mut store, _) = access(ExpiryPolicy::MaxAge(Duration::ZERO));
        store.set(Some("T1".into()));
        assert!(store.status().expired());
    }

    #[test]
    fn test_status_at_tracks_expiry_boundary() {
        let (mut store, _) = access(ExpiryPolicy::MaxAge(Duration::from_secs(10)));
        store.set_at(Some("T1".into()), at(100));

        assert!(store.status_at(at(109)).valid());
        assert!(store.status_at(at(110)).expired());
    }

    // =====================================================================
    // set_expiration()
    // =====================================================================

    #[test]
    fn test_set_expiration_overrides_policy() {
        let (mut store, storage) = access(ExpiryPolicy::Untracked);
        store.set(Some("T1".into()));

        store.set_expiration(Some(at(5)));

        assert_eq!(store.expires_at(), Some(at(5)));
        assert_eq!(storage.get("_token_expiration.graphql"), Some(json!(5_000)));
    }

    #[test]
    fn test_set_expiration_without_value_is_ignored() {
        let (mut store, storage) = access(ExpiryPolicy::Untracked);
        store.set_expiration(Some(at(5)));
        assert_eq!(store.expires_at(), None);
        assert!(storage.is_empty());
    }

    // =====================================================================
    // reset()
    // =====================================================================

    #[test]
    fn test_reset_is_idempotent() {
        let (mut store, storage) = access(ExpiryPolicy::MaxAge(Duration::from_secs(60)));
        store.set(Some("T1".into()));

        store.reset();
        store.reset();

        assert_eq!(store.get(), None);
        assert!(store.status().expired());
        assert!(storage.is_empty());
    }

    // =====================================================================
    // sync()
    // =====================================================================

    #[test]
    fn test_sync_loads_values_written_by_another_store() {
        let storage: Arc<MemoryStorage> = Arc::new(MemoryStorage::new());
        let mut writer = AccessTokenStore::new(
            "graphql",
            ExpiryPolicy::MaxAge(Duration::from_secs(60)),
            storage.clone(),
        );
        let mut reader =
            AccessTokenStore::new("graphql", ExpiryPolicy::Untracked, storage.clone());
        writer.set_at(Some("T1".into()), at(1));

        assert_eq!(reader.sync(), Some(&Credential::from("T1")));
        assert_eq!(reader.expires_at(), Some(at(61)));
    }

    #[test]
    fn test_sync_implicit_credential_round_trips() {
        let (mut store, storage) = access(ExpiryPolicy::Untracked);
        store.set(Some(Credential::Implicit));

        let mut other = AccessTokenStore::new("graphql", ExpiryPolicy::Untracked, storage);
        assert_eq!(other.sync(), Some(&Credential::Implicit));
    }

    #[test]
    fn test_sync_ignores_expiry_without_value() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("_token_expiration.graphql", Some(json!(1_000)));
        let mut store = AccessTokenStore::new("graphql", ExpiryPolicy::Untracked, storage);

        assert_eq!(store.sync(), None);
        assert_eq!(store.expires_at(), None);
    }

    #[test]
    fn test_try_sync_corrupt_value_returns_error() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("_token.graphql", Some(json!({ "oops": 1 })));
        let mut store = AccessTokenStore::new("graphql", ExpiryPolicy::Untracked, storage);

        let result = store.try_sync();

        assert!(matches!(
            result,
            Err(TokenError::Corrupt { ref key, .. }) if key == "_token.graphql"
        ));
    }

    #[test]
    fn test_sync_corrupt_expiration_clears_store() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("_token.graphql", Some(json!("T1")));
        storage.set("_token_expiration.graphql", Some(json!("tomorrow")));
        let mut store = AccessTokenStore::new("graphql", ExpiryPolicy::Untracked, storage.clone());

        assert_eq!(store.sync(), None);
        assert!(storage.is_empty());
    }
}
