//! `SessionController` builder and lifecycle entry points.
//!
//! This is what an application holds. It ties the layers together:
//! config → token stores → scheme → host callbacks, and keeps the
//! credential slot the transport reads its `Authorization` header from.

use std::sync::{Arc, PoisonError, RwLock};

use gqlauth_protocol::Response;
use gqlauth_scheme::{
    AuthConfig, AuthHost, ConfigError, CredentialScope, LoginOptions, LoginOutcome,
    RefreshCoordinator, SchemeCheck, SchemeError, SchemeMethod,
};
use gqlauth_token::{MemoryStorage, Storage};
use gqlauth_transport::GraphqlTransport;
use serde::Serialize;
use serde_json::Value;

use crate::GqlAuthError;

// ---------------------------------------------------------------------------
// CredentialSlot
// ---------------------------------------------------------------------------

/// Where the current `Authorization` header value is published.
///
/// The transport reads it before every request. Clones share the same
/// slot, which is how a [`CredentialScope::Shared`] credential reaches
/// every client in the process.
#[derive(Debug, Clone, Default)]
pub struct CredentialSlot {
    value: Arc<RwLock<Option<String>>>,
}

impl CredentialSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, value: Option<String>) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    pub fn clear(&self) {
        self.set(None);
    }

    pub fn is_set(&self) -> bool {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

// ---------------------------------------------------------------------------
// SlotHost
// ---------------------------------------------------------------------------

/// Wraps the application's host so login and logout also update the slot.
pub struct SlotHost<H> {
    inner: H,
    slot: CredentialSlot,
}

impl<H> SlotHost<H> {
    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn slot(&self) -> &CredentialSlot {
        &self.slot
    }
}

impl<H: AuthHost> AuthHost for SlotHost<H> {
    fn set_user(&self, user: Option<&Value>) {
        self.inner.set_user(user);
    }

    fn call_on_error(&self, error: &SchemeError, method: SchemeMethod) {
        self.inner.call_on_error(error, method);
    }

    async fn on_login(&self, authorization: &str) {
        self.slot.set(Some(authorization.to_string()));
        self.inner.on_login(authorization).await;
    }

    fn on_logout(&self) {
        self.slot.clear();
        self.inner.on_logout();
    }

    // A reset session has no credential left to send.
    fn on_reset(&self) {
        self.slot.clear();
        self.inner.on_reset();
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`SessionController`].
///
/// # Example
///
/// ```rust,ignore
/// use gqlauth::prelude::*;
///
/// let session = SessionController::builder(transport, host)
///     .config(AuthConfig::from_json(r#"{ "token": { "maxAge": 600 } }"#)?)
///     .storage(Arc::new(MemoryStorage::new()))
///     .build()?;
///
/// session.mounted().await;
/// ```
pub struct SessionControllerBuilder<T, H> {
    transport: T,
    host: H,
    config: AuthConfig,
    storage: Option<Arc<dyn Storage>>,
    shared_slot: Option<CredentialSlot>,
}

impl<T: GraphqlTransport, H: AuthHost> SessionControllerBuilder<T, H> {
    pub fn new(transport: T, host: H) -> Self {
        Self {
            transport,
            host,
            config: AuthConfig::default(),
            storage: None,
            shared_slot: None,
        }
    }

    pub fn config(mut self, config: AuthConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets where tokens are persisted. Defaults to in-memory storage.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// The process-wide slot used when `token.global` is set.
    pub fn shared_slot(mut self, slot: CredentialSlot) -> Self {
        self.shared_slot = Some(slot);
        self
    }

    /// Validates the config and assembles the controller.
    ///
    /// # Errors
    /// - Anything [`AuthConfig::validate`] rejects.
    /// - [`ConfigError::MissingSharedSlot`] if the scope is shared but no
    ///   slot was given.
    pub fn build(self) -> Result<SessionController<T, H>, GqlAuthError> {
        self.config.validate()?;

        let slot = match (self.config.token.scope, self.shared_slot) {
            (CredentialScope::Shared, Some(slot)) => slot,
            (CredentialScope::Shared, None) => return Err(ConfigError::MissingSharedSlot.into()),
            (CredentialScope::PerInstance, shared) => {
                if shared.is_some() {
                    tracing::warn!(
                        scheme = %self.config.name,
                        "shared slot ignored, token.global is not set"
                    );
                }
                CredentialSlot::new()
            }
        };

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()) as Arc<dyn Storage>);
        let host = SlotHost {
            inner: self.host,
            slot: slot.clone(),
        };

        tracing::debug!(
            scheme = %self.config.name,
            scope = ?self.config.token.scope,
            "session controller built"
        );
        Ok(SessionController {
            scheme: RefreshCoordinator::new(self.config, self.transport, host, storage),
            slot,
        })
    }
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// The application-facing handle to one auth session.
///
/// Cheap to clone; clones drive the same session.
pub struct SessionController<T, H> {
    scheme: RefreshCoordinator<T, SlotHost<H>>,
    slot: CredentialSlot,
}

impl<T, H> Clone for SessionController<T, H> {
    fn clone(&self) -> Self {
        Self {
            scheme: self.scheme.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<T: GraphqlTransport, H: AuthHost> SessionController<T, H> {
    pub fn builder(transport: T, host: H) -> SessionControllerBuilder<T, H> {
        SessionControllerBuilder::new(transport, host)
    }

    /// The underlying scheme, for operations not surfaced here.
    pub fn scheme(&self) -> &RefreshCoordinator<T, SlotHost<H>> {
        &self.scheme
    }

    pub fn config(&self) -> &AuthConfig {
        self.scheme.config()
    }

    pub fn host(&self) -> &H {
        self.scheme.host().inner()
    }

    /// The slot the transport should read its authorization header from.
    pub fn credential_slot(&self) -> &CredentialSlot {
        &self.slot
    }

    /// Restores the session at startup.
    ///
    /// Never fails: a broken stored session just leaves the user logged
    /// out. Errors were already reported to the host by the operation that
    /// hit them. Returns the session status afterwards.
    pub async fn mounted(&self) -> SchemeCheck {
        if let Err(err) = self.scheme.mounted().await {
            tracing::warn!(scheme = %self.config().name, error = %err, "session restore failed");
        }
        if let Some(header) = self.scheme.authorization().await {
            self.slot.set(Some(header));
        }
        self.scheme.check(true).await
    }

    /// Logs in with any serializable credentials.
    ///
    /// # Errors
    /// - [`GqlAuthError::Credentials`] if `credentials` can't be serialized.
    /// - [`GqlAuthError::Scheme`] if the automatic user fetch fails.
    pub async fn login<C: Serialize>(&self, credentials: &C) -> Result<LoginOutcome, GqlAuthError> {
        self.login_with(credentials, LoginOptions::default()).await
    }

    pub async fn login_with<C: Serialize>(
        &self,
        credentials: &C,
        options: LoginOptions,
    ) -> Result<LoginOutcome, GqlAuthError> {
        let credentials = serde_json::to_value(credentials)
            .map_err(|e| GqlAuthError::Credentials(e.to_string()))?;
        Ok(self.scheme.login(credentials, options).await?)
    }

    pub async fn logout(&self) {
        self.scheme.logout().await;
    }

    pub async fn fetch_user(&self) -> Result<Option<Response>, GqlAuthError> {
        Ok(self.scheme.fetch_user().await?)
    }

    /// Refreshes tokens and republishes the new authorization header.
    pub async fn refresh_tokens(&self) -> Result<Option<Response>, GqlAuthError> {
        let response = self.scheme.refresh_tokens().await?;
        self.publish().await;
        Ok(response)
    }

    /// Renews an expired access token if needed and returns the header to
    /// attach to the next request.
    pub async fn ensure_fresh(&self) -> Result<Option<String>, GqlAuthError> {
        let header = self.scheme.ensure_fresh().await?;
        self.slot.set(header.clone());
        Ok(header)
    }

    pub async fn check(&self, check_status: bool) -> SchemeCheck {
        self.scheme.check(check_status).await
    }

    pub async fn authorization(&self) -> Option<String> {
        self.scheme.authorization().await
    }

    pub async fn user(&self) -> Option<Value> {
        self.scheme.user().await
    }

    async fn publish(&self) {
        self.slot.set(self.scheme.authorization().await);
    }
}
