//! The refresh coordinator: token lifecycle state machine.
//!
//! Owns both token stores, the fetched user, and the single in-flight
//! refresh. Every operation that reads or writes tokens goes through here.
//!
//! ## Concurrency model
//!
//! The coordinator is a cheap `Clone` handle around shared state, so many
//! tasks can drive one session at once. Three locks guard that state, and
//! none of them is ever held while a transport call is awaited:
//!
//! - `tokens` — both stores. Held only for synchronous reads and writes.
//! - `user` — the last fetched user.
//! - `in_flight` — the shared refresh future, if one is running, tagged
//!   with the session generation it was started in.
//!
//! ## Refresh dedupe
//!
//! ```text
//!   caller A ──→ refresh_tokens() ──→ slot empty ──→ spawn task ──→ mutate
//!   caller B ──→ refresh_tokens() ──→ slot taken ──→ clone shared ──┐
//!   caller C ──→ refresh_tokens() ──→ slot taken ──→ clone shared ──┤
//!                                                                   ▼
//!                        task: update tokens / report error, clear slot
//!                                                                   │
//!                          A, B, C all resolve with the same outcome ◀┘
//! ```
//!
//! The refresh runs on its own Tokio task, so the slot is cleared even if
//! every caller gives up waiting.
//!
//! ## Session generations
//!
//! `TokenPair::generation` moves on whenever the session is replaced: on
//! reset and on login. A refresh response that lands after that is stale
//! and is dropped instead of written back, so a logout (or a fresh login)
//! made mid-refresh sticks.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use gqlauth_protocol::{
    FetchPolicy, MutationRequest, Operation, PropertyPath, QueryRequest,
    RequestContext, Response, get_prop, is_truthy,
};
use gqlauth_token::{AccessTokenStore, Credential, RefreshTokenStore, Storage};
use gqlauth_transport::{GraphqlTransport, TransportError};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{AuthConfig, AuthHost, SchemeCheck, SchemeError, SchemeMethod, SessionState};

type SharedRefresh = Shared<BoxFuture<'static, Result<Response, SchemeError>>>;

struct InFlight {
    generation: u64,
    refresh: SharedRefresh,
}

// ---------------------------------------------------------------------------
// Options and outcomes
// ---------------------------------------------------------------------------

/// Options for [`RefreshCoordinator::login`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginOptions {
    /// Clear any existing session before sending credentials.
    pub reset: bool,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self { reset: true }
    }
}

/// Which response is being applied in [`RefreshCoordinator::update_tokens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Read the refresh-response paths instead of the login ones.
    pub is_refreshing: bool,
    /// While refreshing, whether a new refresh token replaces the old one.
    pub update_on_refresh: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self::login()
    }
}

impl UpdateOptions {
    pub fn login() -> Self {
        Self {
            is_refreshing: false,
            update_on_refresh: true,
        }
    }

    pub fn refreshing(update_on_refresh: bool) -> Self {
        Self {
            is_refreshing: true,
            update_on_refresh,
        }
    }
}

/// What came back from a login attempt.
///
/// A rejected login is not an `Err`: the session simply ends up without
/// tokens, and the caller decides what to show.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Success(Response),
    Failed(TransportError),
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Success(response) => Some(response),
            Self::Failed(_) => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Success(response) => Some(response),
            Self::Failed(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct TokenPair {
    access: AccessTokenStore,
    refresh: RefreshTokenStore,
    generation: u64,
}

impl TokenPair {
    /// Reloads both stores from storage and classifies them.
    fn check(&mut self, check_status: bool) -> SchemeCheck {
        let token_present = self.access.sync().is_some();
        let refresh_present = self.refresh.sync().is_some();

        if !token_present || !refresh_present {
            return SchemeCheck::absent();
        }
        if !check_status {
            return SchemeCheck::valid();
        }
        if self.refresh.status().expired() {
            return SchemeCheck::refresh_token_expired();
        }
        if self.access.status().expired() {
            return SchemeCheck::token_expired();
        }
        SchemeCheck::valid()
    }

    fn reset(&mut self) {
        self.access.reset();
        self.refresh.reset();
        self.generation = self.generation.wrapping_add(1);
    }
}

struct Inner<T, H> {
    config: AuthConfig,
    transport: T,
    host: H,
    tokens: Mutex<TokenPair>,
    user: Mutex<Option<Value>>,
    in_flight: Mutex<Option<InFlight>>,
}

impl<T: GraphqlTransport, H: AuthHost> Inner<T, H> {
    async fn update_tokens(&self, response: Option<&Response>, options: UpdateOptions) {
        let mut tokens = self.tokens.lock().await;
        self.apply_tokens(&mut tokens, response, options);
    }

    fn apply_tokens(
        &self,
        tokens: &mut TokenPair,
        response: Option<&Response>,
        options: UpdateOptions,
    ) {
        let token = if self.config.token.required {
            extract(response, self.config.token.property(options.is_refreshing))
        } else {
            Some(Credential::Implicit)
        };
        let refresh = if self.config.refresh_token.required {
            extract(response, self.config.refresh_token.property(options.is_refreshing))
        } else {
            Some(Credential::Implicit)
        };

        if !options.is_refreshing {
            tokens.generation = tokens.generation.wrapping_add(1);
        }
        tokens.access.set(token);
        // An absent refresh token never clears the stored one.
        if let Some(refresh) = refresh {
            if !options.is_refreshing || options.update_on_refresh {
                tokens.refresh.set(Some(refresh));
            }
        }
    }

    /// The `input` object for the refresh mutation.
    fn refresh_input(&self, tokens: &TokenPair) -> Value {
        let mut input = Map::new();
        let options = &self.config.refresh_token;
        if options.required {
            if let (Some(field), Some(credential)) =
                (options.data.as_deref(), tokens.refresh.get())
            {
                input.insert(field.to_string(), credential.to_value());
            }
        }
        Value::Object(input)
    }

    /// Body of the spawned refresh task.
    ///
    /// The response is only applied if the session is still the one the
    /// request was sent for.
    async fn run_refresh(
        &self,
        request: MutationRequest,
        generation: u64,
    ) -> Result<Response, SchemeError> {
        let outcome = match self.transport.mutate(request).await {
            Ok(response) => {
                let mut tokens = self.tokens.lock().await;
                if tokens.generation == generation {
                    let options =
                        UpdateOptions::refreshing(self.config.refresh_token.update_on_refresh);
                    self.apply_tokens(&mut tokens, Some(&response), options);
                    tracing::info!(scheme = %self.config.name, "tokens refreshed");
                } else {
                    tracing::info!(scheme = %self.config.name, "session replaced during refresh, discarding tokens");
                }
                Ok(response)
            }
            Err(err) => {
                let err = SchemeError::from(err);
                tracing::warn!(scheme = %self.config.name, error = %err, "token refresh failed");
                self.host.call_on_error(&err, SchemeMethod::RefreshToken);
                Err(err)
            }
        };
        self.clear_in_flight(generation).await;
        outcome
    }

    /// Empties the refresh slot if it still holds the refresh for `generation`.
    async fn clear_in_flight(&self, generation: u64) {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_ref().is_some_and(|slot| slot.generation == generation) {
            *in_flight = None;
        }
    }
}

fn extract(response: Option<&Response>, path: &PropertyPath) -> Option<Credential> {
    response
        .and_then(|response| get_prop(response, path))
        .and_then(Credential::from_response_value)
}

// ---------------------------------------------------------------------------
// RefreshCoordinator
// ---------------------------------------------------------------------------

/// Drives one auth session: login, user fetch, refresh, logout.
///
/// Cloning is cheap and every clone drives the same session.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use gqlauth_scheme::{AuthConfig, AuthHost, LoginOptions, RefreshCoordinator};
/// use gqlauth_token::MemoryStorage;
/// use serde_json::json;
///
/// async fn sign_in<T, H>(transport: T, host: H)
/// where
///     T: gqlauth_transport::GraphqlTransport,
///     H: AuthHost,
/// {
///     let scheme = RefreshCoordinator::new(
///         AuthConfig::default(),
///         transport,
///         host,
///         Arc::new(MemoryStorage::new()),
///     );
///
///     let credentials = json!({ "email": "a@b.c", "password": "hunter2" });
///     let outcome = scheme.login(credentials, LoginOptions::default()).await;
///     println!("logged in: {:?}", outcome.map(|o| o.is_success()));
/// }
/// ```
pub struct RefreshCoordinator<T, H> {
    inner: Arc<Inner<T, H>>,
}

impl<T, H> Clone for RefreshCoordinator<T, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: GraphqlTransport, H: AuthHost> RefreshCoordinator<T, H> {
    /// Creates a coordinator with empty stores backed by `storage`.
    ///
    /// Nothing is read from storage until the first [`check`](Self::check).
    pub fn new(config: AuthConfig, transport: T, host: H, storage: Arc<dyn Storage>) -> Self {
        let tokens = TokenPair {
            access: AccessTokenStore::new(
                &config.name,
                config.token.expiry_policy(),
                Arc::clone(&storage),
            ),
            refresh: RefreshTokenStore::new(
                &config.name,
                config.refresh_token.expiry_policy(),
                storage,
            ),
            generation: 0,
        };
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                host,
                tokens: Mutex::new(tokens),
                user: Mutex::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    // -- Status --

    /// Reloads both stores from storage and reports whether they're usable.
    ///
    /// With `check_status` off only presence counts. With it on, an expired
    /// refresh token is reported before an expired access token.
    pub async fn check(&self, check_status: bool) -> SchemeCheck {
        self.inner.tokens.lock().await.check(check_status)
    }

    /// The current access token.
    pub async fn current_token(&self) -> Option<Credential> {
        self.inner.tokens.lock().await.access.get().cloned()
    }

    /// The current refresh token.
    pub async fn current_refresh_token(&self) -> Option<Credential> {
        self.inner.tokens.lock().await.refresh.get().cloned()
    }

    /// The `Authorization` header value for the current access token.
    pub async fn authorization(&self) -> Option<String> {
        let tokens = self.inner.tokens.lock().await;
        tokens
            .access
            .get()
            .and_then(|credential| credential.authorization(self.inner.config.token.kind.as_deref()))
    }

    /// The last user fetched.
    pub async fn user(&self) -> Option<Value> {
        self.inner.user.lock().await.clone()
    }

    // -- Lifecycle --

    /// Runs when the host session starts.
    ///
    /// An expired refresh token resets the session. An expired access token
    /// is refreshed, or resets the session when `autoLogout` is on. Then
    /// the user is fetched unless one is already known.
    ///
    /// # Errors
    /// Whatever the refresh or user fetch returns.
    pub async fn mounted(&self) -> Result<(), SchemeError> {
        let status = self.check(true).await;
        match status.state() {
            SessionState::RefreshExpired => {
                tracing::info!(scheme = %self.inner.config.name, "refresh token expired, resetting session");
                self.reset_session().await;
            }
            SessionState::TokenExpired if self.inner.config.auto_logout => {
                tracing::info!(scheme = %self.inner.config.name, "access token expired, logging out");
                self.reset_session().await;
            }
            SessionState::TokenExpired => {
                self.refresh_tokens().await?;
            }
            SessionState::Valid | SessionState::Absent => {}
        }
        self.fetch_user_once().await.map(|_| ())
    }

    /// Sends `credentials` as the login mutation input.
    ///
    /// A failed request is logged and yields [`LoginOutcome::Failed`]; the
    /// stores are still updated, which leaves them empty. On success the
    /// user is fetched (if `autoFetch`) and the host is handed the new
    /// authorization header.
    ///
    /// # Errors
    /// Only a failed automatic user fetch is returned as `Err`.
    pub async fn login(
        &self,
        credentials: Value,
        options: LoginOptions,
    ) -> Result<LoginOutcome, SchemeError> {
        if options.reset {
            self.reset_session().await;
        }

        let request = MutationRequest::with_input(Operation::Login, credentials);
        let outcome = match self.inner.transport.mutate(request).await {
            Ok(response) => LoginOutcome::Success(response),
            Err(err) => {
                tracing::warn!(scheme = %self.inner.config.name, error = %err, "login request failed");
                LoginOutcome::Failed(err)
            }
        };

        let response = outcome.response();
        self.inner.update_tokens(response, UpdateOptions::login()).await;

        if self.inner.config.user.auto_fetch {
            self.fetch_user().await?;
        }

        let header = extract(response, &self.inner.config.token.login_property)
            .and_then(|credential| credential.authorization(self.inner.config.token.kind.as_deref()));
        if let Some(header) = header {
            self.inner.host.on_login(&header).await;
            tracing::info!(scheme = %self.inner.config.name, "logged in");
        }

        Ok(outcome)
    }

    /// Tells the host to drop its credential, then resets the session.
    pub async fn logout(&self) {
        self.inner.host.on_logout();
        self.reset_session().await;
        tracing::info!(scheme = %self.inner.config.name, "logged out");
    }

    /// Clears the user and both stores. Safe to call any number of times.
    pub async fn reset(&self) {
        *self.inner.user.lock().await = None;
        self.inner.host.set_user(None);
        self.inner.tokens.lock().await.reset();
    }

    /// [`reset`](Self::reset), then lets the host clear its own state.
    pub async fn reset_session(&self) {
        self.reset().await;
        self.inner.host.on_reset();
        tracing::debug!(scheme = %self.inner.config.name, "session reset");
    }

    // -- User --

    /// Queries the current user, bypassing any client cache.
    ///
    /// Does nothing (`Ok(None)`) when tokens are absent. Failures are
    /// reported to the host under `fetchUser` and returned.
    ///
    /// # Errors
    /// - [`SchemeError::MissingUserData`] if the configured field is empty.
    /// - [`SchemeError::Transport`] if the query fails.
    pub async fn fetch_user(&self) -> Result<Option<Response>, SchemeError> {
        if !self.check(false).await.valid {
            tracing::debug!(scheme = %self.inner.config.name, "no tokens, skipping user fetch");
            return Ok(None);
        }

        match self.query_user().await {
            Ok(response) => Ok(Some(response)),
            Err(err) => {
                tracing::warn!(scheme = %self.inner.config.name, error = %err, "user fetch failed");
                self.inner.host.call_on_error(&err, SchemeMethod::FetchUser);
                Err(err)
            }
        }
    }

    /// [`fetch_user`](Self::fetch_user) unless a user is already known.
    pub async fn fetch_user_once(&self) -> Result<Option<Response>, SchemeError> {
        if self.inner.user.lock().await.is_some() {
            return Ok(None);
        }
        self.fetch_user().await
    }

    async fn query_user(&self) -> Result<Response, SchemeError> {
        let request = QueryRequest::new(Operation::User, FetchPolicy::NoCache);
        let response = self.inner.transport.query(request).await?;

        let property = &self.inner.config.user.property;
        let user = get_prop(&response, property)
            .filter(|value| is_truthy(value))
            .cloned()
            .ok_or_else(|| SchemeError::MissingUserData {
                property: property.to_string(),
            })?;

        self.inner.host.set_user(Some(&user));
        *self.inner.user.lock().await = Some(user);
        Ok(response)
    }

    // -- Tokens --

    /// Exchanges the refresh token for new tokens.
    ///
    /// Does nothing (`Ok(None)`) when tokens are absent. Concurrent calls
    /// share a single mutation and all receive its outcome.
    ///
    /// # Errors
    /// - [`SchemeError::ExpiredSession`] if the refresh token has expired.
    ///   The session is reset first and no request is sent.
    /// - [`SchemeError::Transport`] if the mutation fails (reported to the
    ///   host once, under `refreshToken`).
    pub async fn refresh_tokens(&self) -> Result<Option<Response>, SchemeError> {
        let (input, generation) = {
            let mut tokens = self.inner.tokens.lock().await;
            if !tokens.check(false).valid {
                return Ok(None);
            }
            if tokens.refresh.status().expired() {
                drop(tokens);
                tracing::info!(scheme = %self.inner.config.name, "refresh token expired");
                self.reset_session().await;
                return Err(SchemeError::ExpiredSession);
            }
            (self.inner.refresh_input(&tokens), tokens.generation)
        };

        self.join_or_start_refresh(input, generation).await.await.map(Some)
    }

    /// Joins the in-flight refresh for this session, or starts one. A
    /// refresh left over from a replaced session is never joined.
    async fn join_or_start_refresh(&self, input: Value, generation: u64) -> SharedRefresh {
        let mut in_flight = self.inner.in_flight.lock().await;
        if let Some(pending) = in_flight.as_ref().filter(|slot| slot.generation == generation) {
            tracing::debug!(scheme = %self.inner.config.name, "joining in-flight refresh");
            return pending.refresh.clone();
        }

        let request = MutationRequest::with_input(Operation::RefreshToken, input)
            .context(RequestContext::without_authorization());

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.run_refresh(request, generation).await });

        let inner = Arc::clone(&self.inner);
        let pending = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    inner.clear_in_flight(generation).await;
                    Err(SchemeError::RefreshAborted(err.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        *in_flight = Some(InFlight {
            generation,
            refresh: pending.clone(),
        });
        pending
    }

    /// Applies a login or refresh response to the stores.
    ///
    /// Token fields marked not required are set as present without reading
    /// the response. A missing access token clears the stored one; a
    /// missing refresh token leaves the stored one alone.
    pub async fn update_tokens(&self, response: Option<&Response>, options: UpdateOptions) {
        self.inner.update_tokens(response, options).await;
    }

    /// Makes sure the access token is usable before a request goes out.
    ///
    /// Refreshes an expired access token first. Returns the header value
    /// to attach, or `None` when there is no session.
    ///
    /// # Errors
    /// [`SchemeError::ExpiredSession`] if the session can't be renewed
    /// (refresh token expired, or the refresh failed). The session is reset
    /// in both cases.
    pub async fn ensure_fresh(&self) -> Result<Option<String>, SchemeError> {
        match self.check(true).await.state() {
            SessionState::RefreshExpired => {
                self.reset_session().await;
                return Err(SchemeError::ExpiredSession);
            }
            SessionState::TokenExpired => {
                if let Err(err) = self.refresh_tokens().await {
                    tracing::warn!(scheme = %self.inner.config.name, error = %err, "could not renew session");
                    self.reset_session().await;
                    return Err(SchemeError::ExpiredSession);
                }
            }
            SessionState::Valid | SessionState::Absent => {}
        }
        Ok(self.authorization().await)
    }
}
