use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gqlauth::prelude::*;
use rand::distr::{Alphanumeric, SampleString};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Fake GraphQL API
// ---------------------------------------------------------------------------

const PASSWORD: &str = "hunter2";

#[derive(Default)]
struct Issued {
    /// access token -> email
    access: HashMap<String, String>,
    /// refresh token -> email
    refresh: HashMap<String, String>,
}

/// An in-process API that issues random tokens and checks them.
///
/// Reads the `Authorization` header from the shared credential slot, the
/// way a real HTTP link would before each request.
struct FakeApi {
    issued: Mutex<Issued>,
    slot: CredentialSlot,
    refresh_calls: AtomicUsize,
}

impl FakeApi {
    fn new(slot: CredentialSlot) -> Self {
        Self {
            issued: Mutex::new(Issued::default()),
            slot,
            refresh_calls: AtomicUsize::new(0),
        }
    }

    async fn issue(&self, email: &str) -> (String, String) {
        let (access, refresh) = {
            let mut rng = rand::rng();
            (
                Alphanumeric.sample_string(&mut rng, 24),
                Alphanumeric.sample_string(&mut rng, 32),
            )
        };

        let mut issued = self.issued.lock().await;
        issued.access.insert(access.clone(), email.to_string());
        issued.refresh.insert(refresh.clone(), email.to_string());
        (access, refresh)
    }

    async fn login(&self, input: Option<&Value>) -> Result<Response, TransportError> {
        let email = input.and_then(|i| i.get("email")).and_then(Value::as_str);
        let password = input.and_then(|i| i.get("password")).and_then(Value::as_str);
        match (email, password) {
            (Some(email), Some(PASSWORD)) => {
                let (token, refresh) = self.issue(email).await;
                Ok(json!({ "data": { "login": { "token": token, "refreshToken": refresh } } }))
            }
            _ => Err(TransportError::graphql("invalid credentials")),
        }
    }

    async fn refresh(&self, request: &MutationRequest) -> Result<Response, TransportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        // Slow enough for concurrent callers to pile up.
        tokio::time::sleep(Duration::from_millis(100)).await;

        if !request.context.suppresses_authorization() {
            return Err(TransportError::graphql("refresh must not carry a bearer token"));
        }
        let presented = request
            .input()
            .and_then(|i| i.get("refreshToken"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let email = self.issued.lock().await.refresh.remove(presented);
        match email {
            Some(email) => {
                let (token, refresh) = self.issue(&email).await;
                Ok(json!({
                    "data": { "refresh": { "token": token, "refreshToken": refresh } }
                }))
            }
            None => Err(TransportError::graphql("unknown refresh token")),
        }
    }

    async fn user(&self) -> Result<Response, TransportError> {
        let header = self.slot.get().unwrap_or_default();
        let token = header.strip_prefix("Bearer ").unwrap_or_default();
        match self.issued.lock().await.access.get(token) {
            Some(email) => Ok(json!({ "data": { "user": { "email": email } } })),
            None => Err(TransportError::Status {
                status: 401,
                body: "unauthorized".into(),
            }),
        }
    }
}

impl GraphqlTransport for FakeApi {
    async fn mutate(&self, request: MutationRequest) -> Result<Response, TransportError> {
        match request.operation {
            Operation::Login => self.login(request.input()).await,
            Operation::RefreshToken => self.refresh(&request).await,
            other => Err(TransportError::graphql(format!("{other} is not a mutation"))),
        }
    }

    async fn query(&self, request: QueryRequest) -> Result<Response, TransportError> {
        match request.operation {
            Operation::User => self.user().await,
            other => Err(TransportError::graphql(format!("{other} is not a query"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

struct ConsoleHost;

impl AuthHost for ConsoleHost {
    fn set_user(&self, user: Option<&Value>) {
        match user {
            Some(user) => tracing::info!(%user, "user set"),
            None => tracing::info!("user cleared"),
        }
    }

    fn call_on_error(&self, error: &SchemeError, method: SchemeMethod) {
        tracing::error!(%method, %error, "auth error");
    }

    async fn on_login(&self, _authorization: &str) {
        tracing::info!("credential attached");
    }

    fn on_logout(&self) {
        tracing::info!("credential detached");
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

// ---------------------------------------------------------------------------
// Session walkthrough
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), GqlAuthError> {
    gqlauth::init_tracing();

    let slot = CredentialSlot::new();
    let api = Arc::new(FakeApi::new(slot.clone()));

    // The user query needs the published header, so fetch after login.
    let config = AuthConfig::from_json(
        r#"{ "token": { "global": true, "maxAge": 600 }, "user": { "autoFetch": false } }"#,
    )?;
    let session = SessionController::builder(Arc::clone(&api), ConsoleHost)
        .config(config)
        .shared_slot(slot)
        .build()?;

    let status = session.mounted().await;
    tracing::info!(state = ?status.state(), "mounted");

    let rejected = session
        .login(&Credentials {
            email: "ada@example.com",
            password: "wrong",
        })
        .await?;
    tracing::info!(success = rejected.is_success(), "first login attempt");

    session
        .login(&Credentials {
            email: "ada@example.com",
            password: PASSWORD,
        })
        .await?;
    session.fetch_user().await?;
    tracing::info!(user = ?session.user().await, "logged in");

    let mut refreshes = Vec::new();
    for _ in 0..5 {
        let session = session.clone();
        refreshes.push(tokio::spawn(async move { session.refresh_tokens().await }));
    }
    for refresh in refreshes {
        if let Ok(Err(err)) = refresh.await {
            tracing::error!(error = %err, "refresh failed");
        }
    }
    tracing::info!(
        requests = api.refresh_calls.load(Ordering::SeqCst),
        "five concurrent refreshes finished"
    );

    session.fetch_user().await?;

    session.logout().await;
    tracing::info!(
        attached = session.credential_slot().is_set(),
        state = ?session.check(false).await.state(),
        "logged out"
    );

    Ok(())
}
