use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use gqlauth::prelude::*;
use gqlauth_transport::ScriptedTransport;
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Default)]
struct TestHost {
    user: Mutex<Option<Value>>,
    errors: Mutex<Vec<SchemeMethod>>,
}

impl AuthHost for TestHost {
    fn set_user(&self, user: Option<&Value>) {
        *self.user.lock().unwrap() = user.cloned();
    }

    fn call_on_error(&self, _error: &SchemeError, method: SchemeMethod) {
        self.errors.lock().unwrap().push(method);
    }

    async fn on_login(&self, _authorization: &str) {}

    fn on_logout(&self) {}
}

type Session = SessionController<Arc<ScriptedTransport>, Arc<TestHost>>;

fn session(config: AuthConfig) -> (Session, Arc<ScriptedTransport>, Arc<MemoryStorage>) {
    let transport = Arc::new(ScriptedTransport::new());
    let storage = Arc::new(MemoryStorage::new());
    let session = SessionController::builder(Arc::clone(&transport), Arc::new(TestHost::default()))
        .config(config)
        .storage(storage.clone())
        .build()
        .unwrap();
    (session, transport, storage)
}

fn script_login(transport: &ScriptedTransport, token: &str) {
    transport.respond(
        Operation::Login,
        Ok(json!({ "data": { "login": { "token": token, "refreshToken": "R1" } } })),
    );
    transport.respond(Operation::User, Ok(json!({ "data": { "user": { "id": 7 } } })));
}

fn millis(at: SystemTime) -> u64 {
    at.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_millis() as u64
}

#[derive(Serialize)]
struct EmailLogin<'a> {
    email: &'a str,
    password: &'a str,
}

// =========================================================================
// Building
// =========================================================================

#[test]
fn test_build_shared_scope_without_slot_fails() {
    let config = AuthConfig::default().with_scope(CredentialScope::Shared);
    let result = SessionController::builder(
        Arc::new(ScriptedTransport::new()),
        Arc::new(TestHost::default()),
    )
    .config(config)
    .build();

    assert!(matches!(
        result,
        Err(GqlAuthError::Config(gqlauth::scheme::ConfigError::MissingSharedSlot))
    ));
}

#[test]
fn test_build_invalid_config_fails() {
    let config = AuthConfig::default().with_name("");
    let result = SessionController::builder(
        Arc::new(ScriptedTransport::new()),
        Arc::new(TestHost::default()),
    )
    .config(config)
    .build();

    assert!(matches!(result, Err(GqlAuthError::Config(_))));
}

// =========================================================================
// Login / logout
// =========================================================================

#[tokio::test]
async fn test_login_serializes_credentials_and_publishes_header() {
    let (session, transport, _) = session(AuthConfig::default());
    script_login(&transport, "T1");

    let outcome = session
        .login(&EmailLogin {
            email: "a@b.c",
            password: "pw",
        })
        .await
        .unwrap();

    assert!(outcome.is_success());
    let input = transport.last_mutation(Operation::Login).unwrap();
    assert_eq!(input.input(), Some(&json!({ "email": "a@b.c", "password": "pw" })));
    assert_eq!(session.credential_slot().get().as_deref(), Some("Bearer T1"));
    assert_eq!(session.user().await, Some(json!({ "id": 7 })));
    assert_eq!(*session.host().user.lock().unwrap(), Some(json!({ "id": 7 })));
}

#[tokio::test]
async fn test_login_unserializable_credentials_rejected() {
    let (session, transport, _) = session(AuthConfig::default());
    let mut credentials = BTreeMap::new();
    credentials.insert(vec![1u8], "pw");

    let err = session.login(&credentials).await.unwrap_err();

    assert!(matches!(err, GqlAuthError::Credentials(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_logout_clears_slot_and_storage() {
    let (session, transport, storage) = session(AuthConfig::default());
    script_login(&transport, "T1");
    session.login(&json!({})).await.unwrap();

    session.logout().await;

    assert!(!session.credential_slot().is_set());
    assert!(storage.is_empty());
    assert_eq!(session.check(false).await.state(), SessionState::Absent);
}

#[tokio::test]
async fn test_shared_slot_visible_across_controllers() {
    let shared = CredentialSlot::new();
    let config = AuthConfig::default().with_scope(CredentialScope::Shared);

    let transport = Arc::new(ScriptedTransport::new());
    script_login(&transport, "T1");
    let first = SessionController::builder(Arc::clone(&transport), Arc::new(TestHost::default()))
        .config(config.clone())
        .shared_slot(shared.clone())
        .build()
        .unwrap();
    let second = SessionController::builder(
        Arc::new(ScriptedTransport::new()),
        Arc::new(TestHost::default()),
    )
    .config(config.with_name("admin"))
    .shared_slot(shared.clone())
    .build()
    .unwrap();

    first.login(&json!({})).await.unwrap();

    assert_eq!(second.credential_slot().get().as_deref(), Some("Bearer T1"));
    assert_eq!(shared.get().as_deref(), Some("Bearer T1"));
}

#[tokio::test]
async fn test_per_instance_slots_are_separate() {
    let (first, transport, _) = session(AuthConfig::default());
    let (second, _, _) = session(AuthConfig::default());
    script_login(&transport, "T1");

    first.login(&json!({})).await.unwrap();

    assert!(first.credential_slot().is_set());
    assert!(!second.credential_slot().is_set());
}

// =========================================================================
// mounted() / refresh
// =========================================================================

#[tokio::test]
async fn test_mounted_swallows_user_fetch_failure() {
    let (session, transport, storage) = session(AuthConfig::default());
    let later = millis(SystemTime::now() + Duration::from_secs(600));
    storage.set("_token.graphql", Some(json!("T0")));
    storage.set("_token_expiration.graphql", Some(json!(later)));
    storage.set("_refresh_token.graphql", Some(json!("R0")));
    transport.respond(Operation::User, Ok(json!({ "data": { "user": null } })));

    let status = session.mounted().await;

    assert!(status.valid);
    assert_eq!(session.credential_slot().get().as_deref(), Some("Bearer T0"));
    assert_eq!(*session.host().errors.lock().unwrap(), vec![SchemeMethod::FetchUser]);
}

#[tokio::test]
async fn test_mounted_with_expired_access_token_republishes_header() {
    let (session, transport, storage) = session(AuthConfig::default());
    let earlier = millis(SystemTime::now() - Duration::from_secs(10));
    storage.set("_token.graphql", Some(json!("T0")));
    storage.set("_token_expiration.graphql", Some(json!(earlier)));
    storage.set("_refresh_token.graphql", Some(json!("R0")));
    transport.respond(
        Operation::RefreshToken,
        Ok(json!({ "data": { "refresh": { "token": "T1", "refreshToken": "R1" } } })),
    );
    transport.respond(Operation::User, Ok(json!({ "data": { "user": { "id": 7 } } })));

    let status = session.mounted().await;

    assert_eq!(status.state(), SessionState::Valid);
    assert_eq!(session.credential_slot().get().as_deref(), Some("Bearer T1"));
}

#[tokio::test]
async fn test_ensure_fresh_expired_session_is_reported() {
    let (session, _, storage) = session(AuthConfig::default());
    let earlier = millis(SystemTime::now() - Duration::from_secs(10));
    storage.set("_token.graphql", Some(json!("T0")));
    storage.set("_refresh_token.graphql", Some(json!("R0")));
    storage.set("_refresh_token_expiration.graphql", Some(json!(earlier)));

    let err = session.ensure_fresh().await.unwrap_err();

    assert!(err.is_expired_session());
    assert!(!session.credential_slot().is_set());
}

#[tokio::test]
async fn test_refresh_tokens_publishes_new_header() {
    let (session, transport, _) = session(AuthConfig::default().with_auto_fetch_user(false));
    transport.respond(
        Operation::Login,
        Ok(json!({ "data": { "login": { "token": "T1", "refreshToken": "R1" } } })),
    );
    transport.respond(
        Operation::RefreshToken,
        Ok(json!({ "data": { "refresh": { "token": "T2", "refreshToken": "R2" } } })),
    );
    session.login(&json!({})).await.unwrap();

    session.refresh_tokens().await.unwrap();

    assert_eq!(session.credential_slot().get().as_deref(), Some("Bearer T2"));
    assert_eq!(session.authorization().await.as_deref(), Some("Bearer T2"));
}
