//! # gqlauth
//!
//! Refresh-token session management for GraphQL clients.
//!
//! gqlauth keeps an access token and a refresh token alive for the length
//! of a user session: it logs in through a GraphQL mutation, stores both
//! tokens with their expiry, fetches the current user, and renews the
//! access token on demand. Concurrent renewals collapse into one request.
//!
//! The application supplies two pieces:
//!
//! - a [`GraphqlTransport`](gqlauth_transport::GraphqlTransport) that runs
//!   the `Login`, `RefreshToken` and `User` operations against its API,
//! - an [`AuthHost`](gqlauth_scheme::AuthHost) that receives the user and
//!   any errors.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gqlauth::prelude::*;
//!
//! gqlauth::init_tracing();
//!
//! let session = SessionController::builder(my_transport, my_host)
//!     .config(AuthConfig::default())
//!     .build()?;
//!
//! session.mounted().await;
//! session.login(&json!({ "email": "a@b.c", "password": "pw" })).await?;
//! let header = session.ensure_fresh().await?; // Some("Bearer ...")
//! ```

#![allow(async_fn_in_trait)]

mod controller;
mod error;

pub use controller::{CredentialSlot, SessionController, SessionControllerBuilder, SlotHost};
pub use error::GqlAuthError;

pub use gqlauth_protocol as protocol;
pub use gqlauth_scheme as scheme;
pub use gqlauth_token as token;
pub use gqlauth_transport as transport;

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Everything needed to set up a session.
pub mod prelude {
    pub use crate::{
        CredentialSlot, GqlAuthError, SessionController, SessionControllerBuilder,
    };
    pub use gqlauth_protocol::{FetchPolicy, MutationRequest, Operation, QueryRequest, Response};
    pub use gqlauth_scheme::{
        AuthConfig, AuthHost, CredentialScope, LoginOptions, LoginOutcome, SchemeCheck,
        SchemeError, SchemeMethod, SessionState,
    };
    pub use gqlauth_token::{Credential, MemoryStorage, Storage};
    pub use gqlauth_transport::{GraphqlTransport, TransportError};
    #[cfg(feature = "scripted")]
    pub use gqlauth_transport::ScriptedTransport;
}
