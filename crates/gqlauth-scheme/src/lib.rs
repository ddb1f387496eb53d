//! The refresh-token auth scheme for gqlauth.
//!
//! This crate is the state machine at the heart of gqlauth. It decides:
//!
//! 1. **When credentials are usable** — combining the access and refresh
//!    token stores into one [`SchemeCheck`].
//! 2. **What to do about it** — log in, refresh, fetch the user, or tear
//!    the session down ([`RefreshCoordinator`]).
//! 3. **How concurrent callers share work** — at most one refresh request
//!    is ever in flight; everyone else awaits the same outcome.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session controller (above)  ← lifecycle hooks: mounted, login, logout
//!     ↕
//! Scheme (this crate)  ← token lifecycle state machine
//!     ↕
//! Tokens + Transport (below)  ← storage, expiry, GraphQL execution
//! ```
//!
//! The application plugs in through two traits: a
//! [`GraphqlTransport`](gqlauth_transport::GraphqlTransport) that executes
//! operations, and an [`AuthHost`] that receives user/credential updates
//! and error reports.

#![allow(async_fn_in_trait)]

mod check;
mod config;
mod coordinator;
mod error;
mod host;

pub use check::{SchemeCheck, SessionState};
pub use config::{
    AuthConfig, CredentialScope, RefreshTokenOptions, TokenOptions,
    UserOptions,
};
pub use coordinator::{
    LoginOptions, LoginOutcome, RefreshCoordinator, UpdateOptions,
};
pub use error::{ConfigError, SchemeError};
pub use host::{AuthHost, SchemeMethod};
