//! Token storage for gqlauth.
//!
//! This crate holds the two credentials a refresh-token session juggles:
//!
//! 1. **Access token** — short-lived, attached to every API request
//!    ([`AccessTokenStore`]).
//! 2. **Refresh token** — longer-lived, used only to obtain a new access
//!    token ([`RefreshTokenStore`]).
//!
//! Each store keeps a value plus the instant it expires, answers "is this
//! still usable?" ([`TokenStatus`]), and mirrors itself into an external
//! [`Storage`] so the session survives a restart.
//!
//! # How it fits in the stack
//!
//! ```text
//! Scheme (above)  ← decides WHEN to set, refresh, or reset tokens
//!     ↕
//! Token stores (this crate)  ← hold values and expiry, persist them
//!     ↕
//! Storage (below)  ← cookies, local storage, a file: whatever the host has
//! ```

mod credential;
mod error;
mod status;
mod storage;
mod store;

pub use credential::Credential;
pub use error::TokenError;
pub use status::TokenStatus;
pub use storage::{MemoryStorage, Storage};
pub use store::{
    Access, AccessTokenStore, ExpiryPolicy, Refresh, RefreshTokenStore,
    TokenKind, TokenStore,
};
