//! Response access and request vocabulary for gqlauth.
//!
//! The remote API is GraphQL-shaped but its schema is not known at compile
//! time. This crate gives the upper layers three things:
//!
//! - **Property paths** ([`PropertyPath`], [`get_prop`]) — tolerant lookups
//!   into arbitrary nested responses (`"data.login.token"`).
//! - **Config merging** ([`deep_merge`]) — overlaying user options onto
//!   defaults, key by key.
//! - **Requests** ([`Operation`], [`MutationRequest`], [`QueryRequest`]) —
//!   what the scheme asks the transport to execute.
//!
//! # Architecture
//!
//! ```text
//! Scheme (state machine) → Protocol (paths, requests) → Transport (I/O)
//! ```
//!
//! Responses are plain [`serde_json::Value`]s. Nothing here decodes them
//! into typed structs; the configured paths are the only schema.

mod merge;
mod path;
mod types;

pub use merge::deep_merge;
pub use path::{PropertyPath, get_prop, is_truthy};
pub use types::{
    FetchPolicy, MutationRequest, Operation, QueryRequest, RequestContext,
    Response,
};
