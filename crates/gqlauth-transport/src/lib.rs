//! Transport abstraction for gqlauth.
//!
//! Provides the [`GraphqlTransport`] trait: the one seam through which the
//! auth scheme talks to the remote API. The scheme never builds HTTP
//! requests itself; whatever GraphQL client the application already uses
//! implements this trait.
//!
//! # Feature Flags
//!
//! - `scripted` — [`ScriptedTransport`], an in-memory double that replays
//!   canned responses and records every call (for tests and demos).

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "scripted")]
mod scripted;

pub use error::TransportError;
#[cfg(feature = "scripted")]
pub use scripted::{RecordedCall, ScriptedTransport};

use std::future::Future;
use std::sync::Arc;

use gqlauth_protocol::{MutationRequest, QueryRequest, Response};

/// Executes GraphQL operations against the remote API.
///
/// Responses come back as opaque JSON trees; the scheme reads them only
/// through configured property paths.
///
/// The returned futures must be `Send` because the scheme runs the shared
/// refresh on a spawned Tokio task.
pub trait GraphqlTransport: Send + Sync + 'static {
    /// Executes a mutation (login, refresh).
    fn mutate(
        &self,
        request: MutationRequest,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;

    /// Executes a query (current user).
    fn query(
        &self,
        request: QueryRequest,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

impl<T: GraphqlTransport> GraphqlTransport for Arc<T> {
    fn mutate(
        &self,
        request: MutationRequest,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        (**self).mutate(request)
    }

    fn query(
        &self,
        request: QueryRequest,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        (**self).query(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display_joins_graphql_messages() {
        let err = TransportError::Graphql(vec!["bad input".into(), "denied".into()]);
        assert_eq!(err.to_string(), "graphql errors: bad input; denied");
    }

    #[test]
    fn test_transport_error_graphql_shorthand() {
        assert_eq!(
            TransportError::graphql("nope"),
            TransportError::Graphql(vec!["nope".into()])
        );
    }

    #[test]
    fn test_transport_error_from_serde_json_is_decode() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TransportError = parse_err.into();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn test_transport_error_clone_preserves_equality() {
        let err = TransportError::Status {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.clone(), err);
        assert_eq!(err.to_string(), "unexpected status 502: bad gateway");
    }
}
