//! Request types the scheme hands to the transport.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A transport response, as an opaque JSON tree.
///
/// The scheme never decodes this into a typed struct. Values are pulled
/// out with [`get_prop`](crate::get_prop) using configured paths.
pub type Response = Value;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// The GraphQL operations the scheme issues.
///
/// The transport owns the actual documents (`mutation Login($input: ...)`);
/// the scheme only says which one it wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Exchanges credentials for tokens.
    Login,
    /// Exchanges a refresh token for a new access token.
    RefreshToken,
    /// Fetches the current user.
    User,
}

impl Operation {
    /// The operation name as it appears in the GraphQL document.
    pub fn name(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::RefreshToken => "RefreshToken",
            Self::User => "User",
        }
    }

    /// Returns `true` for operations sent with `mutate`.
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Login | Self::RefreshToken)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// FetchPolicy
// ---------------------------------------------------------------------------

/// Cache behaviour for queries, mirroring the usual GraphQL client policies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Serve from cache when possible.
    #[default]
    CacheFirst,
    /// Always hit the network, but update the cache.
    NetworkOnly,
    /// Always hit the network and never touch the cache.
    NoCache,
}

// ---------------------------------------------------------------------------
// RequestContext
// ---------------------------------------------------------------------------

/// Per-request transport context.
///
/// Header values are `Option`s: `Some(v)` sets a header, `None` explicitly
/// removes one the transport would otherwise attach. The refresh mutation
/// uses this to drop `authorization` so it never depends on the expiring
/// access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub headers: BTreeMap<String, Option<String>>,
}

impl RequestContext {
    /// Name of the header carrying the access token.
    pub const AUTHORIZATION: &'static str = "authorization";

    /// A context that suppresses the forwarded authorization header.
    pub fn without_authorization() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(Self::AUTHORIZATION.to_string(), None);
        Self { headers }
    }

    /// Returns `true` if this context removes the authorization header.
    pub fn suppresses_authorization(&self) -> bool {
        matches!(self.headers.get(Self::AUTHORIZATION), Some(None))
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A mutation to execute: operation, variables, and context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub operation: Operation,
    pub variables: Value,
    #[serde(default)]
    pub context: RequestContext,
}

impl MutationRequest {
    /// Creates a mutation whose variables are `{ "input": input }`.
    ///
    /// This is the shape both the login and refresh mutations take.
    pub fn with_input(operation: Operation, input: Value) -> Self {
        let mut variables = Map::new();
        variables.insert("input".to_string(), input);
        Self {
            operation,
            variables: Value::Object(variables),
            context: RequestContext::default(),
        }
    }

    /// Replaces the request context.
    pub fn context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// The `input` variable, if present.
    pub fn input(&self) -> Option<&Value> {
        self.variables.get("input")
    }
}

/// A query to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub operation: Operation,
    #[serde(default)]
    pub fetch_policy: FetchPolicy,
}

impl QueryRequest {
    pub fn new(operation: Operation, fetch_policy: FetchPolicy) -> Self {
        Self {
            operation,
            fetch_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_operation_display_uses_document_name() {
        assert_eq!(Operation::RefreshToken.to_string(), "RefreshToken");
        assert_eq!(Operation::User.to_string(), "User");
    }

    #[test]
    fn test_operation_is_mutation() {
        assert!(Operation::Login.is_mutation());
        assert!(Operation::RefreshToken.is_mutation());
        assert!(!Operation::User.is_mutation());
    }

    #[test]
    fn test_fetch_policy_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(FetchPolicy::NoCache).unwrap(),
            json!("no-cache")
        );
    }

    #[test]
    fn test_request_context_without_authorization_suppresses_header() {
        let ctx = RequestContext::without_authorization();
        assert!(ctx.suppresses_authorization());
        assert!(!RequestContext::default().suppresses_authorization());
    }

    #[test]
    fn test_mutation_request_with_input_wraps_variables() {
        let req = MutationRequest::with_input(
            Operation::Login,
            json!({ "email": "a@b.c" }),
        );
        assert_eq!(req.variables, json!({ "input": { "email": "a@b.c" } }));
        assert_eq!(req.input(), Some(&json!({ "email": "a@b.c" })));
    }
}
