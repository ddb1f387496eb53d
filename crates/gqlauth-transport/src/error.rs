/// Errors that can occur while executing a GraphQL operation.
///
/// `Clone` because one refresh outcome is handed to every caller that was
/// waiting on it. That rules out wrapping non-cloneable sources like
/// `std::io::Error`; implementations flatten them to strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a GraphQL `errors` array.
    #[error("graphql errors: {}", .0.join("; "))]
    Graphql(Vec<String>),

    /// The server answered with a non-success HTTP status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be parsed.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Shorthand for a single GraphQL error message.
    pub fn graphql(message: impl Into<String>) -> Self {
        Self::Graphql(vec![message.into()])
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
