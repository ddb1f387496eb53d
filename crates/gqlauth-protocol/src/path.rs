//! Property paths: tolerant lookups into nested responses.
//!
//! A login response might look like:
//!
//! ```json
//! { "data": { "login": { "token": "T1", "refreshToken": "R1" } } }
//! ```
//!
//! and the scheme is configured with `"data.login.token"` to find the
//! access token. Servers differ, so the path is configuration, not code.
//!
//! Lookups never fail loudly. A missing key, a `null` in the middle of the
//! chain, or a holder that isn't an object all produce `None`. This is a
//! lookup primitive, not a validator. Callers decide whether absence is
//! an error (e.g. missing user data) or just "no token this time".

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// PropertyPath
// ---------------------------------------------------------------------------

/// Where to find a value inside a response.
///
/// Two forms are accepted, matching what users write in configuration:
///
/// - `Dotted("data.login.token")` — split on `.` and walked left to right.
///   Before splitting, the whole string is tried as a literal key, so a
///   response like `{ "data.login.token": "T1" }` also resolves.
/// - `Segments(["data", "login", "token"])` — pre-split keys, for field
///   names that themselves contain dots.
///
/// `#[serde(untagged)]` lets the config say either `"a.b"` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyPath {
    /// A dot-delimited path.
    Dotted(String),
    /// A pre-split sequence of keys.
    Segments(Vec<String>),
}

impl PropertyPath {
    /// Returns `true` if the path has nothing to look up.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Dotted(path) => path.is_empty(),
            Self::Segments(segments) => segments.is_empty(),
        }
    }

    /// Returns the individual keys this path walks through.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::Dotted(path) => path.split('.').collect(),
            Self::Segments(segments) => {
                segments.iter().map(String::as_str).collect()
            }
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dotted(path) => f.write_str(path),
            Self::Segments(segments) => f.write_str(&segments.join(".")),
        }
    }
}

impl From<&str> for PropertyPath {
    fn from(path: &str) -> Self {
        Self::Dotted(path.to_string())
    }
}

impl From<String> for PropertyPath {
    fn from(path: String) -> Self {
        Self::Dotted(path)
    }
}

impl From<Vec<String>> for PropertyPath {
    fn from(segments: Vec<String>) -> Self {
        Self::Segments(segments)
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Resolves `path` against `holder`.
///
/// Returns `None` when:
/// - `holder` is not an object or array,
/// - `path` is empty,
/// - any step along the way is missing or not traversable.
///
/// Arrays are traversed with numeric segments (`"items.0.id"`).
///
/// ```rust
/// use gqlauth_protocol::{get_prop, PropertyPath};
/// use serde_json::json;
///
/// let response = json!({ "data": { "login": { "token": "T1" } } });
/// let path = PropertyPath::from("data.login.token");
/// assert_eq!(get_prop(&response, &path), Some(&json!("T1")));
///
/// let missing = PropertyPath::from("data.refresh.token");
/// assert_eq!(get_prop(&response, &missing), None);
/// ```
pub fn get_prop<'a>(holder: &'a Value, path: &PropertyPath) -> Option<&'a Value> {
    if path.is_empty() || !is_container(holder) {
        return None;
    }

    // A literal key wins over the dotted walk.
    if let PropertyPath::Dotted(literal) = path {
        if let Some(value) = step(holder, literal) {
            return Some(value);
        }
    }

    path.segments()
        .into_iter()
        .try_fold(holder, |current, segment| step(current, segment))
}

/// Whether a JSON value counts as "present".
///
/// Tokens and user data come back as arbitrary JSON. "Present" means the
/// server sent something meaningful: not `null`, `false`, `0` or `""`.
/// Empty objects and arrays count as present.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Takes one step into `current`. Scalars can't be stepped into.
fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => {
            segment.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    }
}
