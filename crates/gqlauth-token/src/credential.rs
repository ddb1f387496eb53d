use std::fmt;

use gqlauth_protocol::is_truthy;
use serde_json::Value;

/// A credential value held by a token store.
///
/// Most servers hand back a string, but a token field can also be marked
/// "not required": the server manages the credential itself (a session
/// cookie, say) and the client only needs to know one exists. That case
/// is [`Credential::Implicit`].
///
/// `Debug` is written by hand so token values never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// An opaque token string.
    Token(String),
    /// Presence is assumed; there is no value to attach.
    Implicit,
}

impl Credential {
    /// Interprets a value pulled out of a server response.
    ///
    /// Falsy values (`null`, `""`, `0`, `false`) mean "no token". Strings
    /// and numbers become [`Credential::Token`]; `true` becomes
    /// [`Credential::Implicit`]. Objects and arrays aren't tokens.
    pub fn from_response_value(value: &Value) -> Option<Self> {
        if !is_truthy(value) {
            return None;
        }
        match value {
            Value::String(s) => Some(Self::Token(s.clone())),
            Value::Number(n) => Some(Self::Token(n.to_string())),
            Value::Bool(_) => Some(Self::Implicit),
            _ => {
                tracing::debug!("ignoring non-scalar token value in response");
                None
            }
        }
    }

    /// The token string, if there is one.
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(token) => Some(token),
            Self::Implicit => None,
        }
    }

    /// The JSON form written to storage and request variables.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Token(token) => Value::String(token.clone()),
            Self::Implicit => Value::Bool(true),
        }
    }

    /// Formats an `Authorization` header value, e.g. `"Bearer T1"`.
    ///
    /// `scheme` of `None` yields the bare token. Implicit credentials have
    /// nothing to attach and return `None`.
    pub fn authorization(&self, scheme: Option<&str>) -> Option<String> {
        let token = self.as_token()?;
        Some(match scheme {
            Some(scheme) if !scheme.is_empty() => format!("{scheme} {token}"),
            _ => token.to_string(),
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Implicit => f.write_str("Implicit"),
        }
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self::Token(token.to_string())
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self::Token(token)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_response_value_string_is_token() {
        assert_eq!(
            Credential::from_response_value(&json!("T1")),
            Some(Credential::Token("T1".into()))
        );
    }

    #[test]
    fn test_from_response_value_number_is_stringified() {
        assert_eq!(
            Credential::from_response_value(&json!(1234)),
            Some(Credential::Token("1234".into()))
        );
    }

    #[test]
    fn test_from_response_value_true_is_implicit() {
        assert_eq!(
            Credential::from_response_value(&json!(true)),
            Some(Credential::Implicit)
        );
    }

    #[test]
    fn test_from_response_value_falsy_is_none() {
        for value in [json!(null), json!(""), json!(0), json!(false)] {
            assert_eq!(Credential::from_response_value(&value), None, "{value}");
        }
    }

    #[test]
    fn test_from_response_value_object_is_none() {
        assert_eq!(Credential::from_response_value(&json!({ "t": 1 })), None);
    }

    #[test]
    fn test_authorization_prefixes_scheme() {
        let cred = Credential::from("T1");
        assert_eq!(cred.authorization(Some("Bearer")).as_deref(), Some("Bearer T1"));
        assert_eq!(cred.authorization(None).as_deref(), Some("T1"));
        assert_eq!(cred.authorization(Some("")).as_deref(), Some("T1"));
        assert_eq!(Credential::Implicit.authorization(Some("Bearer")), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let cred = Credential::from("super-secret");
        assert_eq!(format!("{cred:?}"), "Token(***)");
    }
}
