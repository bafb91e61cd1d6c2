use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the identity provider, in the provider's own terms.
///
/// `code` is the provider's error type name (`NotAuthorizedException`,
/// `UserNotFoundException`, ...). On the wire it arrives as `__type`, possibly
/// prefixed with a namespace and `#`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ProviderError {
    #[serde(rename = "__type", deserialize_with = "strip_namespace")]
    pub code: String,
    #[serde(default, alias = "Message")]
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

fn strip_namespace<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(match raw.rsplit_once('#') {
        Some((_, code)) => code.to_string(),
        None => raw,
    })
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlErrorItem {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}
