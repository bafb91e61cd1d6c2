//! Error taxonomy of the client core and the normalization that turns any
//! failure into a message fit for display.

use shared::error::{GraphqlErrorItem, ProviderError};
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error; check your connection and retry.";

/// A sign-in, challenge confirmation, or sign-out failure, already rendered
/// into a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthenticationError {
    message: String,
}

impl AuthenticationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn from_error(err: &anyhow::Error) -> Self {
        Self::new(error_to_string(err))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum DataRequestError {
    #[error("request to data service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("data service responded with status {status}")]
    Status { status: u16, body: String },
    #[error("{}", join_graphql_messages(.messages))]
    Graphql { messages: Vec<GraphqlErrorItem> },
    #[error("data service response is missing `{0}`")]
    MissingData(&'static str),
    #[error("malformed data service response: {0}")]
    Decode(#[from] serde_json::Error),
}

fn join_graphql_messages(messages: &[GraphqlErrorItem]) -> String {
    if messages.is_empty() {
        return "data service reported an unspecified error".to_string();
    }
    messages
        .iter()
        .map(|item| item.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn provider_message(err: &ProviderError) -> String {
    let fixed = match err.code.as_str() {
        "NotAuthorizedException" => Some("Incorrect username or password."),
        "UserNotFoundException" => Some("User does not exist."),
        "UsernameExistsException" => Some("An account with this username already exists."),
        "InvalidPasswordException" => Some("Password does not meet the password policy."),
        "CodeMismatchException" => Some("Invalid verification code; please try again."),
        "ExpiredCodeException" => Some("Verification code has expired; request a new one."),
        "LimitExceededException" | "TooManyRequestsException" => {
            Some("Too many attempts; please wait and try again later.")
        }
        "UserAlreadyAuthenticatedException" => Some("There is already a signed in user."),
        _ => None,
    };

    match fixed {
        Some(message) => message.to_string(),
        None if !err.message.trim().is_empty() => err.message.clone(),
        None => err.code.clone(),
    }
}

fn transport_message(err: &reqwest::Error) -> Option<String> {
    (err.is_connect() || err.is_timeout() || err.is_request())
        .then(|| NETWORK_ERROR_MESSAGE.to_string())
}

/// Renders any failure from the identity or data boundary into a message
/// suitable for showing to the user.
pub fn error_to_string(err: &anyhow::Error) -> String {
    if let Some(provider) = err.downcast_ref::<ProviderError>() {
        return provider_message(provider);
    }
    if let Some(auth) = err.downcast_ref::<AuthenticationError>() {
        return auth.message().to_string();
    }
    if let Some(data) = err.downcast_ref::<DataRequestError>() {
        if let DataRequestError::Transport(transport) = data {
            if let Some(message) = transport_message(transport) {
                return message;
            }
        }
        return data.to_string();
    }
    if let Some(transport) = err.downcast_ref::<reqwest::Error>() {
        if let Some(message) = transport_message(transport) {
            return message;
        }
    }

    let message = err.to_string();
    if message.trim().is_empty() {
        "Unexpected error".to_string()
    } else {
        message
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
