use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInInput {
    pub username: String,
    pub password: String,
}

impl SignInInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Step the caller must complete before the sign-in is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignInStep {
    Done,
    ConfirmSignInWithNewPasswordRequired,
    ConfirmSignInWithSmsCode,
    ConfirmSignInWithTotpCode,
    ConfirmSignUp,
    ResetPassword,
}

impl SignInStep {
    pub fn is_done(self) -> bool {
        self == SignInStep::Done
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInOutput {
    pub is_signed_in: bool,
    pub next_step: SignInStep,
}

impl SignInOutput {
    pub fn done() -> Self {
        Self {
            is_signed_in: true,
            next_step: SignInStep::Done,
        }
    }

    pub fn pending(next_step: SignInStep) -> Self {
        Self {
            is_signed_in: false,
            next_step,
        }
    }
}

/// Answer to a pending challenge, e.g. the new password for
/// [`SignInStep::ConfirmSignInWithNewPasswordRequired`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmSignInInput {
    pub challenge_response: String,
    #[serde(default)]
    pub user_attributes: BTreeMap<String, String>,
}

/// Routing state handed to the project periods screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRouteState {
    pub period_project_id: String,
    pub project_name: String,
}
