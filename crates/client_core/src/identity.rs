//! Identity provider boundary.
//!
//! The session manager only sees this trait; the wire protocol belongs to the
//! implementation (see [`crate::cognito::CognitoIdentityProvider`]). Failures
//! that originate at the provider are reported as
//! [`shared::error::ProviderError`] inside the `anyhow::Error`, so callers can
//! downcast them for message normalization.

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::AuthUser,
    error::ProviderError,
    protocol::{ConfirmSignInInput, SignInInput, SignInOutput},
};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_current_user(&self) -> Result<AuthUser>;
    async fn sign_in(&self, input: SignInInput) -> Result<SignInOutput>;
    async fn confirm_sign_in(&self, input: ConfirmSignInInput) -> Result<SignInOutput>;
    async fn sign_out(&self) -> Result<()>;
}

/// Bearer credentials for requests that must be authorized as the signed in
/// user.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

pub struct MissingIdentityProvider;

fn unavailable() -> anyhow::Error {
    ProviderError::new(
        "IdentityProviderUnavailable",
        "identity provider is not configured",
    )
    .into()
}

#[async_trait]
impl IdentityProvider for MissingIdentityProvider {
    async fn get_current_user(&self) -> Result<AuthUser> {
        Err(unavailable())
    }

    async fn sign_in(&self, _input: SignInInput) -> Result<SignInOutput> {
        Err(unavailable())
    }

    async fn confirm_sign_in(&self, _input: ConfirmSignInInput) -> Result<SignInOutput> {
        Err(unavailable())
    }

    async fn sign_out(&self) -> Result<()> {
        Err(unavailable())
    }
}

pub struct NoToken;

#[async_trait]
impl TokenSource for NoToken {
    async fn bearer_token(&self) -> Option<String> {
        None
    }
}
