//! Cognito user-pool implementation of [`IdentityProvider`].
//!
//! Speaks the JSON RPC dialect of the user-pool API: every call is a `POST`
//! to the pool endpoint with the operation named in `X-Amz-Target`. Tokens and
//! any pending challenge are held in memory only.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::{
    domain::{AuthUser, UserId},
    error::ProviderError,
    protocol::{ConfirmSignInInput, SignInInput, SignInOutput, SignInStep},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::identity::{IdentityProvider, TokenSource};

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const AMZ_JSON: &str = "application/x-amz-json-1.1";
const USER_PASSWORD_AUTH: &str = "USER_PASSWORD_AUTH";
const REFRESH_TOKEN_AUTH: &str = "REFRESH_TOKEN_AUTH";

#[derive(Debug, Clone)]
struct Tokens {
    access_token: String,
    id_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
struct PendingChallenge {
    name: String,
    session: Option<String>,
    username: String,
}

#[derive(Default)]
struct CognitoState {
    tokens: Option<Tokens>,
    pending: Option<PendingChallenge>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    auth_flow: &'a str,
    client_id: &'a str,
    auth_parameters: BTreeMap<&'a str, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RespondToAuthChallengeRequest<'a> {
    challenge_name: &'a str,
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
    challenge_responses: BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AccessTokenRequest<'a> {
    access_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthResponse {
    #[serde(default)]
    authentication_result: Option<AuthenticationResult>,
    #[serde(default)]
    challenge_name: Option<String>,
    #[serde(default)]
    challenge_parameters: BTreeMap<String, String>,
    #[serde(default)]
    session: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeType {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetUserResponse {
    username: String,
    #[serde(default)]
    user_attributes: Vec<AttributeType>,
}

#[derive(Debug, Deserialize)]
struct EmptyResponse {}

fn challenge_step(name: &str) -> Option<SignInStep> {
    match name {
        "NEW_PASSWORD_REQUIRED" => Some(SignInStep::ConfirmSignInWithNewPasswordRequired),
        "SMS_MFA" => Some(SignInStep::ConfirmSignInWithSmsCode),
        "SOFTWARE_TOKEN_MFA" => Some(SignInStep::ConfirmSignInWithTotpCode),
        _ => None,
    }
}

fn challenge_answer_key(name: &str) -> &'static str {
    match name {
        "SMS_MFA" => "SMS_MFA_CODE",
        "SOFTWARE_TOKEN_MFA" => "SOFTWARE_TOKEN_MFA_CODE",
        _ => "NEW_PASSWORD",
    }
}

fn provider_code(err: &anyhow::Error) -> Option<&str> {
    err.downcast_ref::<ProviderError>()
        .map(|provider| provider.code.as_str())
}

fn unauthenticated() -> anyhow::Error {
    ProviderError::new("UserUnAuthenticatedException", "User needs to be authenticated")
        .into()
}

pub struct CognitoIdentityProvider {
    http: Client,
    endpoint: String,
    client_id: String,
    state: Mutex<CognitoState>,
}

impl CognitoIdentityProvider {
    pub fn new(http: Client, endpoint: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            client_id: client_id.into(),
            state: Mutex::new(CognitoState::default()),
        }
    }

    pub async fn has_pending_challenge(&self) -> bool {
        self.state.lock().await.pending.is_some()
    }

    async fn call<Req, Res>(&self, operation: &str, body: &Req) -> Result<Res>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        debug!(operation, "calling identity provider");
        let response = self
            .http
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .header(CONTENT_TYPE, AMZ_JSON)
            .body(serde_json::to_vec(body)?)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let err = serde_json::from_slice::<ProviderError>(&bytes).unwrap_or_else(|_| {
                ProviderError::new(
                    "UnexpectedResponse",
                    format!("identity provider responded with status {status}"),
                )
            });
            return Err(err.into());
        }

        serde_json::from_slice(&bytes)
            .with_context(|| format!("malformed {operation} response from identity provider"))
    }

    async fn apply_auth_response(
        &self,
        username: &str,
        response: AuthResponse,
    ) -> Result<SignInOutput> {
        let mut guard = self.state.lock().await;
        if let Some(result) = response.authentication_result {
            guard.tokens = Some(Tokens {
                access_token: result.access_token,
                id_token: result.id_token,
                refresh_token: result.refresh_token,
            });
            guard.pending = None;
            return Ok(SignInOutput::done());
        }

        let name = response.challenge_name.ok_or_else(|| {
            ProviderError::new(
                "UnexpectedResponse",
                "identity provider returned neither tokens nor a challenge",
            )
        })?;
        let step = challenge_step(&name).ok_or_else(|| {
            ProviderError::new(
                "UnsupportedChallenge",
                format!("sign-in challenge {name} is not supported"),
            )
        })?;
        let username = response
            .challenge_parameters
            .get("USER_ID_FOR_SRP")
            .cloned()
            .unwrap_or_else(|| username.to_string());
        guard.pending = Some(PendingChallenge {
            name,
            session: response.session,
            username,
        });
        Ok(SignInOutput::pending(step))
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let response: GetUserResponse = self
            .call("GetUser", &AccessTokenRequest { access_token })
            .await?;
        let attributes: BTreeMap<String, String> = response
            .user_attributes
            .into_iter()
            .map(|attribute| (attribute.name, attribute.value))
            .collect();
        let user_id = attributes
            .get("sub")
            .cloned()
            .unwrap_or_else(|| response.username.clone());
        Ok(AuthUser {
            user_id: UserId(user_id),
            username: response.username,
            attributes,
        })
    }

    /// Exchanges the refresh token for a new access token. Clears the held
    /// tokens when no refresh is possible.
    async fn refresh_tokens(&self) -> Result<String> {
        let refresh_token = {
            let mut guard = self.state.lock().await;
            match guard.tokens.as_ref().and_then(|t| t.refresh_token.clone()) {
                Some(token) => token,
                None => {
                    guard.tokens = None;
                    return Err(unauthenticated());
                }
            }
        };

        let request = InitiateAuthRequest {
            auth_flow: REFRESH_TOKEN_AUTH,
            client_id: &self.client_id,
            auth_parameters: BTreeMap::from([("REFRESH_TOKEN", refresh_token.clone())]),
        };
        let response: AuthResponse = match self.call("InitiateAuth", &request).await {
            Ok(response) => response,
            Err(err) => {
                self.state.lock().await.tokens = None;
                return Err(err);
            }
        };
        let result = response
            .authentication_result
            .ok_or_else(unauthenticated)?;

        let mut guard = self.state.lock().await;
        let access_token = result.access_token.clone();
        guard.tokens = Some(Tokens {
            access_token: result.access_token,
            id_token: result.id_token,
            refresh_token: result.refresh_token.or(Some(refresh_token)),
        });
        debug!("refreshed identity provider tokens");
        Ok(access_token)
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn get_current_user(&self) -> Result<AuthUser> {
        let access_token = {
            let guard = self.state.lock().await;
            guard.tokens.as_ref().map(|t| t.access_token.clone())
        }
        .ok_or_else(unauthenticated)?;

        match self.get_user(&access_token).await {
            Err(err) if provider_code(&err) == Some("NotAuthorizedException") => {
                let access_token = self.refresh_tokens().await?;
                self.get_user(&access_token).await
            }
            other => other,
        }
    }

    async fn sign_in(&self, input: SignInInput) -> Result<SignInOutput> {
        if self.state.lock().await.tokens.is_some() {
            return Err(ProviderError::new(
                "UserAlreadyAuthenticatedException",
                "There is already a signed in user.",
            )
            .into());
        }

        let request = InitiateAuthRequest {
            auth_flow: USER_PASSWORD_AUTH,
            client_id: &self.client_id,
            auth_parameters: BTreeMap::from([
                ("USERNAME", input.username.clone()),
                ("PASSWORD", input.password),
            ]),
        };
        let response: AuthResponse = match self.call("InitiateAuth", &request).await {
            Ok(response) => response,
            Err(err) => {
                return match provider_code(&err) {
                    Some("UserNotConfirmedException") => {
                        Ok(SignInOutput::pending(SignInStep::ConfirmSignUp))
                    }
                    Some("PasswordResetRequiredException") => {
                        Ok(SignInOutput::pending(SignInStep::ResetPassword))
                    }
                    _ => Err(err),
                };
            }
        };

        let output = self.apply_auth_response(&input.username, response).await?;
        info!(username = %input.username, next_step = ?output.next_step, "identity provider accepted sign-in");
        Ok(output)
    }

    async fn confirm_sign_in(&self, input: ConfirmSignInInput) -> Result<SignInOutput> {
        let pending = self.state.lock().await.pending.clone().ok_or_else(|| {
            ProviderError::new("NoPendingChallenge", "There is no sign-in challenge to confirm.")
        })?;

        let mut responses = BTreeMap::from([
            ("USERNAME".to_string(), pending.username.clone()),
            (
                challenge_answer_key(&pending.name).to_string(),
                input.challenge_response,
            ),
        ]);
        for (name, value) in input.user_attributes {
            responses.insert(format!("userAttributes.{name}"), value);
        }

        let request = RespondToAuthChallengeRequest {
            challenge_name: &pending.name,
            client_id: &self.client_id,
            session: pending.session.as_deref(),
            challenge_responses: responses,
        };
        let response: AuthResponse = self.call("RespondToAuthChallenge", &request).await?;
        self.apply_auth_response(&pending.username, response).await
    }

    async fn sign_out(&self) -> Result<()> {
        let tokens = {
            let mut guard = self.state.lock().await;
            guard.pending = None;
            guard.tokens.take()
        };
        let Some(tokens) = tokens else {
            return Ok(());
        };

        let result: Result<EmptyResponse> = self
            .call(
                "GlobalSignOut",
                &AccessTokenRequest {
                    access_token: &tokens.access_token,
                },
            )
            .await;
        if let Err(err) = &result {
            warn!(error = %err, "global sign-out failed; local tokens were discarded");
        }
        result.map(|_| ())
    }
}

#[async_trait]
impl TokenSource for CognitoIdentityProvider {
    async fn bearer_token(&self) -> Option<String> {
        let guard = self.state.lock().await;
        guard
            .tokens
            .as_ref()
            .map(|t| t.id_token.clone().unwrap_or_else(|| t.access_token.clone()))
    }
}

#[cfg(test)]
#[path = "tests/cognito_tests.rs"]
mod tests;
