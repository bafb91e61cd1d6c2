//! Session manager: the single owner of "who is signed in".
//!
//! Every mutation (sign-in, challenge confirmation, sign-out) is followed by a
//! refresh from the identity provider, so the stored user always reflects the
//! provider rather than the mutation's own response.

use std::{collections::BTreeMap, sync::Arc};

use shared::{
    domain::AuthUser,
    protocol::{ConfirmSignInInput, SignInInput, SignInOutput, SignInStep},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{error::AuthenticationError, identity::IdentityProvider};

const SESSION_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No refresh has completed yet.
    Unknown,
    Anonymous,
    ChallengePending(SignInStep),
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<AuthUser>,
    pub is_loading: bool,
    pub phase: SessionPhase,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Changed(SessionSnapshot),
}

#[derive(Default)]
struct SessionState {
    user: Option<AuthUser>,
    in_flight: usize,
    resolved: bool,
    pending_step: Option<SignInStep>,
}

impl SessionState {
    fn phase(&self) -> SessionPhase {
        if self.user.is_some() {
            SessionPhase::Authenticated
        } else if let Some(step) = self.pending_step {
            SessionPhase::ChallengePending(step)
        } else if self.resolved {
            SessionPhase::Anonymous
        } else {
            SessionPhase::Unknown
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            is_loading: self.in_flight > 0,
            phase: self.phase(),
        }
    }
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Arc<Self> {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Arc::new(Self {
            provider,
            state: Mutex::new(SessionState::default()),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn user(&self) -> Option<AuthUser> {
        self.state.lock().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.user.is_some()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.in_flight > 0
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase()
    }

    /// Resolves the identity active at startup. Provider failures mean "not
    /// signed in" and are never reported to the caller.
    pub async fn initialize(&self) {
        let user = self.refresh_current_user().await;
        info!(authenticated = user.is_some(), "session initialized");
    }

    /// Re-reads the current user from the provider. Any failure clears the
    /// user.
    pub async fn refresh_current_user(&self) -> Option<AuthUser> {
        self.begin_call().await;
        let result = self.provider.get_current_user().await;

        let mut guard = self.state.lock().await;
        guard.user = match result {
            Ok(user) => Some(user),
            Err(err) => {
                debug!(error = %err, "no current user available");
                None
            }
        };
        guard.resolved = true;
        if guard.user.is_some() {
            guard.pending_step = None;
        }
        guard.in_flight = guard.in_flight.saturating_sub(1);
        self.publish(&guard);
        guard.user.clone()
    }

    pub async fn sign_in(&self, input: SignInInput) -> Result<SignInOutput, AuthenticationError> {
        let username = input.username.clone();
        self.begin_call().await;
        let result = self.provider.sign_in(input).await;
        self.finish_call().await;

        match result {
            Ok(output) => {
                self.record_step(&output).await;
                self.refresh_current_user().await;
                info!(%username, next_step = ?output.next_step, "sign-in accepted");
                Ok(output)
            }
            Err(err) => {
                warn!(%username, error = %err, "sign-in failed");
                // A failed attempt supersedes any challenge from an earlier one.
                let mut guard = self.state.lock().await;
                guard.pending_step = None;
                self.publish(&guard);
                Err(AuthenticationError::from_error(&err))
            }
        }
    }

    /// Completes a pending multi-step sign-in, e.g. a forced password change.
    pub async fn confirm_challenge(
        &self,
        new_secret: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> Result<SignInOutput, AuthenticationError> {
        let input = ConfirmSignInInput {
            challenge_response: new_secret.into(),
            user_attributes: attributes,
        };
        self.begin_call().await;
        let result = self.provider.confirm_sign_in(input).await;
        self.finish_call().await;

        match result {
            Ok(output) => {
                self.record_step(&output).await;
                self.refresh_current_user().await;
                info!(next_step = ?output.next_step, "sign-in challenge confirmed");
                Ok(output)
            }
            Err(err) => {
                warn!(error = %err, "sign-in challenge confirmation failed");
                Err(AuthenticationError::from_error(&err))
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), AuthenticationError> {
        self.begin_call().await;
        let result = self.provider.sign_out().await;
        {
            let mut guard = self.state.lock().await;
            guard.pending_step = None;
            guard.in_flight = guard.in_flight.saturating_sub(1);
            self.publish(&guard);
        }

        let user = self.refresh_current_user().await;
        match result {
            Ok(()) => {
                info!(still_authenticated = user.is_some(), "signed out");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "sign-out failed");
                Err(AuthenticationError::from_error(&err))
            }
        }
    }

    async fn record_step(&self, output: &SignInOutput) {
        let mut guard = self.state.lock().await;
        guard.pending_step = (!output.next_step.is_done()).then_some(output.next_step);
        self.publish(&guard);
    }

    async fn begin_call(&self) {
        let mut guard = self.state.lock().await;
        guard.in_flight += 1;
        self.publish(&guard);
    }

    async fn finish_call(&self) {
        let mut guard = self.state.lock().await;
        guard.in_flight = guard.in_flight.saturating_sub(1);
        self.publish(&guard);
    }

    fn publish(&self, state: &SessionState) {
        let _ = self.events.send(SessionEvent::Changed(state.snapshot()));
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
