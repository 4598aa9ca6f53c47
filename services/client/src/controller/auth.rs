//! services/client/src/controller/auth.rs
//!
//! The authentication session: the single writer of the signed-in identity.
//! Other components hold a `watch::Receiver<AuthState>` and observe changes.

use elearn_core::domain::{AuthIdentity, Credential};
use elearn_core::ports::{
    BackendGateway, IdentityError, IdentityProvider, OnboardOutcome, OnboardingReply,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn(AuthIdentity),
}

impl AuthState {
    pub fn identity(&self) -> Option<&AuthIdentity> {
        match self {
            AuthState::SignedIn(identity) => Some(identity),
            AuthState::SignedOut => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("The server could not be reached. Please try again.")]
    BackendUnreachable,
    #[error("Sign-in failed: {0}")]
    InvalidCredential(String),
    #[error("Sign-in is unavailable right now: {0}")]
    IdentityProviderUnavailable(String),
    #[error("Authentication failed: {0}")]
    OnboardingRejected(String),
}

impl From<IdentityError> for AuthError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Rejected(reason) => AuthError::InvalidCredential(reason),
            IdentityError::Unavailable(reason) => AuthError::IdentityProviderUnavailable(reason),
        }
    }
}

/// How the backend answered an onboarding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStatus {
    Created,
    AlreadyExists,
    Rejected,
}

impl OnboardingStatus {
    pub fn is_accepted(self) -> bool {
        !matches!(self, OnboardingStatus::Rejected)
    }
}

/// Classifies an onboarding reply.
///
/// A structured `status` field wins when present. Otherwise the legacy backend
/// contract applies: the `success` flag, HTTP 209, or a message mentioning
/// `209` or "successfully" all mean the user is known to the backend.
pub fn classify_onboarding(reply: &OnboardingReply) -> OnboardingStatus {
    if let Some(status) = reply.status.as_deref() {
        match status.trim().to_ascii_lowercase().as_str() {
            "created" => return OnboardingStatus::Created,
            "exists" | "already_exists" => return OnboardingStatus::AlreadyExists,
            "rejected" => return OnboardingStatus::Rejected,
            _ => {}
        }
    }
    if reply.success {
        return OnboardingStatus::Created;
    }
    if reply.http_status == 209 {
        return OnboardingStatus::AlreadyExists;
    }
    let message = reply.message.as_deref().unwrap_or_default();
    if message.contains("209") {
        OnboardingStatus::AlreadyExists
    } else if message.to_ascii_lowercase().contains("successfully") {
        OnboardingStatus::Created
    } else {
        OnboardingStatus::Rejected
    }
}

pub struct AuthSession {
    provider: Arc<dyn IdentityProvider>,
    gateway: Arc<dyn BackendGateway>,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    /// Seeds the session from whatever external session the provider restored.
    pub fn new(provider: Arc<dyn IdentityProvider>, gateway: Arc<dyn BackendGateway>) -> Self {
        let initial = match provider.current_user() {
            Some(identity) => AuthState::SignedIn(identity),
            None => AuthState::SignedOut,
        };
        let (state, _) = watch::channel(initial);
        Self {
            provider,
            gateway,
            state,
        }
    }

    pub fn current_identity(&self) -> Option<AuthIdentity> {
        self.state.borrow().identity().cloned()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Authenticates with the identity provider, then onboards the user with the backend.
    ///
    /// If onboarding fails the external session is left in place; the user stays
    /// signed out here and may retry.
    pub async fn sign_in(&self, credential: &Credential) -> Result<AuthIdentity, AuthError> {
        let identity = self.provider.authenticate(credential).await.map_err(|e| {
            warn!("Identity provider sign-in failed: {}", e);
            AuthError::from(e)
        })?;
        info!("External identity {} obtained; onboarding", identity.uid);

        let reply = match self.gateway.onboard(&identity.uid).await {
            OnboardOutcome::Replied(reply) => reply,
            OnboardOutcome::Unreachable => {
                error!("Backend onboarding for {} unreachable", identity.uid);
                return Err(AuthError::BackendUnreachable);
            }
        };

        let status = classify_onboarding(&reply);
        if !status.is_accepted() {
            let message = reply
                .message
                .unwrap_or_else(|| "Authentication failed".to_string());
            error!("Backend rejected onboarding for {}: {}", identity.uid, message);
            return Err(AuthError::OnboardingRejected(message));
        }

        info!("User {} onboarded ({:?})", identity.uid, status);
        self.state.send_replace(AuthState::SignedIn(identity.clone()));
        Ok(identity)
    }

    pub async fn sign_out(&self) {
        self.provider.sign_out().await;
        let previous = self.state.send_replace(AuthState::SignedOut);
        if let Some(identity) = previous.identity() {
            info!("User {} signed out", identity.uid);
        }
    }
}
