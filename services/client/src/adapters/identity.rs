//! services/client/src/adapters/identity.rs
//!
//! A development stand-in for the platform identity SDK. It serves one
//! pre-verified identity from configuration, so the client can be driven
//! end to end without a device credential manager.

use async_trait::async_trait;
use elearn_core::domain::{AuthIdentity, Credential, UserId};
use elearn_core::ports::{IdentityError, IdentityProvider};
use std::sync::Mutex;
use tracing::info;

use crate::config::DevIdentity;

pub struct DevIdentityProvider {
    identity: AuthIdentity,
    signed_in: Mutex<bool>,
}

impl DevIdentityProvider {
    /// `restore_session` mimics a device that already holds an external session.
    pub fn new(dev: &DevIdentity, restore_session: bool) -> Self {
        Self {
            identity: AuthIdentity {
                uid: UserId::new(dev.uid.clone()),
                display_name: dev.display_name.clone(),
                email: dev.email.clone(),
                photo_url: None,
            },
            signed_in: Mutex::new(restore_session),
        }
    }

    fn set_signed_in(&self, value: bool) {
        let mut guard = self.signed_in.lock().unwrap_or_else(|e| e.into_inner());
        *guard = value;
    }
}

#[async_trait]
impl IdentityProvider for DevIdentityProvider {
    fn current_user(&self) -> Option<AuthIdentity> {
        let signed_in = *self.signed_in.lock().unwrap_or_else(|e| e.into_inner());
        signed_in.then(|| self.identity.clone())
    }

    async fn authenticate(&self, credential: &Credential) -> Result<AuthIdentity, IdentityError> {
        match credential {
            Credential::GoogleIdToken(token) if token.trim().is_empty() => {
                Err(IdentityError::Rejected("empty ID token".to_string()))
            }
            Credential::EmailPassword { email, .. }
                if self.identity.email.as_deref() != Some(email.as_str()) =>
            {
                Err(IdentityError::Rejected(format!("unknown account {}", email)))
            }
            _ => {
                info!("Development identity {} signed in", self.identity.uid);
                self.set_signed_in(true);
                Ok(self.identity.clone())
            }
        }
    }

    async fn sign_out(&self) {
        self.set_signed_in(false);
    }
}
