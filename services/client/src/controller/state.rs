//! services/client/src/controller/state.rs
//!
//! The shared application state, built once at startup.

use crate::config::Config;
use elearn_core::ports::{BackendGateway, IdentityProvider, PaymentGateway};
use std::sync::Arc;

use super::auth::AuthSession;
use super::catalog::Catalog;
use super::library::Library;
use super::navigation::NavigationRouter;
use super::purchase::{InFlightOrders, PurchaseFlow, PurchaseSettings};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<dyn BackendGateway>,
    pub checkout: Arc<dyn PaymentGateway>,
    pub auth: Arc<AuthSession>,
    pub library: Arc<Library>,
    pub catalog: Arc<Catalog>,
    pub in_flight: InFlightOrders,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        gateway: Arc<dyn BackendGateway>,
        identity: Arc<dyn IdentityProvider>,
        checkout: Arc<dyn PaymentGateway>,
    ) -> Self {
        let auth = Arc::new(AuthSession::new(identity, gateway.clone()));
        let library = Arc::new(Library::new(gateway.clone(), config.expiry_policy));
        let catalog = Arc::new(Catalog::new(
            gateway.clone(),
            library.clone(),
            config.show_inactive_categories,
        ));
        Self {
            config,
            gateway,
            checkout,
            auth,
            library,
            catalog,
            in_flight: InFlightOrders::new(),
        }
    }

    /// A router observing this state's auth session.
    pub fn router(&self) -> NavigationRouter {
        NavigationRouter::new(&self.auth)
    }

    /// A purchase flow sharing this state's in-flight registry.
    pub fn purchase_flow(&self) -> PurchaseFlow {
        PurchaseFlow::new(
            self.gateway.clone(),
            self.checkout.clone(),
            self.library.clone(),
            self.in_flight.clone(),
            PurchaseSettings {
                currency: self.config.payment_currency.clone(),
                payment_timeout: self.config.payment_timeout,
            },
        )
    }

    /// Signs out and forgets the previous user's library.
    pub async fn sign_out(&self) {
        self.auth.sign_out().await;
        self.library.clear();
    }
}
