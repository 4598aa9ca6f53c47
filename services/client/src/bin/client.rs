//! services/client/src/bin/client.rs

use client_lib::{
    adapters::{DevIdentityProvider, HttpBackendGateway, SandboxCheckout},
    config::Config,
    controller::{catalog::Catalog, AppState, Route},
    error::ClientError,
};
use elearn_core::domain::Credential;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Backend at {}", config.api_base_url);

    // --- 2. Initialize Adapters ---
    let gateway = Arc::new(HttpBackendGateway::new(
        &config.api_base_url,
        config.request_timeout,
    )?);
    let dev_identity = config
        .dev_identity
        .as_ref()
        .ok_or_else(|| ClientError::Internal("ELEARN_DEV_UID is required to sign in".to_string()))?;
    let identity = Arc::new(DevIdentityProvider::new(dev_identity, false));
    let checkout = Arc::new(SandboxCheckout::approving(Duration::from_secs(2)));

    // --- 3. Build the Shared AppState ---
    let state = AppState::new(config.clone(), gateway, identity, checkout);
    let mut router = state.router();
    info!("Starting at {}", router.current().route());

    // --- 4. Sign In ---
    let credential = Credential::GoogleIdToken(format!("dev-{}", dev_identity.uid));
    let user = state.auth.sign_in(&credential).await?;
    router.sync_auth();
    info!(
        "Signed in as {} ({}); now at {}",
        user.display_name.as_deref().unwrap_or("unnamed"),
        user.uid,
        router.current().route()
    );

    // --- 5. Browse ---
    let categories = state.catalog.categories().await;
    if categories.is_empty() {
        warn!("The backend returned no categories");
    }
    for category in &categories {
        router.navigate(Route::Courses {
            category_id: category.id.clone(),
            user_id: user.uid.clone(),
        })?;
        let scope = router.current().scope().clone();
        let Some(courses) = scope
            .run(state.catalog.courses_for(&category.id, &user.uid))
            .await
        else {
            continue;
        };

        info!(
            "{} ({} course(s))",
            Catalog::category_name(&categories, &category.id),
            courses.len()
        );
        for course in &courses {
            info!(
                "  {} - {} [{}]",
                course.id,
                course.name,
                if course.purchased { "purchased" } else { "available" }
            );
        }
        router.back();
    }

    for course in state.library.purchased_courses() {
        info!("In library: {}", course.name);
    }

    // --- 6. Sign Out ---
    state.sign_out().await;
    router.sync_auth();
    info!("Signed out; now at {}", router.current().route());

    Ok(())
}
