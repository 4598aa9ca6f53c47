//! services/client/src/controller/mod.rs
//!
//! The stateful part of the client. Controllers depend only on the ports in
//! `elearn_core`; adapters are injected through [`state::AppState`].

pub mod auth;
pub mod catalog;
pub mod library;
pub mod navigation;
pub mod playback;
pub mod purchase;
pub mod scope;
pub mod state;

pub use auth::{AuthError, AuthSession, AuthState};
pub use navigation::{NavigationError, NavigationRouter, Route};
pub use playback::{MediaHandoff, PlaybackError, PlaybackSession};
pub use purchase::{OrderError, PurchaseFlow, PurchaseState};
pub use state::AppState;
