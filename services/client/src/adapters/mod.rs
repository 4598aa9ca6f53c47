pub mod checkout;
pub mod http_gateway;
pub mod identity;
pub mod wire;

pub use checkout::SandboxCheckout;
pub use http_gateway::HttpBackendGateway;
pub use identity::DevIdentityProvider;
