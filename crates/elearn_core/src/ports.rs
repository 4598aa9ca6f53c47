//! crates/elearn_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client controllers depend on.
//! These traits form the boundary of the hexagonal architecture: the backend
//! REST API, the identity provider, the payment checkout and the video engine
//! are all external collaborators reached only through these ports.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;

use crate::domain::{
    AuthIdentity, Category, CategoryId, Course, CourseDetail, CourseId, Credential, Order,
    OrderId, SectionDetail, SectionId, UserId,
};

//=========================================================================================
// Port Error Types
//=========================================================================================

/// Failures of the backend transport. These never cross the gateway boundary:
/// adapters log them and degrade to an empty or failure-flagged result.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
}

/// Failures reported by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Credential rejected: {0}")]
    Rejected(String),
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Failure to open the external checkout UI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Could not start checkout: {0}")]
pub struct CheckoutError(pub String);

//=========================================================================================
// Backend Gateway
//=========================================================================================

/// The backend's answer to an onboarding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingReply {
    pub http_status: u16,
    pub success: bool,
    pub message: Option<String>,
    /// A structured status, when the backend sends one (`created`, `exists`, ...).
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardOutcome {
    Replied(OnboardingReply),
    Unreachable,
}

/// Flags for the course detail endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseVisibility {
    pub allow_unpublished: bool,
    pub allow_expired: bool,
}

impl Default for CourseVisibility {
    fn default() -> Self {
        Self {
            allow_unpublished: true,
            allow_expired: true,
        }
    }
}

/// Stateless facade over the remote REST API.
///
/// No method fails: transport and decode errors are absorbed by the
/// implementation and reported as `None`, an empty list or
/// [`OnboardOutcome::Unreachable`], so callers only inspect result shape.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// `POST /v1/user/onboard`
    async fn onboard(&self, uid: &UserId) -> OnboardOutcome;

    /// `GET /v1/categories?show_inactive=`
    async fn list_categories(&self, show_inactive: bool) -> Vec<Category>;

    /// `GET /v1/categories/{id}/courses`
    async fn list_courses(&self, category_id: &CategoryId) -> Vec<Course>;

    /// `GET /v1/course/{id}?allow_unpublished=&allow_expired=`
    async fn course_detail(
        &self,
        course_id: &CourseId,
        visibility: CourseVisibility,
    ) -> Option<CourseDetail>;

    /// `GET /v1/course/{id}/section/{id}`
    async fn section_content(
        &self,
        course_id: &CourseId,
        section_id: &SectionId,
    ) -> Option<SectionDetail>;

    /// `POST /v1/order/course/{id}`
    async fn create_order(&self, course_id: &CourseId, user_id: &UserId) -> Option<Order>;

    /// `GET /v1/user/{id}/library/courses`
    async fn library(&self, user_id: &UserId) -> Vec<Order>;
}

//=========================================================================================
// Identity Provider
//=========================================================================================

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The user restored from a previous external session, if any.
    fn current_user(&self) -> Option<AuthIdentity>;

    /// Exchanges a credential for an external identity.
    async fn authenticate(&self, credential: &Credential) -> Result<AuthIdentity, IdentityError>;

    async fn sign_out(&self);
}

//=========================================================================================
// Payment Gateway
//=========================================================================================

/// What the checkout UI needs to collect a payment for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub order_id: OrderId,
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub prefill_email: Option<String>,
}

/// The result reported by the external payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded { payment_id: Option<String> },
    Failed { code: i32, description: String },
}

pub const PAYMENT_FAILED_MESSAGE: &str = "Payment failed. Please try again.";
pub const PAYMENT_UNEXPECTED_MESSAGE: &str = "Payment failed due to an unexpected error.";

#[derive(Deserialize)]
struct PaymentErrorBody {
    error: Option<PaymentErrorDetail>,
}

#[derive(Deserialize)]
struct PaymentErrorDetail {
    description: Option<String>,
}

/// Extracts the human-readable description from a gateway error body
/// (`{"error": {"description": "..."}}`).
pub fn payment_failure_description(body: Option<&str>) -> String {
    let body = match body {
        Some(body) if !body.trim().is_empty() => body,
        _ => return PAYMENT_FAILED_MESSAGE.to_string(),
    };
    match serde_json::from_str::<PaymentErrorBody>(body) {
        Ok(parsed) => parsed
            .error
            .and_then(|e| e.description)
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| PAYMENT_FAILED_MESSAGE.to_string()),
        Err(e) => {
            warn!("Unparseable payment error body: {}", e);
            PAYMENT_UNEXPECTED_MESSAGE.to_string()
        }
    }
}

/// The one-shot callback handed to the checkout UI. Consuming `self` means a
/// checkout can report at most once.
#[derive(Debug)]
pub struct PaymentReply {
    sender: oneshot::Sender<PaymentOutcome>,
}

impl PaymentReply {
    pub fn channel() -> (Self, oneshot::Receiver<PaymentOutcome>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    /// `onPaymentSuccess(paymentId)`
    pub fn success(self, payment_id: Option<String>) {
        self.report(PaymentOutcome::Succeeded { payment_id });
    }

    /// `onPaymentError(code, jsonBody)`
    pub fn error(self, code: i32, body: Option<&str>) {
        let description = payment_failure_description(body);
        self.report(PaymentOutcome::Failed { code, description });
    }

    fn report(self, outcome: PaymentOutcome) {
        if self.sender.send(outcome).is_err() {
            warn!("Payment result arrived after the purchase was abandoned.");
        }
    }
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens the checkout UI. The result arrives later, out of band, through `reply`.
    async fn open_checkout(
        &self,
        request: CheckoutRequest,
        reply: PaymentReply,
    ) -> Result<(), CheckoutError>;
}

//=========================================================================================
// Media Player
//=========================================================================================

/// The platform video engine. Only one media resource is attached at a time.
pub trait MediaPlayer: Send {
    /// Replaces the attached media with `uri` and prepares it for playback.
    fn prepare(&mut self, uri: &str);

    fn position(&self) -> Duration;

    fn seek_to(&mut self, position: Duration);

    fn play(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_description_is_read_from_nested_error() {
        let body = r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"Card declined"}}"#;
        assert_eq!(payment_failure_description(Some(body)), "Card declined");
    }

    #[test]
    fn failure_description_falls_back_when_missing() {
        assert_eq!(payment_failure_description(None), PAYMENT_FAILED_MESSAGE);
        assert_eq!(payment_failure_description(Some("{}")), PAYMENT_FAILED_MESSAGE);
        assert_eq!(
            payment_failure_description(Some(r#"{"error":{"code":"X"}}"#)),
            PAYMENT_FAILED_MESSAGE
        );
    }

    #[test]
    fn failure_description_handles_garbage() {
        assert_eq!(
            payment_failure_description(Some("<html>502</html>")),
            PAYMENT_UNEXPECTED_MESSAGE
        );
    }

    #[tokio::test]
    async fn payment_reply_delivers_once() {
        let (reply, receiver) = PaymentReply::channel();
        reply.error(2, Some(r#"{"error":{"description":"Cancelled by user"}}"#));

        assert_eq!(
            receiver.await.ok(),
            Some(PaymentOutcome::Failed {
                code: 2,
                description: "Cancelled by user".to_string()
            })
        );
    }
}
