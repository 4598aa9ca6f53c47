//! services/client/src/controller/purchase.rs
//!
//! Buying a course: create the order on the backend, hand it to the external
//! checkout, then wait for the checkout's one-shot reply.
//!
//! A course can have at most one purchase in flight across every flow that
//! shares the same [`InFlightOrders`] registry.

use elearn_core::domain::{AuthIdentity, Course, CourseId, Order, UserId};
use elearn_core::ports::{
    BackendGateway, CheckoutRequest, PaymentGateway, PaymentOutcome, PaymentReply,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::library::Library;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseState {
    Idle,
    OrderRequested { course_id: CourseId },
    AwaitingPayment { order: Order },
    Confirmed { order: Order, payment_id: Option<String> },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("A purchase of course {0} is already in progress")]
    AlreadyInFlight(CourseId),
    #[error("Course {0} cannot be purchased")]
    NotPurchasable(CourseId),
    #[error("Failed to create order for course {0}")]
    CreateFailed(CourseId),
    #[error("Checkout could not be opened: {0}")]
    CheckoutUnavailable(String),
    #[error("No payment is pending")]
    NoPendingPayment,
}

//=========================================================================================
// In-flight registry
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct InFlightOrders {
    courses: Arc<Mutex<HashSet<CourseId>>>,
}

impl InFlightOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `course_id`, or returns `None` if someone already holds it.
    pub fn try_claim(&self, course_id: &CourseId) -> Option<InFlightGuard> {
        let claimed = self.lock().insert(course_id.clone());
        claimed.then(|| InFlightGuard {
            registry: self.clone(),
            course_id: course_id.clone(),
        })
    }

    pub fn contains(&self, course_id: &CourseId) -> bool {
        self.lock().contains(course_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<CourseId>> {
        self.courses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases its course when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlightOrders,
    course_id: CourseId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.course_id);
    }
}

//=========================================================================================
// PurchaseFlow
//=========================================================================================

#[derive(Debug, Clone)]
pub struct PurchaseSettings {
    pub currency: String,
    pub payment_timeout: Duration,
}

struct PendingPayment {
    order: Order,
    buyer: UserId,
    receiver: oneshot::Receiver<PaymentOutcome>,
    deadline: Instant,
    _claim: InFlightGuard,
}

pub const PURCHASE_INTERRUPTED_MESSAGE: &str = "The purchase was interrupted.";

/// Holds the flow in an intermediate state while an `initiate` call is
/// pending. If that call is dropped before it finishes, the flow fails.
struct InProgress<'a> {
    state: &'a mut PurchaseState,
    done: bool,
}

impl<'a> InProgress<'a> {
    fn enter(state: &'a mut PurchaseState, progress: PurchaseState) -> Self {
        *state = progress;
        Self { state, done: false }
    }

    fn finish(mut self, next: PurchaseState) {
        *self.state = next;
        self.done = true;
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        if !self.done {
            warn!("Purchase interrupted while {:?}", self.state);
            *self.state = PurchaseState::Failed {
                reason: PURCHASE_INTERRUPTED_MESSAGE.to_string(),
            };
        }
    }
}

pub struct PurchaseFlow {
    gateway: Arc<dyn BackendGateway>,
    checkout: Arc<dyn PaymentGateway>,
    library: Arc<Library>,
    in_flight: InFlightOrders,
    settings: PurchaseSettings,
    state: PurchaseState,
    pending: Option<PendingPayment>,
}

impl PurchaseFlow {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        checkout: Arc<dyn PaymentGateway>,
        library: Arc<Library>,
        in_flight: InFlightOrders,
        settings: PurchaseSettings,
    ) -> Self {
        Self {
            gateway,
            checkout,
            library,
            in_flight,
            settings,
            state: PurchaseState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> &PurchaseState {
        &self.state
    }

    pub fn settings(&self) -> &PurchaseSettings {
        &self.settings
    }

    /// Creates an order for `course` and opens the checkout for it.
    pub async fn initiate(
        &mut self,
        course: &Course,
        buyer: &AuthIdentity,
    ) -> Result<Order, OrderError> {
        if !course.can_be_purchased {
            return Err(OrderError::NotPurchasable(course.id.clone()));
        }
        let claim = self.in_flight.try_claim(&course.id).ok_or_else(|| {
            warn!("Purchase of {} already in progress", course.id);
            OrderError::AlreadyInFlight(course.id.clone())
        })?;
        if self.pending.take().is_some() {
            warn!("Abandoning the previous pending payment");
        }

        let step = InProgress::enter(
            &mut self.state,
            PurchaseState::OrderRequested {
                course_id: course.id.clone(),
            },
        );
        let Some(order) = self.gateway.create_order(&course.id, &buyer.uid).await else {
            let e = OrderError::CreateFailed(course.id.clone());
            error!("{}", e);
            step.finish(PurchaseState::Failed {
                reason: e.to_string(),
            });
            return Err(e);
        };
        info!("Order {} created for course {}", order.id, course.id);

        let request = CheckoutRequest {
            order_id: order.id.clone(),
            amount: order.amount,
            currency: self.settings.currency.clone(),
            description: course.name.clone(),
            prefill_email: buyer.email.clone(),
        };
        let (reply, receiver) = PaymentReply::channel();
        if let Err(e) = self.checkout.open_checkout(request, reply).await {
            error!("Checkout for order {} failed to open: {}", order.id, e);
            step.finish(PurchaseState::Failed {
                reason: e.to_string(),
            });
            return Err(OrderError::CheckoutUnavailable(e.0));
        }

        step.finish(PurchaseState::AwaitingPayment {
            order: order.clone(),
        });
        self.pending = Some(PendingPayment {
            order: order.clone(),
            buyer: buyer.uid.clone(),
            receiver,
            deadline: Instant::now() + self.settings.payment_timeout,
            _claim: claim,
        });
        Ok(order)
    }

    /// Waits for the checkout result, at most until the payment timeout that
    /// started when the checkout opened. On success the library is re-queried
    /// for the buyer.
    ///
    /// Cancel safe: if this future is dropped the payment stays pending and
    /// can be awaited again or cancelled.
    pub async fn await_payment(&mut self) -> Result<&PurchaseState, OrderError> {
        let pending = self.pending.as_mut().ok_or(OrderError::NoPendingPayment)?;
        let outcome = tokio::time::timeout_at(pending.deadline, &mut pending.receiver).await;

        let Some(PendingPayment {
            order,
            buyer,
            _claim: claim,
            ..
        }) = self.pending.take()
        else {
            return Err(OrderError::NoPendingPayment);
        };
        drop(claim);

        self.state = match outcome {
            Ok(Ok(PaymentOutcome::Succeeded { payment_id })) => {
                info!("Payment for order {} succeeded", order.id);
                PurchaseState::Confirmed { order, payment_id }
            }
            Ok(Ok(PaymentOutcome::Failed { code, description })) => {
                warn!("Payment for order {} failed ({}): {}", order.id, code, description);
                PurchaseState::Failed {
                    reason: description,
                }
            }
            Ok(Err(_)) => {
                warn!("Checkout for order {} closed without a result", order.id);
                PurchaseState::Failed {
                    reason: "Payment was not completed.".to_string(),
                }
            }
            Err(_) => {
                warn!(
                    "No payment result for order {} within {:?}",
                    order.id, self.settings.payment_timeout
                );
                PurchaseState::Failed {
                    reason: "Payment timed out.".to_string(),
                }
            }
        };

        if matches!(self.state, PurchaseState::Confirmed { .. }) {
            self.library.refresh(&buyer).await;
        }
        Ok(&self.state)
    }

    /// Returns a finished flow to `Idle`.
    pub fn acknowledge(&mut self) {
        if matches!(
            self.state,
            PurchaseState::Confirmed { .. } | PurchaseState::Failed { .. }
        ) {
            self.state = PurchaseState::Idle;
        }
    }

    /// Abandons a pending payment and releases its course.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            info!("Purchase of order {} cancelled", pending.order.id);
        }
        self.state = PurchaseState::Idle;
    }
}
