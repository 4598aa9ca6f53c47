//! services/client/src/adapters/checkout.rs
//!
//! A sandbox checkout that settles every payment on its own after a short
//! delay, standing in for the hosted payment sheet.

use async_trait::async_trait;
use elearn_core::ports::{CheckoutError, CheckoutRequest, PaymentGateway, PaymentReply};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub struct SandboxCheckout {
    settle_after: Duration,
    approve: bool,
}

impl SandboxCheckout {
    pub fn approving(settle_after: Duration) -> Self {
        Self {
            settle_after,
            approve: true,
        }
    }

    pub fn declining(settle_after: Duration) -> Self {
        Self {
            settle_after,
            approve: false,
        }
    }
}

#[async_trait]
impl PaymentGateway for SandboxCheckout {
    async fn open_checkout(
        &self,
        request: CheckoutRequest,
        reply: PaymentReply,
    ) -> Result<(), CheckoutError> {
        if request.amount <= 0 {
            return Err(CheckoutError(format!(
                "order {} has no payable amount",
                request.order_id
            )));
        }
        info!(
            "Sandbox checkout for order {}: {} {} ({})",
            request.order_id, request.amount, request.currency, request.description
        );

        let settle_after = self.settle_after;
        let approve = self.approve;
        tokio::spawn(async move {
            tokio::time::sleep(settle_after).await;
            if approve {
                reply.success(Some(format!("pay_sandbox_{}", Uuid::new_v4().simple())));
            } else {
                reply.error(
                    2,
                    Some(r#"{"error":{"description":"Payment declined by sandbox"}}"#),
                );
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elearn_core::domain::OrderId;
    use elearn_core::ports::PaymentOutcome;

    fn request(amount: i64) -> CheckoutRequest {
        CheckoutRequest {
            order_id: OrderId::from("o1"),
            amount,
            currency: "INR".to_string(),
            description: "Rust 101".to_string(),
            prefill_email: None,
        }
    }

    #[tokio::test]
    async fn approving_checkout_reports_payment_id() {
        let (reply, receiver) = PaymentReply::channel();
        SandboxCheckout::approving(Duration::ZERO)
            .open_checkout(request(100), reply)
            .await
            .unwrap();

        match receiver.await.unwrap() {
            PaymentOutcome::Succeeded { payment_id } => {
                assert!(payment_id.unwrap().starts_with("pay_sandbox_"))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn declining_checkout_reports_description() {
        let (reply, receiver) = PaymentReply::channel();
        SandboxCheckout::declining(Duration::ZERO)
            .open_checkout(request(100), reply)
            .await
            .unwrap();

        assert_eq!(
            receiver.await.unwrap(),
            PaymentOutcome::Failed {
                code: 2,
                description: "Payment declined by sandbox".to_string()
            }
        );
    }

    #[tokio::test]
    async fn zero_amount_is_refused() {
        let (reply, _receiver) = PaymentReply::channel();
        let result = SandboxCheckout::approving(Duration::ZERO)
            .open_checkout(request(0), reply)
            .await;
        assert!(result.is_err());
    }
}
