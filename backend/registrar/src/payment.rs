//! Contribution payment through the hosted gateway overlay.
//!
//! ```text
//! open(amount) ──► create-order ──► CheckoutSession ──► (overlay in browser)
//!                                                           │
//! settle(session, OverlayResult) ◄──────────────────────────┘
//!        └─► verify-payment ──► PaymentOutcome
//! ```
//!
//! `settle` never returns an error: every failure, including a dismissed
//! overlay, is a [`PaymentOutcome::Failed`] and the caller leaves the
//! draft's payment fields alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::errors::Result;
use crate::wire::{Order, PaymentCallback};

/// An order waiting for the overlay to come back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub order: Order,
    pub amount: u64,
    pub opened_at: DateTime<Utc>,
}

/// What the overlay reported.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum OverlayResult {
    Completed(PaymentCallback),
    Dismissed,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PaymentOutcome {
    Paid { amount: u64, payment_id: String },
    Failed { reason: String },
}

pub struct PaymentFlow<'a> {
    api: &'a ApiClient,
}

impl<'a> PaymentFlow<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Create the gateway order for `amount`.
    pub async fn open(&self, amount: u64) -> Result<CheckoutSession> {
        let order = self.api.create_order(amount).await?;
        info!("Opened payment order {} for {amount}", order.id);
        Ok(CheckoutSession {
            order,
            amount,
            opened_at: Utc::now(),
        })
    }

    /// Turn the overlay's result into a verified outcome.
    pub async fn settle(&self, session: &CheckoutSession, result: OverlayResult) -> PaymentOutcome {
        let callback = match result {
            OverlayResult::Completed(callback) => callback,
            OverlayResult::Dismissed => return failed("Payment was cancelled"),
            OverlayResult::Failed { reason } => return failed(reason),
        };

        if callback.razorpay_order_id != session.order.id {
            warn!(
                "Overlay returned order {} but {} was opened",
                callback.razorpay_order_id, session.order.id
            );
            return failed("Payment does not match the open order");
        }

        match self.api.verify_payment(&callback).await {
            Ok(reply) if reply.is_success() => {
                info!("Payment {} verified", callback.razorpay_payment_id);
                PaymentOutcome::Paid {
                    amount: session.amount,
                    payment_id: callback.razorpay_payment_id,
                }
            }
            Ok(reply) => failed(
                reply
                    .message
                    .unwrap_or_else(|| "Payment verification failed".to_string()),
            ),
            Err(e) => failed(e.user_message()),
        }
    }
}

fn failed(reason: impl Into<String>) -> PaymentOutcome {
    let reason = reason.into();
    warn!("Payment failed: {reason}");
    PaymentOutcome::Failed { reason }
}
