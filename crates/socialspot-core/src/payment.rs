// Payment intent types and registration checks

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::pricing::{booking_fee, total_amount, CURRENCY};

/// Status string Stripe reports once the charge went through
pub const STATUS_SUCCEEDED: &str = "succeeded";

/// Request to create a payment intent for one event booking
#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentIntent {
    pub amount: i64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
}

impl NewPaymentIntent {
    /// Booking for `user_id` on `event_id` at the event's base cost
    pub fn for_booking(event_id: i64, user_id: &str, base_cost: i64) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("eventId".to_string(), event_id.to_string());
        metadata.insert("userId".to_string(), user_id.to_string());
        metadata.insert("baseCost".to_string(), base_cost.to_string());
        metadata.insert("bookingFee".to_string(), booking_fee(base_cost).to_string());

        Self {
            amount: total_amount(base_cost),
            currency: CURRENCY.to_string(),
            metadata,
        }
    }
}

/// Payment intent as reported by the payment provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Why a payment intent cannot be used for a registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMismatch {
    NotSucceeded,
    WrongAmount { expected: i64, actual: i64 },
    WrongCurrency,
    WrongBooking,
}

impl PaymentMismatch {
    pub fn message(&self) -> &'static str {
        match self {
            PaymentMismatch::WrongBooking => "Payment does not match this registration",
            _ => "Payment verification failed",
        }
    }
}

impl PaymentIntent {
    /// Check that this intent paid for exactly this booking
    pub fn verify_booking(
        &self,
        event_id: i64,
        user_id: &str,
        base_cost: i64,
    ) -> Result<(), PaymentMismatch> {
        if self.status != STATUS_SUCCEEDED {
            return Err(PaymentMismatch::NotSucceeded);
        }
        let expected = total_amount(base_cost);
        if self.amount != expected {
            return Err(PaymentMismatch::WrongAmount {
                expected,
                actual: self.amount,
            });
        }
        if !self.currency.eq_ignore_ascii_case(CURRENCY) {
            return Err(PaymentMismatch::WrongCurrency);
        }

        let event_matches = self.metadata.get("eventId") == Some(&event_id.to_string());
        let user_matches = self.metadata.get("userId").map(String::as_str) == Some(user_id);
        let cost_matches = self
            .metadata
            .get("baseCost")
            .and_then(|c| c.parse::<i64>().ok())
            == Some(base_cost);
        if !(event_matches && user_matches && cost_matches) {
            return Err(PaymentMismatch::WrongBooking);
        }
        Ok(())
    }
}
