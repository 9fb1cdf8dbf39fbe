// Event service: paid booking flow and series links

use std::sync::Arc;

use chrono::Utc;
use socialspot_core::email::registration_confirmation;
use socialspot_core::pricing::booking_fee;
use socialspot_core::{
    Event, Mailer, NewPaymentIntent, PaymentGateway, SeriesRedirect, SiteConfig,
};
use socialspot_storage::Database;

use crate::common::ApiError;

/// Payment intent handed to the checkout form
#[derive(Debug, Clone, PartialEq)]
pub struct BookingIntent {
    pub client_secret: String,
    pub amount: i64,
    pub base_cost: i64,
    pub booking_fee: i64,
}

pub struct EventService {
    db: Arc<Database>,
    payments: Arc<dyn PaymentGateway>,
    mailer: Arc<dyn Mailer>,
    site: SiteConfig,
}

impl EventService {
    pub fn new(
        db: Arc<Database>,
        payments: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
        site: SiteConfig,
    ) -> Self {
        Self {
            db,
            payments,
            mailer,
            site,
        }
    }

    async fn event(&self, event_id: i64) -> Result<Event, ApiError> {
        self.db
            .get_event(event_id)
            .await
            .map_err(|e| ApiError::internal("Internal server error", e))?
            .map(Event::from)
            .ok_or_else(|| ApiError::not_found("Event not found"))
    }

    async fn is_registered(&self, event_id: i64, user_id: &str) -> Result<bool, ApiError> {
        self.db
            .is_participant(event_id, user_id)
            .await
            .map_err(|e| ApiError::internal("Internal server error", e))
    }

    /// Create a payment intent for the event's base cost plus booking fee
    pub async fn payment_intent(
        &self,
        event_id: i64,
        user_id: &str,
    ) -> Result<BookingIntent, ApiError> {
        let event = self.event(event_id).await?;
        if !event.is_paid() {
            return Err(ApiError::bad_request(
                "This event is free and doesn't require payment",
            ));
        }
        if event.has_ended(Utc::now()) {
            return Err(ApiError::bad_request("Event has ended"));
        }
        if self.is_registered(event_id, user_id).await? {
            return Err(ApiError::bad_request("Already registered for this event"));
        }

        let request = NewPaymentIntent::for_booking(event_id, user_id, event.cost);
        let intent = self
            .payments
            .create_payment_intent(&request)
            .await
            .map_err(|e| ApiError::internal("Failed to create payment intent", e))?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            ApiError::internal(
                "Failed to create payment intent",
                anyhow::anyhow!("payment intent {} has no client secret", intent.id),
            )
        })?;

        tracing::info!(event_id, user_id, amount = intent.amount, "Payment intent created");
        Ok(BookingIntent {
            client_secret,
            amount: intent.amount,
            base_cost: event.cost,
            booking_fee: booking_fee(event.cost),
        })
    }

    /// Register the caller for an event
    ///
    /// Paid events need a succeeded payment intent for exactly this booking.
    /// The confirmation email is sent in the background.
    pub async fn register(
        &self,
        event_id: i64,
        user_id: &str,
        payment_intent_id: Option<&str>,
    ) -> Result<Event, ApiError> {
        let has_profile = self
            .db
            .get_profile(user_id)
            .await
            .map_err(|e| ApiError::internal("Failed to register", e))?
            .is_some();
        if !has_profile {
            return Err(ApiError::bad_request("Profile required"));
        }

        let event = self.event(event_id).await?;
        if event.has_ended(Utc::now()) {
            return Err(ApiError::bad_request("Cannot register for ended events"));
        }
        if self.is_registered(event_id, user_id).await? {
            return Err(ApiError::bad_request("Already registered for this event"));
        }
        if let Some(capacity) = event.max_participants {
            let count = self
                .db
                .count_participants(event_id)
                .await
                .map_err(|e| ApiError::internal("Failed to register", e))?;
            if count >= i64::from(capacity) {
                return Err(ApiError::bad_request("Event is at capacity"));
            }
        }

        if event.is_paid() {
            self.verify_payment(&event, user_id, payment_intent_id).await?;
        }

        let inserted = self
            .db
            .add_participant(event_id, user_id)
            .await
            .map_err(|e| ApiError::internal("Failed to register", e))?;
        if !inserted {
            return Err(ApiError::bad_request("Already registered for this event"));
        }
        tracing::info!(event_id, user_id, "Registered for event");

        self.send_confirmation(user_id, event.clone());
        Ok(event)
    }

    async fn verify_payment(
        &self,
        event: &Event,
        user_id: &str,
        payment_intent_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let id = payment_intent_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::bad_request("Payment required"))?;

        let intent = self.payments.retrieve_payment_intent(id).await.map_err(|e| {
            tracing::warn!(payment_intent_id = id, error = %e, "Payment intent lookup failed");
            ApiError::bad_request("Invalid payment")
        })?;

        intent
            .verify_booking(event.event_id, user_id, event.cost)
            .map_err(|mismatch| {
                tracing::warn!(
                    payment_intent_id = id,
                    event_id = event.event_id,
                    user_id,
                    ?mismatch,
                    "Payment does not match registration"
                );
                ApiError::bad_request(mismatch.message())
            })
    }

    fn send_confirmation(&self, user_id: &str, event: Event) {
        let db = self.db.clone();
        let mailer = self.mailer.clone();
        let site = self.site.clone();
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            let contact = match db.get_user_contact(&user_id).await {
                Ok(Some(contact)) => contact,
                Ok(None) => {
                    tracing::warn!(user_id = %user_id, "No contact for registration email");
                    return;
                }
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Failed to load contact");
                    return;
                }
            };
            let first_name = contact.first_name.as_deref().unwrap_or("there");
            let email = registration_confirmation(&site, &contact.email, first_name, &event);
            if let Err(e) = mailer.send(&email).await {
                tracing::error!(
                    user_id = %user_id,
                    event_id = event.event_id,
                    error = %e,
                    "Failed to send registration confirmation"
                );
            }
        });
    }

    /// Where a series link should point right now
    pub async fn series_redirect(&self, repeating_event_id: &str) -> Result<SeriesRedirect, ApiError> {
        let upcoming = self
            .db
            .next_in_series(repeating_event_id, Utc::now())
            .await
            .map_err(|e| ApiError::internal("Internal server error", e))?;
        if let Some(id) = upcoming {
            return Ok(SeriesRedirect::Upcoming(id));
        }

        self.db
            .latest_in_series(repeating_event_id)
            .await
            .map_err(|e| ApiError::internal("Internal server error", e))?
            .map(SeriesRedirect::Past)
            .ok_or_else(|| ApiError::not_found("Event series not found"))
    }
}
