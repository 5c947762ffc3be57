//! Stripe Webhook Handling
//!
//! Verifies the signature, decodes the event into [`EventKind`] and hands it
//! to a [`BillingEventHandler`]. Nothing is stored here; the handler is the
//! extension point for provisioning and notifications.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{PaymentError, Result};
use crate::provider::SubscriptionStatus;
use crate::signature::SignatureVerifier;

/// Checkout finished; the customer should become Pro
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutCompleted {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub subscription_id: Option<String>,
}

/// Subscription updated or deleted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionChanged {
    pub subscription_id: String,
    pub customer_id: Option<String>,
    pub status: SubscriptionStatus,
    pub deleted: bool,
}

/// An invoice payment attempt failed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentFailed {
    pub invoice_id: String,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub subscription_id: Option<String>,
}

/// Trial ends in about three days
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrialEnding {
    pub subscription_id: String,
    pub customer_id: Option<String>,
    pub trial_end: Option<DateTime<Utc>>,
}

/// Event types the relay acts on
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    CheckoutCompleted(CheckoutCompleted),
    SubscriptionChanged(SubscriptionChanged),
    PaymentFailed(PaymentFailed),
    TrialEnding(TrialEnding),
    /// Any other Stripe event type, or a known type whose object could not be
    /// read; acknowledged and ignored
    Unknown { event_type: String },
}

/// Verified, decoded webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookEvent {
    pub id: String,
    pub kind: EventKind,
}

impl WebhookEvent {
    /// Decode a raw event body. The signature must already be verified.
    ///
    /// Only a body that is not a JSON event envelope (no `type`) is an error.
    /// A known event type whose object has an unexpected shape is logged and
    /// downgraded to [`EventKind::Unknown`] so the delivery is still acknowledged.
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        let EventEnvelope { id, event_type, data } =
            serde_json::from_slice(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        let kind = decode_kind(&event_type, data.object).unwrap_or_else(|e| {
            tracing::warn!(
                event_id = %id,
                event_type = %event_type,
                error = %e,
                "Webhook object has unexpected shape, ignoring"
            );
            EventKind::Unknown {
                event_type: event_type.clone(),
            }
        });

        Ok(Self { id, kind })
    }

    /// Stripe event type name
    pub fn event_type(&self) -> &str {
        match &self.kind {
            EventKind::CheckoutCompleted(_) => "checkout.session.completed",
            EventKind::SubscriptionChanged(change) if change.deleted => "customer.subscription.deleted",
            EventKind::SubscriptionChanged(_) => "customer.subscription.updated",
            EventKind::PaymentFailed(_) => "invoice.payment_failed",
            EventKind::TrialEnding(_) => "customer.subscription.trial_will_end",
            EventKind::Unknown { event_type } => event_type.as_str(),
        }
    }
}

fn decode_kind(event_type: &str, object: serde_json::Value) -> serde_json::Result<EventKind> {
    let kind = match event_type {
        "checkout.session.completed" => {
            let session: CheckoutSessionObject = serde_json::from_value(object)?;
            EventKind::CheckoutCompleted(CheckoutCompleted {
                session_id: session.id,
                customer_email: session
                    .customer_email
                    .or_else(|| session.customer_details.and_then(|d| d.email)),
                customer_id: session.customer,
                subscription_id: session.subscription,
            })
        }
        "customer.subscription.updated" | "customer.subscription.deleted" => {
            let sub: SubscriptionObject = serde_json::from_value(object)?;
            EventKind::SubscriptionChanged(SubscriptionChanged {
                subscription_id: sub.id,
                customer_id: sub.customer,
                status: sub.status.unwrap_or(SubscriptionStatus::Unknown),
                deleted: event_type == "customer.subscription.deleted",
            })
        }
        "invoice.payment_failed" => {
            let invoice: InvoiceObject = serde_json::from_value(object)?;
            EventKind::PaymentFailed(PaymentFailed {
                invoice_id: invoice.id,
                customer_id: invoice.customer,
                customer_email: invoice.customer_email,
                subscription_id: invoice.subscription,
            })
        }
        "customer.subscription.trial_will_end" => {
            let sub: SubscriptionObject = serde_json::from_value(object)?;
            EventKind::TrialEnding(TrialEnding {
                subscription_id: sub.id,
                customer_id: sub.customer,
                trial_end: sub.trial_end.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            })
        }
        other => EventKind::Unknown {
            event_type: other.to_string(),
        },
    };
    Ok(kind)
}

#[derive(Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: EventData,
}

#[derive(Default, Deserialize)]
struct EventData {
    #[serde(default)]
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct CheckoutSessionObject {
    #[serde(default)]
    id: String,
    #[serde(default, deserialize_with = "expandable_id")]
    customer: Option<String>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    customer_details: Option<CustomerDetails>,
    #[serde(default, deserialize_with = "expandable_id")]
    subscription: Option<String>,
}

#[derive(Deserialize)]
struct CustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct SubscriptionObject {
    #[serde(default)]
    id: String,
    #[serde(default, deserialize_with = "expandable_id")]
    customer: Option<String>,
    #[serde(default)]
    status: Option<SubscriptionStatus>,
    #[serde(default)]
    trial_end: Option<i64>,
}

#[derive(Deserialize)]
struct InvoiceObject {
    #[serde(default)]
    id: String,
    #[serde(default, deserialize_with = "expandable_id")]
    customer: Option<String>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default, deserialize_with = "expandable_id")]
    subscription: Option<String>,
}

/// Related objects arrive as an ID string, or as the full object when expanded
fn expandable_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(id)) => Some(id),
        Some(serde_json::Value::Object(object)) => object
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned),
        _ => None,
    })
}

/// What the dispatcher did with an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebhookAction {
    GrantAccess,
    RevokeAccess,
    NotifyPaymentFailed,
    NotifyTrialEnding,
    Ignored,
}

/// Extension points for billing lifecycle events.
///
/// Every method defaults to doing nothing. Errors are logged by
/// [`WebhookHandler`] but the event is still acknowledged to Stripe.
#[async_trait]
pub trait BillingEventHandler: Send + Sync {
    /// Checkout completed: mark the customer as subscribed
    async fn grant_access(&self, _event: &CheckoutCompleted) -> Result<()> {
        Ok(())
    }

    /// Subscription canceled or unpaid: revoke Pro access
    async fn revoke_access(&self, _event: &SubscriptionChanged) -> Result<()> {
        Ok(())
    }

    /// Invoice payment failed: tell the user
    async fn notify_payment_failed(&self, _event: &PaymentFailed) -> Result<()> {
        Ok(())
    }

    /// Trial ending soon: remind the user
    async fn notify_trial_ending(&self, _event: &TrialEnding) -> Result<()> {
        Ok(())
    }
}

/// Default handler that only logs
pub struct LoggingEventHandler;

#[async_trait]
impl BillingEventHandler for LoggingEventHandler {
    async fn grant_access(&self, event: &CheckoutCompleted) -> Result<()> {
        tracing::info!(
            session_id = %event.session_id,
            customer_id = ?event.customer_id,
            email = ?event.customer_email,
            "Payment completed"
        );
        Ok(())
    }

    async fn revoke_access(&self, event: &SubscriptionChanged) -> Result<()> {
        tracing::info!(
            subscription_id = %event.subscription_id,
            customer_id = ?event.customer_id,
            status = %event.status,
            "Subscription cancelled/unpaid"
        );
        Ok(())
    }

    async fn notify_payment_failed(&self, event: &PaymentFailed) -> Result<()> {
        tracing::warn!(
            invoice_id = %event.invoice_id,
            customer_id = ?event.customer_id,
            email = ?event.customer_email,
            "Payment failed"
        );
        Ok(())
    }

    async fn notify_trial_ending(&self, event: &TrialEnding) -> Result<()> {
        tracing::info!(
            subscription_id = %event.subscription_id,
            customer_id = ?event.customer_id,
            trial_end = ?event.trial_end,
            "Trial ending soon"
        );
        Ok(())
    }
}

/// Webhook handler
pub struct WebhookHandler {
    verifier: SignatureVerifier,
    events: Arc<dyn BillingEventHandler>,
}

impl WebhookHandler {
    pub fn new(verifier: SignatureVerifier, events: Arc<dyn BillingEventHandler>) -> Self {
        Self { verifier, events }
    }

    /// Verify webhook signature and decode the event
    pub fn parse_event(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent> {
        self.verifier.verify(payload, signature)?;
        WebhookEvent::from_slice(payload)
    }

    /// Route an event to its extension point
    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<WebhookAction> {
        let action = match &event.kind {
            EventKind::CheckoutCompleted(checkout) => {
                self.events.grant_access(checkout).await?;
                WebhookAction::GrantAccess
            }
            EventKind::SubscriptionChanged(change) if change.status.revokes_access() => {
                self.events.revoke_access(change).await?;
                WebhookAction::RevokeAccess
            }
            EventKind::SubscriptionChanged(_) => WebhookAction::Ignored,
            EventKind::PaymentFailed(failure) => {
                self.events.notify_payment_failed(failure).await?;
                WebhookAction::NotifyPaymentFailed
            }
            EventKind::TrialEnding(trial) => {
                self.events.notify_trial_ending(trial).await?;
                WebhookAction::NotifyTrialEnding
            }
            EventKind::Unknown { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                WebhookAction::Ignored
            }
        };
        Ok(action)
    }

    /// Verify, decode and dispatch.
    ///
    /// Only verification and decoding can fail. A failing extension point is
    /// logged and the event still counts as received.
    pub async fn handle(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent> {
        let event = self.parse_event(payload, signature)?;

        tracing::info!(event_id = %event.id, event_type = %event.event_type(), "Processing Stripe webhook");

        match self.dispatch(&event).await {
            Ok(action) => {
                tracing::debug!(event_id = %event.id, action = ?action, "Webhook dispatched");
            }
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type(),
                    error = %e,
                    "Webhook handler failed"
                );
            }
        }

        Ok(event)
    }
}
