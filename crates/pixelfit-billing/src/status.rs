//! Pro Status Lookup
//!
//! Answers "is this email a paying (or trialing) subscriber?" straight from
//! Stripe. Nothing is cached; the frontend calls this on page load.

use serde::{Deserialize, Serialize};

use crate::checkout::non_empty;
use crate::error::{PaymentError, Result};
use crate::provider::{BillingProvider, StatusFilter};

/// Query for the status endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProStatusQuery {
    #[serde(default)]
    pub email: Option<String>,
}

/// Subscription state reported to the frontend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProSubscriptionStatus {
    Active,
    Trialing,
    None,
}

impl From<StatusFilter> for ProSubscriptionStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Active => ProSubscriptionStatus::Active,
            StatusFilter::Trialing => ProSubscriptionStatus::Trialing,
        }
    }
}

/// Result of a status lookup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProStatus {
    pub is_pro: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub subscription_status: ProSubscriptionStatus,
}

impl ProStatus {
    fn not_pro(customer_id: Option<String>) -> Self {
        Self {
            is_pro: false,
            customer_id,
            subscription_status: ProSubscriptionStatus::None,
        }
    }
}

/// Look up whether `email` holds an active or trialing subscription.
///
/// Only the first customer Stripe returns for the email is considered.
/// An unknown email is not an error: it yields `isPro: false`.
pub async fn check_pro_status(provider: &dyn BillingProvider, query: &ProStatusQuery) -> Result<ProStatus> {
    let email = non_empty(query.email.as_deref()).ok_or(PaymentError::MissingField("email"))?;

    let Some(customer) = provider.find_customer_by_email(email).await? else {
        tracing::debug!(email = %email, "No customer for email");
        return Ok(ProStatus::not_pro(None));
    };

    let active = provider
        .find_subscription(&customer.id, StatusFilter::Active)
        .await?;
    let trialing = provider
        .find_subscription(&customer.id, StatusFilter::Trialing)
        .await?;

    let found = match (active, trialing) {
        (Some(_), _) => Some(StatusFilter::Active),
        (None, Some(_)) => Some(StatusFilter::Trialing),
        (None, None) => None,
    };

    let status = match found {
        Some(filter) => ProStatus {
            is_pro: true,
            customer_id: Some(customer.id),
            subscription_status: filter.into(),
        },
        None => ProStatus::not_pro(Some(customer.id)),
    };

    tracing::info!(
        customer_id = ?status.customer_id,
        is_pro = status.is_pro,
        status = ?status.subscription_status,
        "Checked pro status"
    );

    Ok(status)
}
