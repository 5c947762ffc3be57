//! Stripe Checkout Integration
//!
//! Hosted checkout for the Pro subscription: the frontend posts a price ID,
//! we ask Stripe for a session and hand back its ID for `redirectToCheckout`.

use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};
use crate::provider::{BillingProvider, CheckoutParams, PaymentMethod};

/// Free trial granted on every new subscription
pub const TRIAL_PERIOD_DAYS: u32 = 7;

/// Placeholder Stripe replaces with the real session ID on redirect
pub const CHECKOUT_SESSION_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Redirect targets used when the frontend does not supply its own
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectDefaults {
    frontend_url: String,
}

impl RedirectDefaults {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        let frontend_url = frontend_url.into();
        Self {
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn frontend_url(&self) -> &str {
        &self.frontend_url
    }

    pub fn success_url(&self) -> String {
        format!("{}/success?session_id={}", self.frontend_url, CHECKOUT_SESSION_PLACEHOLDER)
    }

    pub fn cancel_url(&self) -> String {
        self.frontend_url.clone()
    }

    pub fn portal_return_url(&self) -> String {
        self.frontend_url.clone()
    }
}

/// Request to create a checkout session
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Stripe price to subscribe to
    #[serde(default)]
    pub price_id: Option<String>,

    /// URL to redirect after successful payment
    #[serde(default)]
    pub success_url: Option<String>,

    /// URL to redirect if checkout is cancelled
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
}

/// Treat `""` the same as an absent field
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Build the provider parameters for a checkout request.
///
/// Fails without side effects when `priceId` is missing.
pub fn checkout_params(request: &CheckoutRequest, defaults: &RedirectDefaults) -> Result<CheckoutParams> {
    let price_id = non_empty(request.price_id.as_deref()).ok_or(PaymentError::MissingField("priceId"))?;

    Ok(CheckoutParams {
        price_id: price_id.to_string(),
        quantity: 1,
        payment_methods: vec![PaymentMethod::Card],
        trial_period_days: TRIAL_PERIOD_DAYS,
        allow_promotion_codes: true,
        success_url: non_empty(request.success_url.as_deref())
            .map_or_else(|| defaults.success_url(), str::to_string),
        cancel_url: non_empty(request.cancel_url.as_deref())
            .map_or_else(|| defaults.cancel_url(), str::to_string),
    })
}

/// Create a subscription checkout session
pub async fn create_checkout_session(
    provider: &dyn BillingProvider,
    defaults: &RedirectDefaults,
    request: &CheckoutRequest,
) -> Result<CheckoutResponse> {
    let params = checkout_params(request, defaults)?;

    let session = provider.create_checkout_session(&params).await.inspect_err(|e| {
        tracing::error!(price_id = %params.price_id, error = %e, "Checkout session error");
    })?;

    tracing::info!(
        session_id = %session.id,
        price_id = %params.price_id,
        provider = provider.name(),
        "Created checkout session"
    );

    Ok(CheckoutResponse { session_id: session.id })
}
