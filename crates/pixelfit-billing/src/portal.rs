//! Billing Portal
//!
//! Lets Pro users manage or cancel their subscription on Stripe's hosted page.

use serde::{Deserialize, Serialize};

use crate::checkout::{RedirectDefaults, non_empty};
use crate::error::Result;
use crate::provider::BillingProvider;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub return_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortalResponse {
    pub url: String,
}

/// Create a billing portal session.
///
/// The customer ID is forwarded as-is; a bad or missing one comes back as a
/// provider error.
pub async fn create_portal_session(
    provider: &dyn BillingProvider,
    defaults: &RedirectDefaults,
    request: &PortalRequest,
) -> Result<PortalResponse> {
    let customer_id = request.customer_id.as_deref().unwrap_or_default();
    let return_url = non_empty(request.return_url.as_deref())
        .map_or_else(|| defaults.portal_return_url(), str::to_string);

    let session = provider
        .create_portal_session(customer_id, &return_url)
        .await
        .inspect_err(|e| {
            tracing::error!(customer_id = %customer_id, error = %e, "Portal session error");
        })?;

    tracing::info!(customer_id = %customer_id, session_id = %session.id, "Created portal session");

    Ok(PortalResponse { url: session.url })
}
