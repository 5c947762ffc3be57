//! Mock Billing Provider
//!
//! In-memory `BillingProvider` for tests and local runs without Stripe.
//! Every call is recorded so callers can assert what reached the "remote" API.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{PaymentError, Result};
use crate::provider::{
    BillingProvider, CheckoutParams, CustomerRecord, ProviderCheckoutSession,
    ProviderPortalSession, StatusFilter, SubscriptionRecord, SubscriptionStatus,
};

/// A call that reached the mock provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderCall {
    CreateCheckoutSession(CheckoutParams),
    FindCustomerByEmail(String),
    FindSubscription {
        customer_id: String,
        status: StatusFilter,
    },
    CreatePortalSession {
        customer_id: String,
        return_url: String,
    },
}

/// Mock provider with canned customers and subscriptions
#[derive(Default)]
pub struct MockBillingProvider {
    customers: HashMap<String, CustomerRecord>,
    subscriptions: HashMap<(String, StatusFilter), SubscriptionRecord>,
    failure: Option<String>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer reachable by email
    pub fn with_customer(mut self, email: &str, customer_id: &str) -> Self {
        self.customers.insert(
            email.to_string(),
            CustomerRecord {
                id: customer_id.to_string(),
                email: Some(email.to_string()),
            },
        );
        self
    }

    /// Register a subscription returned for `customer_id` under `filter`
    pub fn with_subscription(mut self, customer_id: &str, filter: StatusFilter) -> Self {
        let status = match filter {
            StatusFilter::Active => SubscriptionStatus::Active,
            StatusFilter::Trialing => SubscriptionStatus::Trialing,
        };
        let record = SubscriptionRecord {
            id: format!("sub_{}_{}", customer_id, filter.as_str()),
            customer_id: customer_id.to_string(),
            status,
        };
        self.subscriptions.insert((customer_id.to_string(), filter), record);
        self
    }

    /// Make every call fail with `message`, as Stripe would on a bad request
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Calls received so far, in order
    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: ProviderCall) -> Result<()> {
        self.calls.lock().await.push(call);
        match &self.failure {
            Some(message) => Err(PaymentError::Remote(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn create_checkout_session(&self, params: &CheckoutParams) -> Result<ProviderCheckoutSession> {
        self.record(ProviderCall::CreateCheckoutSession(params.clone())).await?;
        let id = format!("cs_test_{}", params.price_id);
        Ok(ProviderCheckoutSession {
            url: Some(format!("https://checkout.stripe.com/c/pay/{id}")),
            id,
        })
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<CustomerRecord>> {
        self.record(ProviderCall::FindCustomerByEmail(email.to_string())).await?;
        Ok(self.customers.get(email).cloned())
    }

    async fn find_subscription(
        &self,
        customer_id: &str,
        status: StatusFilter,
    ) -> Result<Option<SubscriptionRecord>> {
        self.record(ProviderCall::FindSubscription {
            customer_id: customer_id.to_string(),
            status,
        })
        .await?;
        Ok(self
            .subscriptions
            .get(&(customer_id.to_string(), status))
            .cloned())
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<ProviderPortalSession> {
        self.record(ProviderCall::CreatePortalSession {
            customer_id: customer_id.to_string(),
            return_url: return_url.to_string(),
        })
        .await?;
        Ok(ProviderPortalSession {
            id: format!("bps_test_{customer_id}"),
            url: format!("https://billing.stripe.com/p/session/{customer_id}"),
        })
    }

    fn name(&self) -> &str {
        "MockBilling"
    }
}
