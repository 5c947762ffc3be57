//! Stripe Integration
//!
//! `BillingProvider` backed by the Stripe REST API via `async-stripe`.

use async_trait::async_trait;
use stripe::{
    BillingPortalSession, CheckoutSession, CheckoutSessionMode, Client,
    CreateBillingPortalSession, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionPaymentMethodTypes, CreateCheckoutSessionSubscriptionData, Customer,
    CustomerId, ListCustomers, ListSubscriptions, Subscription, SubscriptionStatusFilter,
};

use crate::error::{PaymentError, Result};
use crate::provider::{
    BillingProvider, CheckoutParams, CustomerRecord, PaymentMethod, ProviderCheckoutSession,
    ProviderPortalSession, StatusFilter, SubscriptionRecord, SubscriptionStatus,
};

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Get the underlying Stripe client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// async-stripe needs a typed ID, so a malformed one fails before any request is sent
    fn parse_customer_id(customer_id: &str) -> Result<CustomerId> {
        customer_id.parse::<CustomerId>().map_err(|e| {
            PaymentError::Remote(format!(
                "Customer ID '{customer_id}' rejected before contacting Stripe: {e}"
            ))
        })
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn create_checkout_session(&self, params: &CheckoutParams) -> Result<ProviderCheckoutSession> {
        let mut session_params = CreateCheckoutSession::new();
        session_params.mode = Some(CheckoutSessionMode::Subscription);
        session_params.success_url = Some(&params.success_url);
        session_params.cancel_url = Some(&params.cancel_url);
        session_params.allow_promotion_codes = Some(params.allow_promotion_codes);

        session_params.payment_method_types = Some(
            params
                .payment_methods
                .iter()
                .map(|method| match method {
                    PaymentMethod::Card => CreateCheckoutSessionPaymentMethodTypes::Card,
                })
                .collect(),
        );

        session_params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(params.price_id.clone()),
            quantity: Some(params.quantity),
            ..Default::default()
        }]);

        session_params.subscription_data = Some(CreateCheckoutSessionSubscriptionData {
            trial_period_days: Some(params.trial_period_days),
            ..Default::default()
        });

        let session = CheckoutSession::create(&self.client, session_params).await?;

        Ok(ProviderCheckoutSession {
            id: session.id.to_string(),
            url: session.url,
        })
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<CustomerRecord>> {
        let mut list_params = ListCustomers::new();
        list_params.email = Some(email);
        list_params.limit = Some(1);

        let customers = Customer::list(&self.client, &list_params).await?;

        Ok(customers.data.into_iter().next().map(|customer| CustomerRecord {
            id: customer.id.to_string(),
            email: customer.email,
        }))
    }

    async fn find_subscription(
        &self,
        customer_id: &str,
        status: StatusFilter,
    ) -> Result<Option<SubscriptionRecord>> {
        let mut list_params = ListSubscriptions::new();
        list_params.customer = Some(Self::parse_customer_id(customer_id)?);
        list_params.status = Some(match status {
            StatusFilter::Active => SubscriptionStatusFilter::Active,
            StatusFilter::Trialing => SubscriptionStatusFilter::Trialing,
        });
        list_params.limit = Some(1);

        let subscriptions = Subscription::list(&self.client, &list_params).await?;

        Ok(subscriptions.data.into_iter().next().map(|sub| SubscriptionRecord {
            id: sub.id.to_string(),
            customer_id: sub.customer.id().to_string(),
            status: SubscriptionStatus::from_provider(sub.status.as_str()),
        }))
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<ProviderPortalSession> {
        let mut portal_params = CreateBillingPortalSession::new(Self::parse_customer_id(customer_id)?);
        portal_params.return_url = Some(return_url);

        let session = BillingPortalSession::create(&self.client, portal_params).await?;

        Ok(ProviderPortalSession {
            id: session.id.to_string(),
            url: session.url,
        })
    }

    fn name(&self) -> &str {
        "Stripe"
    }
}
