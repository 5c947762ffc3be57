//! Billing Provider Strategy
//!
//! Every remote call the relay makes goes through [`BillingProvider`], so the
//! handlers never talk to Stripe directly and tests can swap in
//! [`MockBillingProvider`](crate::MockBillingProvider).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Payment methods a checkout session may accept
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
}

/// Parameters for a subscription-mode checkout session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutParams {
    pub price_id: String,
    pub quantity: u64,
    pub payment_methods: Vec<PaymentMethod>,
    pub trial_period_days: u32,
    pub allow_promotion_codes: bool,
    pub success_url: String,
    pub cancel_url: String,
}

/// A checkout session issued by the provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// A billing portal session issued by the provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderPortalSession {
    pub id: String,
    pub url: String,
}

/// Customer record, reduced to what the relay reads
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: String,
    pub email: Option<String>,
}

/// Subscription lifecycle status as reported by Stripe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Paused,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Unknown => "unknown",
        }
    }

    /// Parse Stripe's wire name; unrecognised names map to `Unknown`
    pub fn from_provider(s: &str) -> Self {
        match s {
            "incomplete" => SubscriptionStatus::Incomplete,
            "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
            "trialing" => SubscriptionStatus::Trialing,
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "unpaid" => SubscriptionStatus::Unpaid,
            "paused" => SubscriptionStatus::Paused,
            _ => SubscriptionStatus::Unknown,
        }
    }

    /// Statuses that end a customer's Pro access
    pub fn revokes_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled | SubscriptionStatus::Unpaid)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status filters the relay queries subscriptions by
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    Active,
    Trialing,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::Active => "active",
            StatusFilter::Trialing => "trialing",
        }
    }
}

/// Subscription record, reduced to what the relay reads
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
}

/// Remote billing API used by every relay operation
///
/// Implementations must not retry; a failed call surfaces as
/// [`PaymentError::Remote`](crate::PaymentError::Remote).
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Create a hosted checkout session
    async fn create_checkout_session(&self, params: &CheckoutParams) -> Result<ProviderCheckoutSession>;

    /// First customer registered with `email`, if any
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<CustomerRecord>>;

    /// First subscription of `customer_id` in the given status, if any
    async fn find_subscription(
        &self,
        customer_id: &str,
        status: StatusFilter,
    ) -> Result<Option<SubscriptionRecord>>;

    /// Create a hosted billing portal session
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<ProviderPortalSession>;

    /// Provider name for logs
    fn name(&self) -> &str;
}
