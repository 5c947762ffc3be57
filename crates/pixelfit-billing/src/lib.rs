//! # pixelfit-billing
//!
//! Stripe billing for PixelFit Pro: hosted checkout, subscription status,
//! the customer billing portal, and signed webhooks.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  priceId   ┌─────────────────┐  redirect  ┌─────────────┐
//! │  Frontend   │───────────▶│  Stripe Hosted  │───────────▶│  Frontend   │
//! │  (pricing)  │            │  Checkout Page  │            │  /success   │
//! └─────────────┘            └─────────────────┘            └─────────────┘
//!        │                            │
//!        │ GET pro-status             │ webhook (signed)
//!        ▼                            ▼
//! ┌──────────────────────────────────────────────┐
//! │   BillingProvider         WebhookHandler     │
//! │   (StripeClient)     ──▶  BillingEventHandler│
//! └──────────────────────────────────────────────┘
//! ```
//!
//! No subscription state is kept locally. Status is always read back from
//! Stripe, and webhook events are only forwarded to a [`BillingEventHandler`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pixelfit_billing::{CheckoutRequest, RedirectDefaults, StripeClient, create_checkout_session};
//!
//! let stripe = StripeClient::new("sk_test_xxx");
//! let defaults = RedirectDefaults::new("https://pixelfit.io");
//!
//! let response = create_checkout_session(&stripe, &defaults, &CheckoutRequest {
//!     price_id: Some("price_123".into()),
//!     ..Default::default()
//! }).await?;
//!
//! // Frontend calls stripe.redirectToCheckout({ sessionId: response.session_id })
//! ```

mod checkout;
mod error;
mod mock;
mod portal;
mod provider;
mod signature;
mod status;
mod stripe_client;
mod webhook;

pub use checkout::{
    CHECKOUT_SESSION_PLACEHOLDER, CheckoutRequest, CheckoutResponse, RedirectDefaults,
    TRIAL_PERIOD_DAYS, checkout_params, create_checkout_session,
};
pub use error::{PaymentError, Result};
pub use mock::{MockBillingProvider, ProviderCall};
pub use portal::{PortalRequest, PortalResponse, create_portal_session};
pub use provider::{
    BillingProvider, CheckoutParams, CustomerRecord, PaymentMethod, ProviderCheckoutSession,
    ProviderPortalSession, StatusFilter, SubscriptionRecord, SubscriptionStatus,
};
pub use signature::{DEFAULT_TOLERANCE_SECS, SignatureHeader, SignatureVerifier, sign_payload};
pub use status::{ProStatus, ProStatusQuery, ProSubscriptionStatus, check_pro_status};
pub use stripe_client::StripeClient;
pub use webhook::{
    BillingEventHandler, CheckoutCompleted, EventKind, LoggingEventHandler, PaymentFailed,
    SubscriptionChanged, TrialEnding, WebhookAction, WebhookEvent, WebhookHandler,
};
