//! Application State

use std::sync::Arc;

use pixelfit_billing::{
    BillingEventHandler, BillingProvider, LoggingEventHandler, RedirectDefaults, SignatureVerifier,
    StripeClient, WebhookHandler,
};

use crate::config::ServerConfig;
use crate::origin::AllowedOrigins;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Immutable startup configuration
    pub config: Arc<ServerConfig>,

    /// Billing provider (Stripe in production)
    pub provider: Arc<dyn BillingProvider>,

    /// Default redirect targets derived from `FRONTEND_URL`
    pub redirects: Arc<RedirectDefaults>,

    /// Browser origins allowed past the origin guard
    pub origins: Arc<AllowedOrigins>,

    /// Signature verification and event dispatch
    pub webhooks: Arc<WebhookHandler>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        provider: Arc<dyn BillingProvider>,
        events: Arc<dyn BillingEventHandler>,
    ) -> Self {
        let redirects = RedirectDefaults::new(config.frontend_url.clone());
        let verifier = SignatureVerifier::new(config.stripe_webhook_secret.clone());
        let origins = AllowedOrigins::new(&config.allowed_origins);

        Self {
            config: Arc::new(config),
            provider,
            redirects: Arc::new(redirects),
            origins: Arc::new(origins),
            webhooks: Arc::new(WebhookHandler::new(verifier, events)),
        }
    }

    /// Production wiring: Stripe client and logging extension points
    pub fn with_stripe(config: ServerConfig) -> Self {
        let stripe = Arc::new(StripeClient::new(&config.stripe_secret_key));
        Self::new(config, stripe, Arc::new(LoggingEventHandler))
    }
}
