//! Billing Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Billing-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// A required request field was absent or empty
    #[error("{}", required_message(.0))]
    MissingField(&'static str),

    /// The billing provider rejected the call or could not be reached.
    ///
    /// Displays the provider's own message unchanged.
    #[error("{0}")]
    Remote(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// An event handler extension point failed
    #[error("Event handler error: {0}")]
    Handler(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PaymentError::MissingField(_)
                | PaymentError::WebhookSignature(_)
                | PaymentError::WebhookParse(_)
        )
    }
}

/// The frontend matches on the pro-status wording
fn required_message(field: &str) -> String {
    match field {
        "email" => "Email required".to_string(),
        other => format!("{other} is required"),
    }
}

impl From<stripe::StripeError> for PaymentError {
    fn from(err: stripe::StripeError) -> Self {
        match err {
            stripe::StripeError::Stripe(request_error) => {
                let message = request_error
                    .message
                    .clone()
                    .unwrap_or_else(|| request_error.to_string());
                PaymentError::Remote(message)
            }
            other => PaymentError::Remote(other.to_string()),
        }
    }
}
