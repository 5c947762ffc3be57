//! API Error Responses
//!
//! JSON endpoints answer with `{"error", "code"}`. The webhook endpoint
//! answers in plain text, which is what Stripe's delivery log displays.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pixelfit_billing::PaymentError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(rename = "isPro", skip_serializing_if = "Option::is_none")]
    pub is_pro: Option<bool>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Billing(#[from] PaymentError),

    /// Body or query string could not be decoded
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Billing(PaymentError::MissingField(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Billing(PaymentError::WebhookSignature(_) | PaymentError::WebhookParse(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_WEBHOOK")
            }
            ApiError::Billing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROVIDER_ERROR"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        }
    }

    fn to_body(&self, is_pro: Option<bool>) -> (StatusCode, Json<ErrorResponse>) {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "Request failed");
        } else {
            tracing::debug!(%status, error = %self, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                code,
                is_pro,
            }),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_body(None).into_response()
    }
}

/// Error from the status endpoint; always reports `isPro: false`
#[derive(Debug)]
pub struct ProStatusError(pub ApiError);

impl From<ApiError> for ProStatusError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<PaymentError> for ProStatusError {
    fn from(err: PaymentError) -> Self {
        Self(ApiError::Billing(err))
    }
}

impl IntoResponse for ProStatusError {
    fn into_response(self) -> Response {
        self.0.to_body(Some(false)).into_response()
    }
}

/// Error from the webhook endpoint: 400 with a plain-text body
#[derive(Debug)]
pub struct WebhookError(pub PaymentError);

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self.0, "Webhook rejected");
        (StatusCode::BAD_REQUEST, format!("Webhook Error: {}", self.0)).into_response()
    }
}
