//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::HeaderMap,
};
use pixelfit_billing::{
    CheckoutRequest, CheckoutResponse, PaymentError, PortalRequest, PortalResponse, ProStatus,
    ProStatusQuery, check_pro_status, create_checkout_session, create_portal_session,
};
use serde::Serialize;

use crate::error::{ApiError, ProStatusError, WebhookError};
use crate::state::AppState;

/// Header Stripe signs webhook deliveries with
pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

fn bad_json(rejection: &JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "PixelFit API running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Create Stripe checkout session
pub async fn create_checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| bad_json(&e))?;

    let response = create_checkout_session(state.provider.as_ref(), &state.redirects, &request).await?;

    Ok(Json(response))
}

/// Report whether an email holds an active or trialing subscription
pub async fn pro_status(
    State(state): State<AppState>,
    query: Result<Query<ProStatusQuery>, QueryRejection>,
) -> Result<Json<ProStatus>, ProStatusError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let status = check_pro_status(state.provider.as_ref(), &query).await?;

    Ok(Json(status))
}

/// Create Stripe billing portal session
pub async fn create_portal(
    State(state): State<AppState>,
    payload: Result<Json<PortalRequest>, JsonRejection>,
) -> Result<Json<PortalResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| bad_json(&e))?;

    let response = create_portal_session(state.provider.as_ref(), &state.redirects, &request).await?;

    Ok(Json(response))
}

/// Stripe webhook handler
///
/// The body is taken as raw bytes: the signature covers the exact payload.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            WebhookError(PaymentError::WebhookSignature(
                "No stripe-signature header value was provided".into(),
            ))
        })?;

    state
        .webhooks
        .handle(&body, signature)
        .await
        .map_err(WebhookError)?;

    Ok(Json(WebhookAck { received: true }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use pixelfit_billing::{
        LoggingEventHandler, MockBillingProvider, ProviderCall, StatusFilter, sign_payload,
    };
    use tower::ServiceExt;

    use crate::config::ServerConfig;
    use crate::routes::build_router;
    use crate::state::AppState;

    const WEBHOOK_SECRET: &str = "whsec_test_secret";

    fn test_config() -> ServerConfig {
        ServerConfig::from_lookup(|name| match name {
            "STRIPE_SECRET_KEY" => Some("sk_test_fake".into()),
            "STRIPE_WEBHOOK_SECRET" => Some(WEBHOOK_SECRET.into()),
            "FRONTEND_URL" => Some("https://pixelfit.io".into()),
            _ => None,
        })
        .unwrap()
    }

    fn test_app(provider: Arc<MockBillingProvider>) -> Router {
        let state = AppState::new(test_config(), provider, Arc::new(LoggingEventHandler));
        build_router(state)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text_body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_version() {
        let app = test_app(Arc::new(MockBillingProvider::new()));

        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "PixelFit API running");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn checkout_rejects_missing_price_id() {
        let provider = Arc::new(MockBillingProvider::new());
        let app = test_app(provider.clone());

        let response = app
            .oneshot(post_json("/api/create-checkout-session", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "priceId is required");
        assert!(provider.calls().await.is_empty());
    }

    #[tokio::test]
    async fn checkout_uses_frontend_defaults() {
        let provider = Arc::new(MockBillingProvider::new());
        let app = test_app(provider.clone());

        let response = app
            .oneshot(post_json(
                "/api/create-checkout-session",
                serde_json::json!({"priceId": "price_123"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"sessionId": "cs_test_price_123"})
        );

        let calls = provider.calls().await;
        let [ProviderCall::CreateCheckoutSession(params)] = calls.as_slice() else {
            panic!("unexpected calls: {calls:?}");
        };
        assert_eq!(
            params.success_url,
            "https://pixelfit.io/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(params.cancel_url, "https://pixelfit.io");
    }

    #[tokio::test]
    async fn checkout_provider_error_is_500() {
        let provider = Arc::new(MockBillingProvider::new().failing("No such price: 'price_bad'"));
        let app = test_app(provider);

        let response = app
            .oneshot(post_json(
                "/api/create-checkout-session",
                serde_json::json!({"priceId": "price_bad"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "No such price: 'price_bad'");
    }

    #[tokio::test]
    async fn checkout_malformed_body_is_json_400() {
        let app = test_app(Arc::new(MockBillingProvider::new()));

        let request = Request::builder()
            .method("POST")
            .uri("/api/create-checkout-session")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn pro_status_rejects_missing_email() {
        let provider = Arc::new(MockBillingProvider::new());
        let app = test_app(provider.clone());

        let response = app.oneshot(get("/api/pro-status")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["isPro"], false);
        assert_eq!(body["error"], "Email required");
        assert!(provider.calls().await.is_empty());
    }

    #[tokio::test]
    async fn pro_status_active_customer() {
        let provider = Arc::new(
            MockBillingProvider::new()
                .with_customer("pro@example.com", "cus_pro")
                .with_subscription("cus_pro", StatusFilter::Active),
        );
        let app = test_app(provider);

        let response = app
            .oneshot(get("/api/pro-status?email=pro%40example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({
                "isPro": true,
                "customerId": "cus_pro",
                "subscriptionStatus": "active"
            })
        );
    }

    #[tokio::test]
    async fn pro_status_unknown_email() {
        let app = test_app(Arc::new(MockBillingProvider::new()));

        let response = app
            .oneshot(get("/api/pro-status?email=nobody@example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["isPro"], false);
        assert!(body.get("customerId").is_none());
    }

    #[tokio::test]
    async fn pro_status_provider_error() {
        let provider = Arc::new(MockBillingProvider::new().failing("Invalid API Key provided"));
        let app = test_app(provider);

        let response = app
            .oneshot(get("/api/pro-status?email=pro@example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["isPro"], false);
        assert_eq!(body["error"], "Invalid API Key provided");
    }

    #[tokio::test]
    async fn portal_returns_url() {
        let provider = Arc::new(MockBillingProvider::new());
        let app = test_app(provider.clone());

        let response = app
            .oneshot(post_json(
                "/api/create-portal-session",
                serde_json::json!({"customerId": "cus_123", "returnUrl": "https://pixelfit.io/account"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["url"],
            "https://billing.stripe.com/p/session/cus_123"
        );
        assert_eq!(
            provider.calls().await,
            vec![ProviderCall::CreatePortalSession {
                customer_id: "cus_123".into(),
                return_url: "https://pixelfit.io/account".into(),
            }]
        );
    }

    #[tokio::test]
    async fn webhook_rejects_missing_signature() {
        let app = test_app(Arc::new(MockBillingProvider::new()));

        let response = app
            .oneshot(post_json("/api/webhook", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(text_body(response).await.starts_with("Webhook Error:"));
    }

    #[tokio::test]
    async fn webhook_rejects_bad_signature() {
        let app = test_app(Arc::new(MockBillingProvider::new()));

        let request = Request::builder()
            .method("POST")
            .uri("/api/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("stripe-signature", "t=123,v1=badsig")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(text_body(response).await.starts_with("Webhook Error:"));
    }

    #[tokio::test]
    async fn webhook_acknowledges_unknown_event() {
        let provider = Arc::new(MockBillingProvider::new());
        let app = test_app(provider.clone());

        let payload = serde_json::json!({
            "id": "evt_test",
            "object": "event",
            "type": "account.external_account.created",
            "data": { "object": { "id": "ba_test", "object": "bank_account" } }
        })
        .to_string();
        let signature = sign_payload(payload.as_bytes(), WEBHOOK_SECRET).unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("stripe-signature", signature)
            .body(Body::from(payload))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({"received": true}));
        assert!(provider.calls().await.is_empty());
    }

    #[tokio::test]
    async fn blocked_origin_never_reaches_handler() {
        let provider = Arc::new(MockBillingProvider::new());
        let app = test_app(provider.clone());

        let request = Request::builder()
            .method("POST")
            .uri("/api/create-checkout-session")
            .header(header::ORIGIN, "https://evil.example")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"priceId":"price_123"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(text_body(response).await, "CORS blocked: https://evil.example");
        assert!(provider.calls().await.is_empty());
    }

    #[tokio::test]
    async fn allowed_origin_gets_credential_headers() {
        let app = test_app(Arc::new(MockBillingProvider::new()));

        let request = Request::builder()
            .uri("/")
            .header(header::ORIGIN, "https://pixelfit.io")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://pixelfit.io"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn request_without_origin_is_allowed() {
        let app = test_app(Arc::new(MockBillingProvider::new()));

        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn webhook_acknowledges_signed_event_with_unexpected_shape() {
        let app = test_app(Arc::new(MockBillingProvider::new()));

        let payload = serde_json::json!({
            "type": "customer.subscription.deleted",
            "data": { "object": { "id": "sub_1", "customer": { "id": "cus_1" }, "status": 7 } }
        })
        .to_string();
        let signature = sign_payload(payload.as_bytes(), WEBHOOK_SECRET).unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("stripe-signature", signature)
            .body(Body::from(payload))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({"received": true}));
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin_mirrors_request() {
        let provider = Arc::new(MockBillingProvider::new());
        let app = test_app(provider.clone());

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/create-checkout-session")
            .header(header::ORIGIN, "https://pixelfit.io")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://pixelfit.io"
        );
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "POST");
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            "content-type"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
        assert!(provider.calls().await.is_empty());
    }

    #[tokio::test]
    async fn preflight_from_blocked_origin_is_forbidden() {
        let app = test_app(Arc::new(MockBillingProvider::new()));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/create-checkout-session")
            .header(header::ORIGIN, "https://evil.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(text_body(response).await, "CORS blocked: https://evil.example");
    }
}
