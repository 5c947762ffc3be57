//! Origin Guard
//!
//! Browsers must come from an allow-listed origin; requests without an
//! `Origin` header (curl, mobile apps, Stripe itself) pass through.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header::ORIGIN},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::state::AppState;

/// Parsed allow-list of browser origins
#[derive(Clone, Debug)]
pub struct AllowedOrigins {
    origins: Vec<HeaderValue>,
}

impl AllowedOrigins {
    pub fn new<S: AsRef<str>>(origins: &[S]) -> Self {
        Self {
            origins: origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o.as_ref()).ok())
                .collect(),
        }
    }

    pub fn is_allowed(&self, origin: &HeaderValue) -> bool {
        self.origins.iter().any(|allowed| allowed == origin)
    }

    /// CORS headers for allowed origins, with credentials
    pub fn cors_layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.origins.clone()))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }
}

/// Reject requests from origins outside the allow-list before any handler runs
pub async fn origin_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(origin) = request.headers().get(ORIGIN) {
        if !state.origins.is_allowed(origin) {
            let origin = String::from_utf8_lossy(origin.as_bytes()).into_owned();
            tracing::warn!(origin = %origin, path = %request.uri().path(), "CORS blocked");
            return (StatusCode::FORBIDDEN, format!("CORS blocked: {origin}")).into_response();
        }
    }

    next.run(request).await
}
