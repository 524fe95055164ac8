//! Operator and kiosk authentication checks
//!
//! Both checks are shared-secret header comparisons; the secrets arrive
//! from the environment at startup. Anything behind /api/admin passes
//! through [`require_admin`] before its handler runs.

use crate::api::server::AppContext;
use crate::error::ErrorBody;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Header carrying the operator password
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Header carrying the kiosk shared secret
pub const KIOSK_SECRET_HEADER: &str = "x-kiosk-secret";

/// Middleware guarding the admin endpoints
pub async fn require_admin(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided != Some(ctx.config.admin_password.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                error: "Unauthorized access".to_string(),
            }),
        )
            .into_response();
    }

    next.run(request).await
}

/// Whether a request carries the configured kiosk secret
pub fn is_authorized_kiosk(headers: &HeaderMap, ctx: &AppContext) -> bool {
    headers
        .get(KIOSK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        == Some(ctx.config.kiosk_secret.as_str())
}
