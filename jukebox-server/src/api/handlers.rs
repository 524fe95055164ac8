//! HTTP request handlers
//!
//! Implements the REST endpoints for the request/queue API. Handlers
//! validate the boundary (headers, payload shape) and delegate to the
//! queue core; all store mutation lives behind those calls.

use crate::api::auth;
use crate::api::server::AppContext;
use crate::error::{Error, ErrorBody};
use crate::queue::admission::{self, AdmitRequest};
use crate::queue::navigator;
use crate::queue::payment::{self, PaymentConfirmation};
use crate::db;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jukebox_common::db::models::{PartyState, QueueEntry, Song};
use jukebox_common::signature;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Header carrying the payment webhook signature
pub const PAYMENT_SIGNATURE_HEADER: &str = "x-payment-signature";

/// Webhook event type that triggers an admission
const PAYMENT_CONFIRMED_EVENT: &str = "payment.confirmed";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRequest {
    song_id: String,
    user_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    status: String,
    entry: QueueEntry,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    kiosk_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    entry_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewindResponse {
    status: String,
    entry: QueueEntry,
}

#[derive(Debug, Deserialize)]
pub struct RefillRequest {
    amount: i64,
}

#[derive(Debug, Serialize)]
pub struct RefillResponse {
    status: String,
    credits: i64,
}

/// Envelope delivered by the payment provider
#[derive(Debug, Deserialize)]
pub struct PaymentEventEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: PaymentEventData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEventData {
    song_id: String,
    user_name: String,
    #[serde(default)]
    amount_paid_cents: i64,
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "jukebox-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Read Endpoints
// ============================================================================

/// GET /api/library - Full song catalog
pub async fn get_library(State(ctx): State<AppContext>) -> Result<Json<Vec<Song>>, Error> {
    let songs = db::library::list_songs(&ctx.db_pool).await?;
    Ok(Json(songs))
}

/// GET /api/queue - Full queue in playback order
pub async fn get_queue(State(ctx): State<AppContext>) -> Result<Json<Vec<QueueEntry>>, Error> {
    let entries = db::queue::list_all(&ctx.db_pool).await?;
    Ok(Json(entries))
}

/// GET /api/party - Current party state
pub async fn get_party(State(ctx): State<AppContext>) -> Result<Json<PartyState>, Error> {
    let state = db::party::get_party_state(&ctx.db_pool).await?;
    Ok(Json(state))
}

// ============================================================================
// Admission Endpoints
// ============================================================================

/// POST /api/request - Kiosk admission (uses the physical ticket pool)
pub async fn kiosk_request(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<SongRequest>,
) -> Response {
    if !auth::is_authorized_kiosk(&headers, &ctx) {
        warn!("Kiosk request rejected: bad or missing kiosk secret");
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorBody {
                error: "Forbidden: Not an authorized kiosk".to_string(),
            }),
        )
            .into_response();
    }

    match admission::admit(&ctx.db_pool, &AdmitRequest::kiosk(req.song_id, req.user_name)).await {
        Ok(entry) => Json(RequestResponse {
            status: "queued".to_string(),
            entry,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

/// POST /api/request/emergency - Unauthenticated bypass admission
///
/// No credit check and no secret; entries are tagged `emergency` so the
/// bypass stays visible in the queue history.
pub async fn emergency_request(
    State(ctx): State<AppContext>,
    Json(req): Json<SongRequest>,
) -> Result<Json<RequestResponse>, Error> {
    let entry = admission::admit(
        &ctx.db_pool,
        &AdmitRequest::emergency(req.song_id, req.user_name),
    )
    .await?;

    Ok(Json(RequestResponse {
        status: "queued".to_string(),
        entry,
    }))
}

/// POST /api/payments/webhook - Payment provider callback
///
/// Deliveries are at-least-once: the idempotent core makes redeliveries
/// no-ops, and only transient failures return a retryable status. A
/// verified event with a bad song id still answers 200: the charge
/// already succeeded and retrying cannot fix the id.
pub async fn payment_webhook(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let provided = headers
        .get(PAYMENT_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let Some(provided) = provided else {
        warn!("Webhook rejected: missing signature header");
        return StatusCode::BAD_REQUEST.into_response();
    };

    if signature::verify(provided, &body, &ctx.config.webhook_secret).is_err() {
        warn!("Webhook signature verification failed");
        return StatusCode::BAD_REQUEST.into_response();
    }

    let event: PaymentEventEnvelope = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!("Webhook payload parse error: {}", err);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if event.event_type != PAYMENT_CONFIRMED_EVENT {
        info!("Ignoring webhook event type '{}'", event.event_type);
        return Json(StatusResponse {
            status: "ignored".to_string(),
        })
        .into_response();
    }

    info!(
        "Payment received: event {}, song {}, user {}, {} cents",
        event.id, event.data.song_id, event.data.user_name, event.data.amount_paid_cents
    );

    let confirmation = PaymentConfirmation {
        event_id: event.id,
        song_id: event.data.song_id,
        user_name: event.data.user_name,
    };

    match payment::on_payment_confirmed(&ctx.db_pool, &confirmation).await {
        // Duplicate and unknown-song outcomes are logged by the core and
        // acknowledged here so the provider stops redelivering
        Ok(_) => Json(StatusResponse {
            status: "ok".to_string(),
        })
        .into_response(),
        Err(err) => {
            tracing::error!("Webhook processing failed (provider will retry): {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ============================================================================
// Operator Endpoints
// ============================================================================

/// POST /api/auth/verify - Operator password check
///
/// A valid password returns the kiosk secret so an operator can
/// provision kiosk devices.
pub async fn verify_password(
    State(ctx): State<AppContext>,
    Json(req): Json<VerifyRequest>,
) -> (StatusCode, Json<VerifyResponse>) {
    if req.password == ctx.config.admin_password {
        (
            StatusCode::OK,
            Json(VerifyResponse {
                valid: true,
                kiosk_secret: Some(ctx.config.kiosk_secret.clone()),
            }),
        )
    } else {
        warn!("Operator password verification failed");
        (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse {
                valid: false,
                kiosk_secret: None,
            }),
        )
    }
}

/// POST /api/admin/next - Mark an entry played and move the position
pub async fn next_song(
    State(ctx): State<AppContext>,
    Json(req): Json<AdvanceRequest>,
) -> Result<Json<StatusResponse>, Error> {
    navigator::advance(&ctx.db_pool, req.entry_id).await?;

    Ok(Json(StatusResponse {
        status: "Advanced to next song".to_string(),
    }))
}

/// POST /api/admin/previous - Restore the previous song
pub async fn previous_song(
    State(ctx): State<AppContext>,
) -> Result<Json<RewindResponse>, Error> {
    let entry = navigator::rewind(&ctx.db_pool).await?;

    Ok(Json(RewindResponse {
        status: "Reverted".to_string(),
        entry,
    }))
}

/// POST /api/admin/refill - Add credits to the shared balance
pub async fn refill(
    State(ctx): State<AppContext>,
    Json(req): Json<RefillRequest>,
) -> Result<Json<RefillResponse>, Error> {
    let credits = navigator::refill(&ctx.db_pool, req.amount).await?;

    Ok(Json(RefillResponse {
        status: "Credits added".to_string(),
        credits,
    }))
}
