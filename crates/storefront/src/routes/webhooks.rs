//! Payment processor webhook.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::payments::PaymentError;
use crate::payments::webhook::{SIGNATURE_HEADER, WebhookEvent, verify_signature};
use crate::services::checkout::PaymentEventOutcome;
use crate::state::AppState;

#[derive(Serialize)]
pub struct Ack {
    received: bool,
}

/// Verify and apply a payment event.
///
/// POST /api/payments/webhook
///
/// # Errors
///
/// Returns `AppError::Payment` (400) if the signature or payload is invalid.
#[instrument(skip_all)]
pub async fn payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Ack>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(PaymentError::InvalidSignature("missing signature header"))?;

    let payments = &state.config().payments;
    verify_signature(
        signature,
        &body,
        payments.webhook_secret.expose_secret(),
        payments.webhook_tolerance,
        Utc::now().timestamp(),
    )?;

    let event = WebhookEvent::parse(&body)?;
    let outcome = state
        .checkout()
        .handle_payment_event(&event)
        .await
        .map_err(AppError::from)?;

    if outcome == PaymentEventOutcome::Ignored {
        tracing::debug!(kind = %event.kind, "Webhook event ignored");
    }

    Ok(Json(Ack { received: true }))
}
