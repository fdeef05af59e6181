//! Payment intent and verification handlers.
//!
//! Implements intent creation against the configured gateway and the
//! signed-callback verification that drives order settlement.

use anyhow::anyhow;
use axum::{extract::State, Json};

use crate::{
    dtos::{CreateIntentRequest, CreateIntentResponse, VerifyPaymentRequest, VerifyPaymentResponse},
    error::AppError,
    models::{PaymentStatus, RecordVerification},
    services::metrics::{INTENTS_CREATED_TOTAL, VERIFICATIONS_TOTAL},
    AppState,
};

/// Create a payment intent for a checkout amount.
///
/// In live mode this creates a gateway order; in mock mode a synthetic one.
/// Nothing is persisted either way; the ledger only sees the callback.
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, AppError> {
    let amount = payload
        .amount
        .ok_or_else(|| AppError::BadRequest(anyhow!("Amount must be greater than 0")))?;

    tracing::info!(
        amount = %amount,
        currency = %payload.currency,
        "Creating payment intent"
    );

    let intent = state
        .gateway
        .create_intent(amount, &payload.currency, payload.receipt)
        .await?;

    let mode = if state.gateway.is_live() { "live" } else { "mock" };
    INTENTS_CREATED_TOTAL.with_label_values(&[mode]).inc();

    tracing::info!(
        order_id = %intent.intent_id,
        currency = %intent.currency,
        "Payment intent created"
    );

    Ok(Json(CreateIntentResponse {
        order_id: intent.intent_id,
        amount: intent.amount,
        currency: intent.currency,
        status: intent.status,
    }))
}

/// Verify a payment callback and settle the matching order.
///
/// The outcome is appended to the payment ledger whatever it is; a failed
/// verification therefore responds 400 only after the FAILED row is written.
/// Duplicate callbacks re-report the first recorded outcome.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    if payload.gateway_order_id.is_empty()
        || payload.gateway_payment_id.is_empty()
        || payload.signature.is_empty()
        || payload.email.is_empty()
    {
        return Err(AppError::BadRequest(anyhow!(
            "Missing required verification fields"
        )));
    }

    tracing::info!(
        gateway_order_id = %payload.gateway_order_id,
        gateway_payment_id = %payload.gateway_payment_id,
        payer_email = %payload.email,
        "Verifying payment"
    );

    let authentic = state.gateway.verify_signature(
        &payload.gateway_order_id,
        &payload.gateway_payment_id,
        &payload.signature,
    )?;

    let status = if authentic {
        PaymentStatus::Success
    } else {
        PaymentStatus::Failed
    };

    let (record, newly_recorded) = state
        .db
        .record_verification(&RecordVerification {
            gateway_order_id: payload.gateway_order_id,
            gateway_payment_id: payload.gateway_payment_id.clone(),
            signature: payload.signature,
            status,
            amount: payload.amount,
            currency: "INR".to_string(),
            payer_email: payload.email,
        })
        .await?;

    let label = if newly_recorded {
        record.status.as_str()
    } else {
        "duplicate"
    };
    VERIFICATIONS_TOTAL.with_label_values(&[label]).inc();

    // The ledger row is the source of truth for the reported outcome; on a
    // duplicate callback it is the first attempt's row.
    let verified = record.parsed_status() == Some(PaymentStatus::Success);

    tracing::info!(
        record_id = %record.record_id,
        status = %record.status,
        newly_recorded = newly_recorded,
        "Payment verification completed"
    );

    if verified {
        Ok(Json(VerifyPaymentResponse {
            verified: true,
            status: record.status,
            gateway_payment_id: payload.gateway_payment_id,
            message: "Payment verified successfully".to_string(),
        }))
    } else {
        Err(AppError::BadRequest(anyhow!("Payment verification failed")))
    }
}
