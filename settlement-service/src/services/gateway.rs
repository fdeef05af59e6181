//! Razorpay payment gateway client and the mock fallback.
//!
//! Implements Razorpay's Orders API for payment initiation and
//! signature verification for payment confirmation. Which of the two
//! variants a process uses is decided once, at startup, from the
//! configured credentials.

use crate::config::GatewayConfig;
use crate::error::AppError;
use anyhow::{anyhow, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// A provisional payment awaiting completion on the gateway's side.
///
/// Not persisted here; the ledger only sees the signed callback later.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub intent_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
}

/// The gateway capability handed to every caller.
///
/// Selected once from [`GatewayConfig`] in `Application::build`; callers
/// invoke it without ever re-checking credentials, so mock and live
/// behavior can never disagree within one process.
#[derive(Clone)]
pub enum PaymentGateway {
    Live(RazorpayClient),
    Mock,
}

impl PaymentGateway {
    /// Select the gateway mode for this process.
    pub fn from_config(config: &GatewayConfig) -> Self {
        if config.has_live_credentials() {
            PaymentGateway::Live(RazorpayClient::new(config.clone()))
        } else {
            PaymentGateway::Mock
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, PaymentGateway::Live(_))
    }

    /// Create a payment intent for a checkout amount.
    ///
    /// Live mode creates a Razorpay order for the amount in minor units and
    /// returns the gateway's order id, currency and status verbatim. Mock
    /// mode synthesizes an `order_mock_<ts>` intent so the rest of the flow
    /// stays exercisable without credentials.
    pub async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: Option<String>,
    ) -> Result<PaymentIntent, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow!(
                "Amount must be greater than 0"
            )));
        }

        match self {
            PaymentGateway::Mock => Ok(PaymentIntent {
                intent_id: format!("order_mock_{}", Utc::now().timestamp_millis()),
                amount,
                currency: currency.to_string(),
                status: "created".to_string(),
            }),
            PaymentGateway::Live(client) => {
                let minor_units = (amount * Decimal::from(100))
                    .round()
                    .to_u64()
                    .ok_or_else(|| {
                        AppError::BadRequest(anyhow!("Amount exceeds the supported range"))
                    })?;
                let receipt =
                    receipt.unwrap_or_else(|| format!("txn_{}", Utc::now().timestamp_millis()));

                let order = client
                    .create_order(minor_units, currency, &receipt)
                    .await
                    .map_err(|e| {
                        tracing::error!(error = %e, "Failed to create Razorpay order");
                        AppError::InternalError(anyhow!("Failed to create payment order: {}", e))
                    })?;

                Ok(PaymentIntent {
                    intent_id: order.id,
                    amount,
                    currency: order.currency,
                    status: order.status,
                })
            }
        }
    }

    /// Check the authenticity of a payment callback.
    ///
    /// A mismatching signature is a normal `Ok(false)` outcome, not an
    /// error. Mock mode accepts everything; there is no secret to verify
    /// against.
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<bool, AppError> {
        match self {
            PaymentGateway::Mock => {
                tracing::debug!(
                    order_id = %gateway_order_id,
                    payment_id = %gateway_payment_id,
                    "Mock gateway: accepting payment signature"
                );
                Ok(true)
            }
            PaymentGateway::Live(client) => client
                .verify_payment_signature(gateway_order_id, gateway_payment_id, signature)
                .map_err(|e| {
                    tracing::error!(error = %e, "Signature verification error");
                    AppError::InternalError(anyhow!("Signature verification failed"))
                }),
        }
    }
}

/// Razorpay client for interacting with the Razorpay API.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    config: GatewayConfig,
}

/// Request to create a Razorpay order.
#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    /// Amount in smallest currency unit (paise for INR).
    amount: u64,
    /// Currency code (e.g., "INR").
    currency: &'a str,
    /// Receipt ID for tracking.
    receipt: &'a str,
    /// Capture the payment immediately on authorization.
    payment_capture: u8,
}

/// Response from Razorpay order creation.
#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    /// Razorpay order ID.
    pub id: String,
    /// Amount in smallest currency unit.
    pub amount: u64,
    /// Currency code.
    pub currency: String,
    /// Receipt ID.
    pub receipt: Option<String>,
    /// Order status.
    pub status: String,
}

/// Razorpay API error response.
#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: GatewayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    code: String,
    description: String,
}

impl RazorpayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Create a new order in Razorpay.
    ///
    /// # Arguments
    /// * `amount` - Amount in smallest currency unit (paise for INR)
    /// * `currency` - Currency code (e.g., "INR")
    /// * `receipt` - Receipt ID for tracking
    pub async fn create_order(
        &self,
        amount: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder> {
        let request = CreateOrderRequest {
            amount,
            currency,
            receipt,
            payment_capture: 1,
        };

        let url = format!("{}/orders", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body = %body, "Razorpay create_order response");

        if status.is_success() {
            let order: GatewayOrder = serde_json::from_str(&body)?;
            tracing::info!(
                order_id = %order.id,
                amount = order.amount,
                currency = %order.currency,
                "Razorpay order created"
            );
            Ok(order)
        } else {
            let error: GatewayErrorBody =
                serde_json::from_str(&body).unwrap_or_else(|_| GatewayErrorBody {
                    error: GatewayErrorDetail {
                        code: "UNKNOWN".to_string(),
                        description: body.clone(),
                    },
                });
            tracing::error!(
                code = %error.error.code,
                description = %error.error.description,
                "Razorpay order creation failed"
            );
            Err(anyhow!(
                "Razorpay error: {} - {}",
                error.error.code,
                error.error.description
            ))
        }
    }

    /// Verify payment signature from Razorpay checkout.
    ///
    /// The signature is computed as:
    /// `HMAC-SHA256(order_id + "|" + payment_id, key_secret)`
    pub fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<bool> {
        let payload = format!("{}|{}", gateway_order_id, gateway_payment_id);
        let expected = compute_signature(&payload, self.config.key_secret.expose_secret())?;

        let is_valid = signatures_match(&expected, signature);

        if is_valid {
            tracing::info!(
                order_id = %gateway_order_id,
                payment_id = %gateway_payment_id,
                "Payment signature verified successfully"
            );
        } else {
            tracing::warn!(
                order_id = %gateway_order_id,
                payment_id = %gateway_payment_id,
                "Payment signature verification failed"
            );
        }

        Ok(is_valid)
    }
}

/// Compute a hex-encoded HMAC-SHA256 signature.
fn compute_signature(payload: &str, secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| anyhow!("Invalid key length"))?;
    mac.update(payload.as_bytes());
    let result = mac.finalize();
    Ok(hex::encode(result.into_bytes()))
}

/// Constant-time comparison of two hex signatures.
fn signatures_match(expected: &str, submitted: &str) -> bool {
    let expected = expected.as_bytes();
    let submitted = submitted.as_bytes();
    if expected.len() != submitted.len() {
        return false;
    }
    expected.ct_eq(submitted).into()
}
