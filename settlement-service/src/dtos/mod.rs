use crate::models::{Order, OrderItem};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn default_currency() -> String {
    "INR".to_string()
}

/// Request to create a payment intent for a checkout amount.
#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    /// Amount in major units (e.g., rupees). Must be greater than 0.
    pub amount: Option<Decimal>,
    /// Currency code, defaults to "INR".
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Optional receipt ID for tracking.
    pub receipt: Option<String>,
}

/// Response after creating a payment intent.
#[derive(Debug, Serialize)]
pub struct CreateIntentResponse {
    /// Gateway order ID (use this in frontend checkout).
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
}

/// Request to verify a payment after checkout completion.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    /// Signature computed by the gateway over `order_id + "|" + payment_id`.
    pub signature: String,
    /// Payer identity, supplied by the identity provider.
    pub email: String,
    pub amount: Decimal,
}

/// Response after verifying a payment.
#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    pub status: String,
    pub gateway_payment_id: String,
    pub message: String,
}

/// Request to create an order with its line items.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(email)]
    pub payer_email: String,
    pub items: Vec<OrderItemRequest>,
    pub delivery_address: String,
    pub payment_method: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Order response DTO.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub payer_email: String,
    pub total_amount: Decimal,
    pub status: String,
    pub payment_method: String,
    pub delivery_address: String,
    pub order_date: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl From<(Order, Vec<OrderItem>)> for OrderResponse {
    fn from((order, items): (Order, Vec<OrderItem>)) -> Self {
        Self {
            order_id: order.order_id,
            payer_email: order.payer_email,
            total_amount: order.total_amount,
            status: order.status,
            payment_method: order.payment_method,
            delivery_address: order.delivery_address,
            order_date: order.order_date,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            name: item.name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
        }
    }
}
