//! Domain models for settlement-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Outcome of a payment verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(PaymentStatus::Success),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Order lifecycle state.
///
/// PENDING is the only initial state; SUCCESS and CANCELLED are terminal and
/// no transition leads out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Success,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Success => "SUCCESS",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "SUCCESS" => Some(OrderStatus::Success),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Success | OrderStatus::Cancelled)
    }
}

/// Accepted payment methods. Anything else is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Razorpay,
    Upi,
    Card,
    Cod,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Razorpay => "RAZORPAY",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Cod => "COD",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "RAZORPAY" => Some(PaymentMethod::Razorpay),
            "UPI" => Some(PaymentMethod::Upi),
            "CARD" => Some(PaymentMethod::Card),
            "COD" => Some(PaymentMethod::Cod),
            _ => None,
        }
    }
}

/// One row per verification attempt, append-only.
///
/// The stored signature is the submitted one, byte for byte, whatever the
/// outcome was. Rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentRecord {
    pub record_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    pub status: String,
    pub amount: Decimal,
    pub currency: String,
    pub payer_email: String,
    pub created_utc: DateTime<Utc>,
}

impl PaymentRecord {
    /// Get parsed status.
    pub fn parsed_status(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_string(&self.status)
    }
}

/// Customer order aggregate root. Items belong to it exclusively and share
/// its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub order_id: Uuid,
    pub payer_email: String,
    pub total_amount: Decimal,
    pub status: String,
    pub payment_method: String,
    pub delivery_address: String,
    pub order_date: DateTime<Utc>,
}

impl Order {
    /// Get parsed status.
    pub fn parsed_status(&self) -> Option<OrderStatus> {
        OrderStatus::from_string(&self.status)
    }
}

/// Line item on an order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub order_item_id: Uuid,
    pub order_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub sort_order: i32,
}

/// Input for creating an order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub payer_email: String,
    pub items: Vec<CreateOrderItem>,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
}

/// Input for one line item of a new order.
#[derive(Debug, Clone)]
pub struct CreateOrderItem {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Input for appending a verification outcome to the ledger.
#[derive(Debug, Clone)]
pub struct RecordVerification {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub currency: String,
    pub payer_email: String,
}
