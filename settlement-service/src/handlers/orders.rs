//! Order creation and listing handlers.

use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::{
    dtos::{CreateOrderRequest, OrderResponse},
    error::AppError,
    models::{CreateOrder, CreateOrderItem, PaymentMethod},
    services::metrics::ORDERS_TOTAL,
    AppState,
};

/// Create an order with its line items.
///
/// Orders start PENDING; only a verified payment settles them (see
/// `handlers::payments::verify_payment`).
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    payload.validate()?;

    let payment_method = PaymentMethod::from_string(&payload.payment_method).ok_or_else(|| {
        AppError::BadRequest(anyhow!(
            "Unsupported payment method: {}",
            payload.payment_method
        ))
    })?;

    if payload.delivery_address.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow!(
            "Delivery address must not be empty"
        )));
    }

    tracing::info!(
        payer_email = %payload.payer_email,
        item_count = payload.items.len(),
        payment_method = payment_method.as_str(),
        "Creating order"
    );

    let input = CreateOrder {
        payer_email: payload.payer_email,
        items: payload
            .items
            .into_iter()
            .map(|item| CreateOrderItem {
                name: item.name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
        delivery_address: payload.delivery_address,
        payment_method,
    };

    let (order, items) = state.db.create_order(&input).await?;

    ORDERS_TOTAL.with_label_values(&["created"]).inc();

    Ok(Json(OrderResponse::from((order, items))))
}

/// List all orders belonging to a payer, newest first.
///
/// The email must match exactly; there is no substring or case-insensitive
/// matching.
pub async fn list_orders_by_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state.db.list_orders_by_payer(&email).await?;

    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}
