//! Database service for settlement-service.
//!
//! Owns the two durable stores of the subsystem: the append-only payment
//! ledger and the order aggregate (orders plus their items). The ledger
//! write and any settlement it triggers happen in a single transaction.

use crate::error::AppError;
use crate::models::{
    CreateOrder, Order, OrderItem, OrderStatus, PaymentRecord, PaymentStatus, RecordVerification,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "settlement-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payment Ledger
    // -------------------------------------------------------------------------

    /// Append a verification outcome to the payment ledger.
    ///
    /// Exactly one row exists per (gateway_order_id, gateway_payment_id)
    /// pair. A duplicate callback finds the original row and returns it with
    /// `newly_recorded = false`; nothing is written twice. A SUCCESS outcome
    /// settles the newest PENDING order with the same payer and amount in
    /// the same transaction as the ledger insert.
    #[instrument(
        skip(self, input),
        fields(
            gateway_order_id = %input.gateway_order_id,
            gateway_payment_id = %input.gateway_payment_id,
            status = input.status.as_str()
        )
    )]
    pub async fn record_verification(
        &self,
        input: &RecordVerification,
    ) -> Result<(PaymentRecord, bool), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_verification"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let inserted = sqlx::query_as::<_, PaymentRecord>(
            r#"
            INSERT INTO payment_records
                (record_id, gateway_order_id, gateway_payment_id, signature, status, amount, currency, payer_email, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (gateway_order_id, gateway_payment_id) DO NOTHING
            RETURNING record_id, gateway_order_id, gateway_payment_id, signature, status, amount, currency, payer_email, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.gateway_order_id)
        .bind(&input.gateway_payment_id)
        .bind(&input.signature)
        .bind(input.status.as_str())
        .bind(input.amount)
        .bind(&input.currency)
        .bind(&input.payer_email)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to record verification: {}", e))
        })?;

        let record = match inserted {
            Some(record) => record,
            None => {
                // Duplicate delivery of the same callback: re-report the
                // original outcome.
                tx.rollback().await.ok();
                let existing = self
                    .get_payment_record(&input.gateway_order_id, &input.gateway_payment_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::DatabaseError(anyhow::anyhow!(
                            "Payment record vanished after conflict"
                        ))
                    })?;
                timer.observe_duration();
                info!(
                    record_id = %existing.record_id,
                    "Duplicate verification callback, returning original outcome"
                );
                return Ok((existing, false));
            }
        };

        if input.status == PaymentStatus::Success {
            let settled: Option<Uuid> = sqlx::query_scalar(
                r#"
                UPDATE orders
                SET status = 'SUCCESS'
                WHERE order_id = (
                    SELECT order_id FROM orders
                    WHERE payer_email = $1 AND total_amount = $2 AND status = 'PENDING'
                    ORDER BY order_date DESC
                    LIMIT 1
                )
                RETURNING order_id
                "#,
            )
            .bind(&input.payer_email)
            .bind(input.amount)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to settle order: {}", e))
            })?;

            match settled {
                Some(order_id) => info!(order_id = %order_id, "Order settled by verified payment"),
                None => info!(
                    payer_email = %input.payer_email,
                    "No pending order matches the verified payment"
                ),
            }
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(record_id = %record.record_id, "Verification recorded");

        Ok((record, true))
    }

    /// Get a ledger row by its callback pair.
    #[instrument(skip(self))]
    pub async fn get_payment_record(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, AppError> {
        let record = sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT record_id, gateway_order_id, gateway_payment_id, signature, status, amount, currency, payer_email, created_utc
            FROM payment_records
            WHERE gateway_order_id = $1 AND gateway_payment_id = $2
            "#,
        )
        .bind(gateway_order_id)
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get payment record: {}", e))
        })?;

        Ok(record)
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Create an order with its line items.
    ///
    /// Subtotals and the order total are computed here, never taken from the
    /// caller. The order and all items are inserted in one transaction.
    #[instrument(skip(self, input), fields(payer_email = %input.payer_email, item_count = input.items.len()))]
    pub async fn create_order(
        &self,
        input: &CreateOrder,
    ) -> Result<(Order, Vec<OrderItem>), AppError> {
        if input.items.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Order must contain at least one item"
            )));
        }
        for item in &input.items {
            if item.quantity <= 0 {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Item quantity must be greater than 0"
                )));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Item unit price must not be negative"
                )));
            }
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_order"])
            .start_timer();

        let order_id = Uuid::new_v4();
        let order_date = Utc::now();
        let total_amount: Decimal = input
            .items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (order_id, payer_email, total_amount, status, payment_method, delivery_address, order_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING order_id, payer_email, total_amount, status, payment_method, delivery_address, order_date
            "#,
        )
        .bind(order_id)
        .bind(&input.payer_email)
        .bind(total_amount)
        .bind(OrderStatus::Pending.as_str())
        .bind(input.payment_method.as_str())
        .bind(&input.delivery_address)
        .bind(order_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create order: {}", e)))?;

        let mut items = Vec::with_capacity(input.items.len());
        for (index, item) in input.items.iter().enumerate() {
            let subtotal = item.unit_price * Decimal::from(item.quantity);
            let row = sqlx::query_as::<_, OrderItem>(
                r#"
                INSERT INTO order_items (order_item_id, order_id, name, quantity, unit_price, subtotal, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING order_item_id, order_id, name, quantity, unit_price, subtotal, sort_order
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(subtotal)
            .bind(index as i32)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to create order item: {}", e))
            })?;
            items.push(row);
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            order_id = %order.order_id,
            total_amount = %order.total_amount,
            "Order created"
        );

        Ok((order, items))
    }

    /// Get an order and its items by ID.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<(Order, Vec<OrderItem>)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_order"])
            .start_timer();

        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT order_id, payer_email, total_amount, status, payment_method, delivery_address, order_date
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get order: {}", e)))?;

        let order = match order {
            Some(order) => order,
            None => {
                timer.observe_duration();
                return Ok(None);
            }
        };

        let items = self.get_order_items(order_id).await?;

        timer.observe_duration();

        Ok(Some((order, items)))
    }

    /// List all orders whose payer email matches exactly, newest first.
    #[instrument(skip(self), fields(payer_email = %payer_email))]
    pub async fn list_orders_by_payer(
        &self,
        payer_email: &str,
    ) -> Result<Vec<(Order, Vec<OrderItem>)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_orders_by_payer"])
            .start_timer();

        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT order_id, payer_email, total_amount, status, payment_method, delivery_address, order_date
            FROM orders
            WHERE payer_email = $1
            ORDER BY order_date DESC
            "#,
        )
        .bind(payer_email)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list orders: {}", e)))?;

        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.get_order_items(order.order_id).await?;
            result.push((order, items));
        }

        timer.observe_duration();

        Ok(result)
    }

    /// Finalize an order's status from a verification outcome.
    ///
    /// PENDING goes to SUCCESS when `verified`, otherwise to CANCELLED. Both
    /// end states are terminal; settling an already-settled order is a
    /// Conflict, and an unknown id is NotFound.
    #[instrument(skip(self), fields(order_id = %order_id, verified = verified))]
    pub async fn settle_order(&self, order_id: Uuid, verified: bool) -> Result<Order, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["settle_order"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let current = sqlx::query_as::<_, Order>(
            r#"
            SELECT order_id, payer_email, total_amount, status, payment_method, delivery_address, order_date
            FROM orders
            WHERE order_id = $1
            FOR UPDATE
            "#,
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get order: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order {} not found", order_id)))?;

        if current
            .parsed_status()
            .map(|s| s.is_terminal())
            .unwrap_or(false)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Order {} is already settled as {}",
                order_id,
                current.status
            )));
        }

        let new_status = if verified {
            OrderStatus::Success
        } else {
            OrderStatus::Cancelled
        };

        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $2
            WHERE order_id = $1
            RETURNING order_id, payer_email, total_amount, status, payment_method, delivery_address, order_date
            "#,
        )
        .bind(order_id)
        .bind(new_status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to settle order: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            order_id = %order.order_id,
            status = %order.status,
            "Order settled"
        );

        Ok(order)
    }

    async fn get_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, AppError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT order_item_id, order_id, name, quantity, unit_price, subtotal, sort_order
            FROM order_items
            WHERE order_id = $1
            ORDER BY sort_order
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get order items: {}", e))
        })?;

        Ok(items)
    }
}
