pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{Database, PaymentGateway};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub gateway: PaymentGateway,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    db: Database,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        services::init_metrics();

        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;
        db.run_migrations().await?;

        // Gateway mode is fixed here for the process lifetime.
        let gateway = PaymentGateway::from_config(&config.gateway);
        if gateway.is_live() {
            tracing::info!("Razorpay gateway client initialized");
        } else {
            tracing::warn!(
                "Razorpay credentials not configured - running in simulated gateway mode"
            );
        }

        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            gateway,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics))
            // Payment endpoints
            .route(
                "/payments/create-order",
                post(handlers::payments::create_order),
            )
            .route("/payments/verify", post(handlers::payments::verify_payment))
            // Order endpoints
            .route("/orders", post(handlers::orders::create_order))
            .route(
                "/orders/user/:email",
                get(handlers::orders::list_orders_by_user),
            )
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        // Port 0 selects a random free port, used by the test harness.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
            db,
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on port {}", self.port);

        axum::serve(self.listener, self.router).await?;

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a handle to the database, mainly for tests.
    pub fn database(&self) -> &Database {
        &self.db
    }
}
