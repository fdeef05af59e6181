use anyhow::Result;
use dotenvy::dotenv;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::env;

/// Key id values shipped in docs/templates. Seeing one of these means the
/// deployment was never pointed at a real Razorpay account.
pub const PLACEHOLDER_KEY_IDS: &[&str] = &["rzp_test_your_key_id", "rzp_test_1DP5mmOlF5G5ag"];
pub const PLACEHOLDER_KEY_SECRETS: &[&str] = &["your_key_secret", "DUMMY_SECRET_KEY"];

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Razorpay credentials and endpoint, injected from the environment at
/// startup.
#[derive(Deserialize, Clone, Debug)]
pub struct GatewayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub api_base_url: String,
}

impl GatewayConfig {
    /// Whether the configured credentials can drive the live gateway.
    ///
    /// Missing or placeholder values mean the process runs in mock mode for
    /// its whole lifetime.
    pub fn has_live_credentials(&self) -> bool {
        let secret = self.key_secret.expose_secret();
        !self.key_id.is_empty()
            && !secret.is_empty()
            && !PLACEHOLDER_KEY_IDS.contains(&self.key_id.as_str())
            && !PLACEHOLDER_KEY_SECRETS.contains(&secret.as_str())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("SETTLEMENT_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("SETTLEMENT_SERVICE_PORT")
            .unwrap_or_else(|_| "3004".to_string())
            .parse()?;

        let db_url =
            env::var("SETTLEMENT_DATABASE_URL").expect("SETTLEMENT_DATABASE_URL must be set");
        let max_connections = env::var("SETTLEMENT_DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;
        let min_connections = env::var("SETTLEMENT_DATABASE_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        // Defaulting to the placeholder keys keeps unconfigured environments
        // in mock mode instead of failing startup.
        let key_id =
            env::var("RAZORPAY_KEY_ID").unwrap_or_else(|_| "rzp_test_your_key_id".to_string());
        let key_secret =
            env::var("RAZORPAY_KEY_SECRET").unwrap_or_else(|_| "your_key_secret".to_string());
        let api_base_url = env::var("RAZORPAY_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                max_connections,
                min_connections,
            },
            gateway: GatewayConfig {
                key_id,
                key_secret: Secret::new(key_secret),
                api_base_url,
            },
            service_name: "settlement-service".to_string(),
        })
    }
}
