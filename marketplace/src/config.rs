// marketplace/src/config.rs

use crate::errors::{AppError, Result};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
  Stripe,
  Mock,
}

impl FromStr for PaymentProvider {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "stripe" => Ok(PaymentProvider::Stripe),
      "mock" => Ok(PaymentProvider::Mock),
      other => Err(AppError::Config(format!("Unknown PAYMENT_PROVIDER '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

/// Payment gateway settings, handed to the adapter once at construction.
#[derive(Clone)]
pub struct PaymentConfig {
  pub provider: PaymentProvider,
  pub stripe_secret_key: Option<String>,
  pub stripe_api_base: String,
  pub success_url: String,
  pub cancel_url: String,
  pub currency: String,
  pub timeout: Duration,
}

// Keeps the secret key out of logs.
impl std::fmt::Debug for PaymentConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PaymentConfig")
      .field("provider", &self.provider)
      .field("stripe_secret_key", &self.stripe_secret_key.as_ref().map(|_| "[REDACTED]"))
      .field("stripe_api_base", &self.stripe_api_base)
      .field("success_url", &self.success_url)
      .field("cancel_url", &self.cancel_url)
      .field("currency", &self.currency)
      .field("timeout", &self.timeout)
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Unset means the in-memory store.
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub run_migrations: bool,
  pub app_base_url: String,
  pub log_format: LogFormat,
  pub payment: PaymentConfig,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Builds the config from any variable source; empty values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

    let server_host = or_default("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var::<u16>("SERVER_PORT", &or_default("SERVER_PORT", "8080"))?;
    let database_url = get("DATABASE_URL");
    let database_max_connections = parse_var::<u32>("DATABASE_MAX_CONNECTIONS", &or_default("DATABASE_MAX_CONNECTIONS", "10"))?;
    let run_migrations = parse_var::<bool>("RUN_MIGRATIONS", &or_default("RUN_MIGRATIONS", "false"))?;
    let app_base_url = get("APP_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

    let log_format = match or_default("LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
      "json" => LogFormat::Json,
      "pretty" | "text" => LogFormat::Pretty,
      other => return Err(AppError::Config(format!("Invalid LOG_FORMAT '{}'", other))),
    };

    let provider: PaymentProvider = or_default("PAYMENT_PROVIDER", "mock").parse()?;
    let stripe_secret_key = get("STRIPE_SECRET_KEY");
    if provider == PaymentProvider::Stripe && stripe_secret_key.is_none() {
      return Err(AppError::Config(
        "STRIPE_SECRET_KEY is required when PAYMENT_PROVIDER=stripe".to_string(),
      ));
    }
    let timeout_secs = parse_var::<u64>("PAYMENT_TIMEOUT_SECS", &or_default("PAYMENT_TIMEOUT_SECS", "15"))?;

    let payment = PaymentConfig {
      provider,
      stripe_secret_key,
      stripe_api_base: or_default("STRIPE_API_BASE", "https://api.stripe.com"),
      success_url: get("PAYMENT_SUCCESS_URL").unwrap_or_else(|| format!("{}/payment/success", app_base_url)),
      cancel_url: get("PAYMENT_CANCEL_URL").unwrap_or_else(|| format!("{}/payment/cancel", app_base_url)),
      currency: or_default("PAYMENT_CURRENCY", "usd").to_ascii_lowercase(),
      timeout: Duration::from_secs(timeout_secs),
    };

    tracing::info!(
      server_port,
      persistent_store = database_url.is_some(),
      payment_provider = ?payment.provider,
      "Application configuration loaded."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      run_migrations,
      app_base_url,
      log_format,
      payment,
    })
  }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))
}
