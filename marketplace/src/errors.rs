// marketplace/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use flow::FlowError;
use serde_json::json;
use thiserror::Error;

/// Stable classification exposed to callers, independent of the error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  InvalidInput,
  Unauthorized,
  NotFound,
  Conflict,
  EmptyCart,
  UpstreamFailure,
  Internal,
}

impl ErrorKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorKind::InvalidInput => "invalid_input",
      ErrorKind::Unauthorized => "unauthorized",
      ErrorKind::NotFound => "not_found",
      ErrorKind::Conflict => "conflict",
      ErrorKind::EmptyCart => "empty_cart",
      ErrorKind::UpstreamFailure => "upstream_failure",
      ErrorKind::Internal => "internal",
    }
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Cart is empty")]
  EmptyCart,

  /// The payment provider failed or was unreachable; safe to retry.
  #[error("Payment Provider Error: {0}")]
  Upstream(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Storage Error: {0}")]
  Storage(#[source] anyhow::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      AppError::Validation(_) => ErrorKind::InvalidInput,
      AppError::Auth(_) => ErrorKind::Unauthorized,
      AppError::NotFound(_) => ErrorKind::NotFound,
      AppError::Conflict(_) => ErrorKind::Conflict,
      AppError::EmptyCart => ErrorKind::EmptyCart,
      AppError::Upstream(_) => ErrorKind::UpstreamFailure,
      AppError::Config(_) | AppError::Storage(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        ErrorKind::Internal
      }
    }
  }

  pub fn is_retryable(&self) -> bool {
    matches!(self, AppError::Upstream(_))
  }

  /// Message safe to hand to a client. Backend details stay in the logs.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::NotFound(m) | AppError::Conflict(m) => m.clone(),
      AppError::EmptyCart => "Your cart is empty.".to_string(),
      AppError::Upstream(_) => "Payment provider unavailable, please retry.".to_string(),
      AppError::Storage(_) => "Storage operation failed.".to_string(),
      AppError::Config(_) | AppError::Workflow { .. } | AppError::Internal(_) => "An internal error occurred.".to_string(),
    }
  }
}

impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    match err {
      sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
      sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => AppError::Conflict(format!(
        "Uniqueness constraint '{}' violated",
        db_err.constraint().unwrap_or("unknown")
      )),
      other => AppError::Storage(anyhow::Error::new(other)),
    }
  }
}

impl From<sqlx::migrate::MigrateError> for AppError {
  fn from(err: sqlx::migrate::MigrateError) -> Self {
    AppError::Storage(anyhow::Error::new(err))
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self.kind() {
      ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
      ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::Conflict => StatusCode::CONFLICT,
      ErrorKind::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
      ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
      ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    if self.kind() == ErrorKind::Internal || self.kind() == ErrorKind::UpstreamFailure {
      tracing::error!(application_error = %self, kind = self.kind().as_str(), "Responding with error");
    } else {
      tracing::warn!(application_error = %self, kind = self.kind().as_str(), "Responding with error");
    }
    HttpResponse::build(self.status_code()).json(json!({
      "error": self.kind().as_str(),
      "message": self.public_message(),
      "retryable": self.is_retryable(),
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;

  #[test]
  fn empty_cart_and_upstream_failure_are_distinguishable() {
    let empty = AppError::EmptyCart;
    let upstream = AppError::Upstream("connection reset".to_string());

    assert_eq!(empty.kind(), ErrorKind::EmptyCart);
    assert_eq!(upstream.kind(), ErrorKind::UpstreamFailure);
    assert!(!empty.is_retryable());
    assert!(upstream.is_retryable());
    assert_ne!(empty.status_code(), upstream.status_code());
  }

  #[test]
  fn row_not_found_maps_to_not_found() {
    let err: AppError = sqlx::Error::RowNotFound.into();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[actix_web::test]
  async fn storage_errors_do_not_leak_backend_text() {
    let err = AppError::Storage(anyhow::anyhow!("relation \"orders\" does not exist"));
    let body = to_bytes(err.error_response().into_body()).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("\"internal\""));
    assert!(!text.contains("relation"));
  }
}
