//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use roster_core::{store::StoreError, validate::ValidationError};
use serde_json::json;
use thiserror::Error;

/// An error returned by a resolver, the identity resolver, or a handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A write broke a uniqueness or length constraint; nothing was applied.
  #[error(transparent)]
  Validation(ValidationError),

  /// The operation needs an authenticated caller and there is none.
  #[error("not authenticated")]
  Forbidden,

  /// Wrong login credentials, or a bearer token that failed verification.
  #[error("{0}")]
  Authentication(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  /// Classify a backend error: constraint violations keep their fields,
  /// everything else is an opaque store failure.
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.validation() {
      Some(v) => Self::Validation(v.clone()),
      None => Self::Store(Box::new(e)),
    }
  }

  pub fn wrong_credentials() -> Self { Self::Authentication("wrong credentials".into()) }

  /// Machine-readable error kind sent to clients.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Validation(_) => "VALIDATION_ERROR",
      Self::Forbidden => "FORBIDDEN",
      Self::Authentication(_) => "AUTHENTICATION_ERROR",
      Self::NotFound(_) => "NOT_FOUND",
      Self::BadRequest(_) => "BAD_REQUEST",
      Self::Store(_) | Self::Internal(_) => "INTERNAL",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Self::Forbidden => StatusCode::FORBIDDEN,
      Self::Authentication(_) => StatusCode::UNAUTHORIZED,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = match self {
      Self::Store(_) | Self::Internal(_) => {
        tracing::error!(error = %self, "request failed");
        "internal server error".to_owned()
      }
      _ => self.to_string(),
    };

    let mut body = json!({
      "kind":    self.kind(),
      "message": message,
    });
    if let Self::Validation(v) = &self {
      body["fields"] = json!(v.violations);
    }

    (self.status(), Json(json!({ "error": body }))).into_response()
  }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
