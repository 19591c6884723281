//! Error type for `roster-store-sqlite`.

use roster_core::{store::StoreError, validate::ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("person not found: {0}")]
  PersonNotFound(uuid::Uuid),

  #[error("user not found: {0}")]
  UserNotFound(uuid::Uuid),
}

impl StoreError for Error {
  fn validation(&self) -> Option<&ValidationError> {
    match self {
      Self::Validation(v) => Some(v),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
