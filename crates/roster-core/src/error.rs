//! Error types for `roster-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{store::StoreError, validate::ValidationError};

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("person not found: {0}")]
  PersonNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),
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
