//! Identity context resolution: `Authorization: Bearer <token>` in, an
//! [`AuthContext`] out.
//!
//! A missing or non-bearer header is anonymous, not an error. A bearer token
//! that fails verification is always rejected with
//! [`ApiError::Authentication`], whatever the operation.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{header, request::Parts},
};
use chrono::TimeDelta;
use roster_core::{context::AuthContext, store::DirectoryStore};

use crate::{
  Directory,
  error::{ApiError, Result},
  token::TokenSigner,
};

/// Credentials and token settings for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  /// HS256 secret used to sign and verify tokens.
  pub jwt_secret:    String,
  /// PHC string produced by argon2 for the shared login secret, e.g.
  /// `$argon2id$v=19$…`
  pub password_hash: String,
  pub token_ttl:     TimeDelta,
}

/// Extract the token from a `Bearer <token>` header value. The scheme is
/// matched case-insensitively; anything else yields `None`.
pub fn bearer_token(header_value: &str) -> Option<&str> {
  let (scheme, token) = header_value.trim().split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return None;
  }
  let token = token.trim();
  (!token.is_empty()).then_some(token)
}

/// Resolve the caller's identity. Performs at most one store read.
pub async fn resolve_context<S: DirectoryStore>(
  store: &S,
  tokens: &TokenSigner,
  authorization: Option<&str>,
) -> Result<AuthContext> {
  let Some(token) = authorization.and_then(bearer_token) else {
    return Ok(AuthContext::anonymous());
  };

  let claims = tokens.verify(token)?;

  match store.materialize_user(claims.id).await.map_err(ApiError::store)? {
    Some(user) => {
      tracing::debug!(user = %user.id, "request authenticated");
      Ok(AuthContext::authenticated(user))
    }
    None => {
      tracing::debug!(user = %claims.id, "token names a user that no longer exists");
      Ok(AuthContext::anonymous())
    }
  }
}

/// Check `password` against an argon2 PHC hash on the blocking pool.
pub async fn verify_password(password: String, password_hash: String) -> bool {
  let checked = tokio::task::spawn_blocking(move || {
    let Ok(parsed) = PasswordHash::new(&password_hash) else {
      tracing::error!("configured login password hash is not a valid PHC string");
      return false;
    };
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
  .await;

  settle(checked)
}

/// A verification task that died counts as a mismatch.
fn settle(checked: std::result::Result<bool, tokio::task::JoinError>) -> bool {
  checked.unwrap_or_else(|e| {
    tracing::error!(error = %e, "password verification task failed");
    false
  })
}

/// The resolved identity of the current request, as an axum extractor.
pub struct Identity(pub AuthContext);

impl<S> FromRequestParts<Arc<Directory<S>>> for Identity
where
  S: DirectoryStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &Arc<Directory<S>>,
  ) -> Result<Self, Self::Rejection> {
    let authorization = parts
      .headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok());
    Ok(Identity(state.context(authorization).await?))
  }
}

#[cfg(test)]
mod tests {
  use roster_core::{memory::MemoryStore, user::NewUser};

  use super::*;
  use crate::fixtures;

  #[test]
  fn bearer_scheme_is_case_insensitive() {
    assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
    assert_eq!(bearer_token("bearer abc.def"), Some("abc.def"));
    assert_eq!(bearer_token("BEARER  abc.def "), Some("abc.def"));
  }

  #[test]
  fn other_shapes_are_not_bearer() {
    assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
    assert_eq!(bearer_token("Bearer"), None);
    assert_eq!(bearer_token("Bearer   "), None);
    assert_eq!(bearer_token("abc.def"), None);
  }

  #[tokio::test]
  async fn missing_or_foreign_header_is_anonymous() {
    let dir = fixtures::directory(MemoryStore::new());
    assert!(!dir.context(None).await.unwrap().is_authenticated());
    assert!(!dir.context(Some("Basic dXNlcjpwYXNz")).await.unwrap().is_authenticated());
  }

  #[tokio::test]
  async fn invalid_token_is_an_authentication_error() {
    let dir = fixtures::directory(MemoryStore::new());
    let err = dir.context(Some("Bearer not-a-token")).await.unwrap_err();
    assert!(matches!(err, ApiError::Authentication(_)));
  }

  #[tokio::test]
  async fn valid_token_resolves_user_with_friends() {
    let store = MemoryStore::new();
    let dir = fixtures::directory(store.clone());
    let user = store.insert_user(NewUser { username: "mluukkai".into() }).await.unwrap();
    let p = store.insert_person(fixtures::new_person("Arto Hellas", None)).await.unwrap();
    store.add_friend(user.id, p.id).await.unwrap();

    let token = dir.tokens().sign(&user).unwrap();
    let ctx = dir
      .context(Some(&format!("Bearer {}", token.value)))
      .await
      .unwrap();

    let current = ctx.current_user().expect("authenticated");
    assert_eq!(current.username, "mluukkai");
    assert_eq!(current.friends, vec![p]);
  }

  #[tokio::test]
  async fn token_for_deleted_user_is_anonymous() {
    let dir = fixtures::directory(MemoryStore::new());
    let ghost = roster_core::user::User {
      id:       uuid::Uuid::new_v4(),
      username: "ghost".into(),
      friends:  Vec::new(),
    };
    let token = dir.tokens().sign(&ghost).unwrap();
    let ctx = dir.context(Some(&format!("Bearer {}", token.value))).await.unwrap();
    assert!(!ctx.is_authenticated());
  }

  #[tokio::test]
  async fn password_check() {
    let hash = fixtures::hash("secret");
    assert!(verify_password("secret".into(), hash.clone()).await);
    assert!(!verify_password("wrong".into(), hash).await);
    assert!(!verify_password("secret".into(), "not-a-phc".into()).await);
  }

  #[tokio::test]
  async fn failed_verification_task_is_a_mismatch() {
    let crashed = tokio::task::spawn_blocking(|| -> bool { panic!("hasher crashed") }).await;
    assert!(crashed.is_err());
    assert!(!settle(crashed));
    assert!(settle(Ok(true)));
  }
}
