//! Signed session tokens (HS256 JWT) issued by `login` and presented as
//! `Authorization: Bearer <token>`.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use roster_core::user::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, Result};

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub username: String,
  pub id:       Uuid,
  pub iat:      i64,
  pub exp:      i64,
}

/// The `login` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
  pub value: String,
}

/// Signs and verifies tokens with one shared secret.
pub struct TokenSigner {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        TimeDelta,
}

impl TokenSigner {
  pub fn new(secret: &[u8], ttl: TimeDelta) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation: Validation::new(Algorithm::HS256),
      ttl,
    }
  }

  pub fn sign(&self, user: &User) -> Result<Token> {
    let now = Utc::now();
    let claims = Claims {
      username: user.username.clone(),
      id:       user.id,
      iat:      now.timestamp(),
      exp:      (now + self.ttl).timestamp(),
    };

    let value = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;
    Ok(Token { value })
  }

  /// Check signature and expiry, and decode the claims.
  pub fn verify(&self, token: &str) -> Result<Claims> {
    jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(|e| ApiError::Authentication(format!("invalid token: {e}")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user() -> User {
    User { id: Uuid::new_v4(), username: "mluukkai".into(), friends: Vec::new() }
  }

  #[test]
  fn sign_then_verify() {
    let signer = TokenSigner::new(b"shh", TimeDelta::hours(1));
    let u = user();
    let token = signer.sign(&u).unwrap();
    assert!(!token.value.is_empty());

    let claims = signer.verify(&token.value).unwrap();
    assert_eq!(claims.id, u.id);
    assert_eq!(claims.username, "mluukkai");
    assert!(claims.exp > claims.iat);
  }

  #[test]
  fn foreign_signature_is_rejected() {
    let ours   = TokenSigner::new(b"shh", TimeDelta::hours(1));
    let theirs = TokenSigner::new(b"other", TimeDelta::hours(1));
    let token  = theirs.sign(&user()).unwrap();
    assert!(matches!(ours.verify(&token.value), Err(ApiError::Authentication(_))));
  }

  #[test]
  fn expired_token_is_rejected() {
    let signer = TokenSigner::new(b"shh", TimeDelta::minutes(-10));
    let token  = signer.sign(&user()).unwrap();
    assert!(matches!(signer.verify(&token.value), Err(ApiError::Authentication(_))));
  }

  #[test]
  fn garbage_is_rejected() {
    let signer = TokenSigner::new(b"shh", TimeDelta::hours(1));
    assert!(matches!(signer.verify("not.a.jwt"), Err(ApiError::Authentication(_))));
  }
}
