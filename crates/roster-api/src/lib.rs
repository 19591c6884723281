//! Operation layer for Roster: queries, mutations, identity, and live
//! subscriptions over any [`DirectoryStore`].
//!
//! Exposes an axum [`Router`] with three endpoints:
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/query` | `{"operation": "...", "args": {...}}` |
//! | `POST` | `/mutation` | `{"operation": "...", "args": {...}}` |
//! | `GET`  | `/subscriptions` | websocket upgrade |
//!
//! Successful calls answer `{"data": ...}`; failures answer
//! `{"error": {"kind": ..., "message": ...}}` with a matching status.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", roster_api::api_router(directory.clone()))
//! ```

pub mod auth;
pub mod bus;
pub mod error;
#[cfg(test)]
mod fixtures;
pub mod mutations;
pub mod queries;
pub mod resolve;
pub mod subscriptions;
pub mod token;

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::{State, rejection::JsonRejection},
  routing::{get, post},
};
use roster_core::{context::AuthContext, store::DirectoryStore};
use serde_json::{Value, json};

pub use error::ApiError;

use auth::{AuthConfig, Identity};
use bus::EventBus;
use error::Result;
use mutations::Mutation;
use queries::Query;
use token::TokenSigner;

// ─── Directory ───────────────────────────────────────────────────────────────

/// Everything a resolver may touch: the store, the event bus, and the
/// credentials used to issue and check tokens. One per process.
pub struct Directory<S> {
  store:         Arc<S>,
  bus:           EventBus,
  tokens:        TokenSigner,
  password_hash: String,
}

impl<S: DirectoryStore> Directory<S> {
  pub fn new(store: Arc<S>, auth: AuthConfig, bus: EventBus) -> Self {
    Self {
      store,
      bus,
      tokens: TokenSigner::new(auth.jwt_secret.as_bytes(), auth.token_ttl),
      password_hash: auth.password_hash,
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn bus(&self) -> &EventBus { &self.bus }

  pub fn tokens(&self) -> &TokenSigner { &self.tokens }

  pub fn password_hash(&self) -> &str { &self.password_hash }

  /// Build the identity context for a request carrying `authorization`.
  pub async fn context(&self, authorization: Option<&str>) -> Result<AuthContext> {
    auth::resolve_context(self.store(), &self.tokens, authorization).await
  }

  pub async fn query(&self, query: Query, ctx: &AuthContext) -> Result<Value> {
    let name = query.name();
    tracing::debug!(operation = name, "query");
    query.execute(self, ctx).await
  }

  pub async fn mutate(&self, mutation: Mutation, ctx: &AuthContext) -> Result<Value> {
    let name = mutation.name();
    tracing::debug!(operation = name, authenticated = ctx.is_authenticated(), "mutation");
    mutation.execute(self, ctx).await
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `directory`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(directory: Arc<Directory<S>>) -> Router<()>
where
  S: DirectoryStore + 'static,
{
  Router::new()
    .route("/query", post(query_handler::<S>))
    .route("/mutation", post(mutation_handler::<S>))
    .route("/subscriptions", get(subscriptions::handler::<S>))
    .with_state(directory)
}

async fn query_handler<S: DirectoryStore + 'static>(
  State(directory): State<Arc<Directory<S>>>,
  Identity(ctx): Identity,
  body: std::result::Result<Json<Query>, JsonRejection>,
) -> Result<Json<Value>> {
  let Json(query) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let data = directory.query(query, &ctx).await?;
  Ok(Json(json!({ "data": data })))
}

async fn mutation_handler<S: DirectoryStore + 'static>(
  State(directory): State<Arc<Directory<S>>>,
  Identity(ctx): Identity,
  body: std::result::Result<Json<Mutation>, JsonRejection>,
) -> Result<Json<Value>> {
  let Json(mutation) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let data = directory.mutate(mutation, &ctx).await?;
  Ok(Json(json!({ "data": data })))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
