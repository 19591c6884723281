//! HTTP host for the Roster directory service.
//!
//! Loads [`ServerConfig`], wires a [`DirectoryStore`] backend into a
//! [`Directory`], and wraps the operation router with request tracing.

use std::{path::Path, sync::Arc};

use axum::Router;
use chrono::TimeDelta;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use roster_api::{Directory, auth::AuthConfig, bus::EventBus};
use roster_core::store::DirectoryStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Which [`DirectoryStore`] implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  Sqlite,
  /// Nothing survives a restart.
  Memory,
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROSTER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub backend:             Backend,
  pub store_path:          String,
  pub jwt_secret:          String,
  pub login_password_hash: String,
  pub token_ttl_secs:      u32,
  pub event_capacity:      usize,
}

impl ServerConfig {
  /// Read `path` (if it exists), then the environment, over the defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    defaults()?
      .add_source(File::from(path).required(false))
      .add_source(Environment::with_prefix("ROSTER"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn auth(&self) -> AuthConfig {
    AuthConfig {
      jwt_secret:    self.jwt_secret.clone(),
      password_hash: self.login_password_hash.clone(),
      token_ttl:     TimeDelta::seconds(i64::from(self.token_ttl_secs)),
    }
  }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
  Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 4000_i64)?
    .set_default("backend", "sqlite")?
    .set_default("store_path", "roster.db")?
    .set_default("token_ttl_secs", 86_400_i64)?
    .set_default("event_capacity", roster_api::bus::DEFAULT_CAPACITY as i64)
}

// ─── Application ──────────────────────────────────────────────────────────────

/// Assemble the shared [`Directory`] over `store`.
pub fn directory<S: DirectoryStore>(store: S, config: &ServerConfig) -> Arc<Directory<S>> {
  Arc::new(Directory::new(
    Arc::new(store),
    config.auth(),
    EventBus::with_capacity(config.event_capacity),
  ))
}

/// The complete HTTP application.
pub fn app<S: DirectoryStore + 'static>(directory: Arc<Directory<S>>) -> Router {
  Router::new()
    .merge(roster_api::api_router(directory))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use config::FileFormat;
  use roster_core::memory::MemoryStore;
  use tower::ServiceExt as _;

  use super::*;

  const REQUIRED: &str = r#"
    jwt_secret = "shh"
    login_password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g"
  "#;

  fn from_toml(toml: &str) -> Result<ServerConfig, ConfigError> {
    defaults()?
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()?
      .try_deserialize()
  }

  #[test]
  fn defaults_fill_optional_keys() {
    let cfg = from_toml(REQUIRED).unwrap();
    assert_eq!(cfg.address(), "127.0.0.1:4000");
    assert_eq!(cfg.backend, Backend::Sqlite);
    assert_eq!(cfg.store_path, "roster.db");
    assert_eq!(cfg.token_ttl_secs, 86_400);
    assert_eq!(cfg.event_capacity, 1024);
    assert_eq!(cfg.auth().token_ttl, TimeDelta::days(1));
  }

  #[test]
  fn file_overrides_defaults() {
    let toml = format!("{REQUIRED}\nport = 8080\nbackend = \"memory\"\nevent_capacity = 16\n");
    let cfg = from_toml(&toml).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.backend, Backend::Memory);
    assert_eq!(cfg.event_capacity, 16);
  }

  #[test]
  fn secrets_are_required() {
    assert!(from_toml("").is_err());
    assert!(from_toml(r#"jwt_secret = "shh""#).is_err());
  }

  #[test]
  fn unknown_backend_is_rejected() {
    let toml = format!("{REQUIRED}\nbackend = \"postgres\"\n");
    assert!(from_toml(&toml).is_err());
  }

  #[tokio::test]
  async fn app_serves_operations() {
    let cfg = from_toml(REQUIRED).unwrap();
    let app = app(directory(MemoryStore::new(), &cfg));

    let req = Request::builder()
      .method("POST")
      .uri("/query")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(r#"{"operation":"personCount"}"#))
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, serde_json::json!({ "data": 0 }));
  }
}
