//! roster-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `ROSTER_*` environment variables, opens the configured store, and serves
//! the directory API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `login_password_hash`:
//!
//! ```
//! cargo run -p roster-server -- --hash-password
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use roster_core::{memory::MemoryStore, store::DirectoryStore};
use roster_server::{Backend, ServerConfig};
use roster_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Roster directory server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let config = ServerConfig::load(&cli.config).context("failed to load configuration")?;
  anyhow::ensure!(!config.jwt_secret.is_empty(), "jwt_secret must not be empty");

  match config.backend {
    Backend::Sqlite => {
      let store_path = expand_tilde(Path::new(&config.store_path));
      let store = SqliteStore::open(&store_path)
        .await
        .with_context(|| format!("failed to open store at {store_path:?}"))?;
      tracing::info!(path = ?store_path, "using sqlite store");
      serve(store, &config).await
    }
    Backend::Memory => {
      tracing::warn!("using in-memory store; data is lost on shutdown");
      serve(MemoryStore::new(), &config).await
    }
  }
}

async fn serve<S: DirectoryStore + 'static>(store: S, config: &ServerConfig) -> anyhow::Result<()> {
  let app = roster_server::app(roster_server::directory(store, config));
  let address = config.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
