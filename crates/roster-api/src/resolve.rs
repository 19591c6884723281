//! The capability shared by every named operation, and the envelope they
//! arrive in.

use std::future::Future;

use roster_core::{context::AuthContext, store::DirectoryStore};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Directory, error::Result};

/// An operation's parsed arguments, able to run themselves against a
/// directory on behalf of the caller in `ctx`.
pub trait Resolve<S: DirectoryStore> {
  type Output: Serialize;

  fn resolve(
    self,
    directory: &Directory<S>,
    ctx: &AuthContext,
  ) -> impl Future<Output = Result<Self::Output>> + Send;
}

/// Serialise a resolver's output into the response payload.
pub(crate) fn to_data<T: Serialize>(value: T) -> Result<Value> {
  serde_json::to_value(value)
    .map_err(|e| crate::ApiError::Internal(format!("cannot encode result: {e}")))
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// `{"operation": "...", "args": {...}}`. `args` may be absent or `null`.
#[derive(Deserialize)]
pub(crate) struct Envelope {
  pub operation: String,
  #[serde(default)]
  pub args:      Value,
}

/// Decode the arguments of an operation that takes some. Absent or `null`
/// args decode as `{}`, so optional arguments fall back to their defaults.
pub(crate) fn args<T, E>(args: Value) -> std::result::Result<T, E>
where
  T: DeserializeOwned,
  E: serde::de::Error,
{
  let args = match args {
    Value::Null => Value::Object(Default::default()),
    other => other,
  };
  serde_json::from_value(args).map_err(E::custom)
}

/// Accept the arguments of an operation that takes none: absent, `null`, or
/// `{}`.
pub(crate) fn no_args<E: serde::de::Error>(
  operation: &str,
  args: &Value,
) -> std::result::Result<(), E> {
  match args {
    Value::Null => Ok(()),
    Value::Object(map) if map.is_empty() => Ok(()),
    _ => Err(E::custom(format!("operation `{operation}` takes no arguments"))),
  }
}
