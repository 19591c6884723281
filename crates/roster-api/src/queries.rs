//! Read-only operations.
//!
//! | Operation | Args | Result |
//! |-----------|------|--------|
//! | `personCount` | — | `Int` |
//! | `allPersons` | `{"phone": "YES" \| "NO"}` (optional) | `[Person]` |
//! | `findPerson` | `{"name": ...}` | `Person \| null` |
//! | `me` | — | `User \| null` |

use roster_core::{
  context::AuthContext,
  person::{Person, PhoneFilter},
  store::DirectoryStore,
  user::UserView,
};
use serde::{Deserialize, Deserializer, de};

use crate::{
  ApiError, Directory,
  error::Result,
  resolve::{Envelope, Resolve, args, no_args, to_data},
};

/// A query envelope: `{"operation": "findPerson", "args": {"name": "..."}}`.
#[derive(Debug, Clone)]
pub enum Query {
  PersonCount,
  AllPersons(AllPersons),
  FindPerson(FindPerson),
  Me,
}

impl<'de> Deserialize<'de> for Query {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let Envelope { operation, args: raw } = Envelope::deserialize(deserializer)?;
    match operation.as_str() {
      "personCount" => no_args(&operation, &raw).map(|()| Self::PersonCount),
      "allPersons" => args(raw).map(Self::AllPersons),
      "findPerson" => args(raw).map(Self::FindPerson),
      "me" => no_args(&operation, &raw).map(|()| Self::Me),
      other => Err(de::Error::unknown_variant(other, Self::OPERATIONS)),
    }
  }
}

impl Query {
  pub const OPERATIONS: &'static [&'static str] =
    &["personCount", "allPersons", "findPerson", "me"];

  pub fn name(&self) -> &'static str {
    match self {
      Self::PersonCount => "personCount",
      Self::AllPersons(_) => "allPersons",
      Self::FindPerson(_) => "findPerson",
      Self::Me => "me",
    }
  }

  pub async fn execute<S: DirectoryStore>(
    self,
    directory: &Directory<S>,
    ctx: &AuthContext,
  ) -> Result<serde_json::Value> {
    match self {
      Self::PersonCount => to_data(PersonCount.resolve(directory, ctx).await?),
      Self::AllPersons(op) => to_data(op.resolve(directory, ctx).await?),
      Self::FindPerson(op) => to_data(op.resolve(directory, ctx).await?),
      Self::Me => to_data(Me.resolve(directory, ctx).await?),
    }
  }
}

// ─── personCount ─────────────────────────────────────────────────────────────

pub struct PersonCount;

impl<S: DirectoryStore> Resolve<S> for PersonCount {
  type Output = u64;

  async fn resolve(self, directory: &Directory<S>, _ctx: &AuthContext) -> Result<u64> {
    directory.store().count_persons().await.map_err(ApiError::store)
  }
}

// ─── allPersons ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllPersons {
  /// Absent returns everybody.
  #[serde(default)]
  pub phone: Option<PhoneFilter>,
}

impl<S: DirectoryStore> Resolve<S> for AllPersons {
  type Output = Vec<Person>;

  async fn resolve(self, directory: &Directory<S>, _ctx: &AuthContext) -> Result<Vec<Person>> {
    directory
      .store()
      .list_persons(self.phone)
      .await
      .map_err(ApiError::store)
  }
}

// ─── findPerson ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct FindPerson {
  pub name: String,
}

impl<S: DirectoryStore> Resolve<S> for FindPerson {
  type Output = Option<Person>;

  async fn resolve(
    self,
    directory: &Directory<S>,
    _ctx: &AuthContext,
  ) -> Result<Option<Person>> {
    directory
      .store()
      .find_person(&self.name)
      .await
      .map_err(ApiError::store)
  }
}

// ─── me ──────────────────────────────────────────────────────────────────────

pub struct Me;

impl<S: DirectoryStore> Resolve<S> for Me {
  type Output = Option<UserView>;

  async fn resolve(
    self,
    _directory: &Directory<S>,
    ctx: &AuthContext,
  ) -> Result<Option<UserView>> {
    Ok(ctx.current_user().cloned())
  }
}
