//! The `DirectoryStore` trait — the persistence gateway.
//!
//! The trait is implemented by storage backends (`roster-store-sqlite`, and
//! the in-process [`crate::memory::MemoryStore`]).
//! Higher layers (`roster-api`, `roster-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  person::{NewPerson, Person, PhoneFilter},
  user::{NewUser, User, UserView},
  validate::ValidationError,
};

/// Implemented by every backend error so callers can tell a rejected write
/// apart from an infrastructure failure without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The constraint violation behind this error, if that is what it is.
  fn validation(&self) -> Option<&ValidationError>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the two entity collections, Person and User.
///
/// Every write validates field lengths and uniqueness atomically with the
/// write itself: either the whole record is persisted, or nothing is and the
/// error carries a [`ValidationError`].
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DirectoryStore: Send + Sync {
  type Error: StoreError;

  // ── Persons ───────────────────────────────────────────────────────────

  /// Total number of stored persons.
  fn count_persons(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// All persons matching `filter` (every person if `None`), in insertion
  /// order.
  fn list_persons(
    &self,
    filter: Option<PhoneFilter>,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Look a person up by their unique name. Returns `None` if not found.
  fn find_person<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  /// Validate and persist a new person; the store assigns the id.
  fn insert_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Validate and overwrite an existing person, matched by id.
  fn update_person(
    &self,
    person: Person,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Validate and persist a new user with an empty friend list.
  fn insert_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Retrieve a user by their unique username. Returns `None` if not found.
  fn find_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Materialise a [`UserView`], the user with every friend reference
  /// expanded to the full [`Person`], in a single read. Returns `None` if
  /// the user does not exist.
  fn materialize_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<UserView>, Self::Error>> + Send + '_;

  /// Append `person_id` to the user's friend list unless it is already
  /// there. Idempotent; returns the stored user afterwards.
  fn add_friend(
    &self,
    user_id: Uuid,
    person_id: Uuid,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;
}
