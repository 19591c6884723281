//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings. Row readers here are
//! plain synchronous functions so they can be shared by every
//! `Connection::call` closure in the store.

use roster_core::{
  person::Person,
  user::{User, UserView},
};
use rusqlite::{Connection, OptionalExtension as _, Row};
use uuid::Uuid;

use crate::Result;

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Constraint errors ───────────────────────────────────────────────────────

/// `true` if `e` is SQLite rejecting a write on a UNIQUE constraint.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str = "person_id, name, phone, street, city";

/// Raw strings read directly from a `persons` row.
pub struct RawPerson {
  pub person_id: String,
  pub name:      String,
  pub phone:     Option<String>,
  pub street:    String,
  pub city:      String,
}

impl RawPerson {
  /// Read a row selected with [`PERSON_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id: row.get(0)?,
      name:      row.get(1)?,
      phone:     row.get(2)?,
      street:    row.get(3)?,
      city:      row.get(4)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      id:     decode_uuid(&self.person_id)?,
      name:   self.name,
      phone:  self.phone,
      street: self.street,
      city:   self.city,
    })
  }
}

/// Raw strings for a `users` row plus its ordered friend ids.
pub struct RawUser {
  pub user_id:  String,
  pub username: String,
  pub friends:  Vec<String>,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:       decode_uuid(&self.user_id)?,
      username: self.username,
      friends:  self
        .friends
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<Result<_>>()?,
    })
  }
}

/// A `users` row with friends already joined against `persons`.
pub struct RawUserView {
  pub user_id:  String,
  pub username: String,
  pub friends:  Vec<RawPerson>,
}

impl RawUserView {
  pub fn into_view(self) -> Result<UserView> {
    Ok(UserView {
      id:       decode_uuid(&self.user_id)?,
      username: self.username,
      friends:  self
        .friends
        .into_iter()
        .map(RawPerson::into_person)
        .collect::<Result<_>>()?,
    })
  }
}

// ─── Shared readers ──────────────────────────────────────────────────────────

/// Load a user and its friend ids. `key_column` is either `user_id` or
/// `username`.
pub fn load_user(
  conn:       &Connection,
  key_column: &'static str,
  key:        &str,
) -> rusqlite::Result<Option<RawUser>> {
  let head: Option<(String, String)> = conn
    .query_row(
      &format!("SELECT user_id, username FROM users WHERE {key_column} = ?1"),
      rusqlite::params![key],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()?;

  let Some((user_id, username)) = head else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT person_id FROM friendships WHERE user_id = ?1 ORDER BY position",
  )?;
  let friends = stmt
    .query_map(rusqlite::params![user_id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;

  Ok(Some(RawUser { user_id, username, friends }))
}

pub fn row_exists(
  conn:  &Connection,
  sql:   &str,
  key:   &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, rusqlite::params![key], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}
