//! Person — the directory record that every query and mutation revolves
//! around.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored directory entry. Owned by the store; users only hold its `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:     Uuid,
  /// Globally unique.
  pub name:   String,
  pub phone:  Option<String>,
  pub street: String,
  pub city:   String,
}

impl Person {
  /// `true` when the person carries a non-empty phone number.
  pub fn has_phone(&self) -> bool {
    self.phone.as_deref().is_some_and(|p| !p.is_empty())
  }
}

/// Input to [`crate::store::DirectoryStore::insert_person`].
/// `id` is always assigned by the store; it is not accepted from callers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPerson {
  pub name:   String,
  #[serde(default)]
  pub phone:  Option<String>,
  pub street: String,
  pub city:   String,
}

impl NewPerson {
  /// Attach a store-assigned id.
  pub fn into_person(self, id: Uuid) -> Person {
    Person {
      id,
      name: self.name,
      phone: self.phone,
      street: self.street,
      city: self.city,
    }
  }
}

/// Predicate for [`crate::store::DirectoryStore::list_persons`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhoneFilter {
  /// Only persons with a non-empty phone.
  Yes,
  /// Only persons without a phone.
  No,
}

impl PhoneFilter {
  pub fn matches(self, person: &Person) -> bool {
    match self {
      Self::Yes => person.has_phone(),
      Self::No => !person.has_phone(),
    }
  }
}
