//! User — an account that keeps an ordered friend list of persons.
//!
//! A user never owns the persons it references. The stored form holds ids
//! only; [`UserView`] is assembled on read by expanding those ids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::person::Person;

/// The stored form of a user: friends are weak references by person id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:       Uuid,
  /// Globally unique.
  pub username: String,
  /// Insertion-ordered, never contains the same id twice.
  pub friends:  Vec<Uuid>,
}

impl User {
  pub fn is_friend(&self, person_id: Uuid) -> bool {
    self.friends.contains(&person_id)
  }
}

/// Input to [`crate::store::DirectoryStore::insert_user`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
  pub username: String,
}

/// The computed read model for a user. Never stored, always derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
  pub id:       Uuid,
  pub username: String,
  /// Friends expanded to full records, in friend-list order.
  pub friends:  Vec<Person>,
}

impl UserView {
  pub fn is_friend(&self, person_id: Uuid) -> bool {
    self.friends.iter().any(|p| p.id == person_id)
  }

  /// Return a copy with `person` appended to the friend list, unless it is
  /// already there.
  pub fn with_friend(&self, person: Person) -> Self {
    let mut view = self.clone();
    if !view.is_friend(person.id) {
      view.friends.push(person);
    }
    view
  }
}
