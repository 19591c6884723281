//! [`MemoryStore`] — an in-process arena implementation of
//! [`DirectoryStore`].
//!
//! Records live in id-keyed maps with a separate insertion-order index. Every
//! operation runs inside one mutex section, which is what makes the
//! validate-then-write sequence atomic.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use crate::{
  Error, Result,
  person::{NewPerson, Person, PhoneFilter},
  store::DirectoryStore,
  user::{NewUser, User, UserView},
  validate::{self, Entity, ValidationError},
};

#[derive(Debug, Default)]
struct Arena {
  persons:      HashMap<Uuid, Person>,
  person_order: Vec<Uuid>,
  users:        HashMap<Uuid, User>,
}

impl Arena {
  fn name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
    self
      .persons
      .values()
      .any(|p| p.name == name && Some(p.id) != except)
  }

  fn user_by_name(&self, username: &str) -> Option<&User> {
    self.users.values().find(|u| u.username == username)
  }

  fn persons_in_order(&self) -> impl Iterator<Item = &Person> {
    self.person_order.iter().filter_map(|id| self.persons.get(id))
  }
}

/// A directory store held entirely in memory.
///
/// Clones share the same arena.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
  arena: Arc<Mutex<Arena>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn arena(&self) -> MutexGuard<'_, Arena> {
    self.arena.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl DirectoryStore for MemoryStore {
  type Error = Error;

  // ── Persons ───────────────────────────────────────────────────────────────

  async fn count_persons(&self) -> Result<u64> {
    Ok(self.arena().persons.len() as u64)
  }

  async fn list_persons(&self, filter: Option<PhoneFilter>) -> Result<Vec<Person>> {
    let arena = self.arena();
    Ok(
      arena
        .persons_in_order()
        .filter(|p| filter.is_none_or(|f| f.matches(p)))
        .cloned()
        .collect(),
    )
  }

  async fn find_person(&self, name: &str) -> Result<Option<Person>> {
    Ok(self.arena().persons.values().find(|p| p.name == name).cloned())
  }

  async fn insert_person(&self, input: NewPerson) -> Result<Person> {
    validate::new_person(&input)?;

    let mut arena = self.arena();
    if arena.name_taken(&input.name, None) {
      return Err(ValidationError::unique(Entity::Person, "name").into());
    }

    let person = input.into_person(Uuid::new_v4());
    arena.person_order.push(person.id);
    arena.persons.insert(person.id, person.clone());
    Ok(person)
  }

  async fn update_person(&self, person: Person) -> Result<Person> {
    validate::person(&person)?;

    let mut arena = self.arena();
    if !arena.persons.contains_key(&person.id) {
      return Err(Error::PersonNotFound(person.id));
    }
    if arena.name_taken(&person.name, Some(person.id)) {
      return Err(ValidationError::unique(Entity::Person, "name").into());
    }

    arena.persons.insert(person.id, person.clone());
    Ok(person)
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn insert_user(&self, input: NewUser) -> Result<User> {
    validate::new_user(&input)?;

    let mut arena = self.arena();
    if arena.user_by_name(&input.username).is_some() {
      return Err(ValidationError::unique(Entity::User, "username").into());
    }

    let user = User {
      id:       Uuid::new_v4(),
      username: input.username,
      friends:  Vec::new(),
    };
    arena.users.insert(user.id, user.clone());
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.arena().users.get(&id).cloned())
  }

  async fn find_user(&self, username: &str) -> Result<Option<User>> {
    Ok(self.arena().user_by_name(username).cloned())
  }

  async fn materialize_user(&self, id: Uuid) -> Result<Option<UserView>> {
    let arena = self.arena();
    let Some(user) = arena.users.get(&id) else {
      return Ok(None);
    };

    let friends = user
      .friends
      .iter()
      .filter_map(|pid| arena.persons.get(pid))
      .cloned()
      .collect();

    Ok(Some(UserView {
      id: user.id,
      username: user.username.clone(),
      friends,
    }))
  }

  async fn add_friend(&self, user_id: Uuid, person_id: Uuid) -> Result<User> {
    let mut arena = self.arena();
    if !arena.persons.contains_key(&person_id) {
      return Err(Error::PersonNotFound(person_id));
    }
    let user = arena
      .users
      .get_mut(&user_id)
      .ok_or(Error::UserNotFound(user_id))?;

    if !user.is_friend(person_id) {
      user.friends.push(person_id);
    }
    Ok(user.clone())
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;
  use crate::validate::Rule;

  fn new_person(name: &str, phone: Option<&str>) -> NewPerson {
    NewPerson {
      name:   name.into(),
      phone:  phone.map(str::to_owned),
      street: "Tapiolankatu 5".into(),
      city:   "Espoo".into(),
    }
  }

  #[tokio::test]
  async fn insert_and_find_person() {
    let s = MemoryStore::new();
    let p = s.insert_person(new_person("Arto Hellas", Some("040-123543"))).await.unwrap();

    let found = s.find_person("Arto Hellas").await.unwrap().unwrap();
    assert_eq!(found, p);
    assert!(s.find_person("Nobody Here").await.unwrap().is_none());
    assert_eq!(s.count_persons().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn duplicate_name_leaves_original_untouched() {
    let s = MemoryStore::new();
    let original = s.insert_person(new_person("Arto Hellas", Some("040-123543"))).await.unwrap();

    let err = s.insert_person(new_person("Arto Hellas", None)).await.unwrap_err();
    match err {
      Error::Validation(v) => assert!(v.has("name", Rule::Unique)),
      other => panic!("unexpected error: {other}"),
    }

    assert_eq!(s.count_persons().await.unwrap(), 1);
    assert_eq!(s.find_person("Arto Hellas").await.unwrap().unwrap(), original);
  }

  #[tokio::test]
  async fn invalid_person_is_not_written() {
    let s = MemoryStore::new();
    assert!(s.insert_person(new_person("Ada", None)).await.is_err());
    assert_eq!(s.count_persons().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn update_person_checks_length_and_existence() {
    let s = MemoryStore::new();
    let mut p = s.insert_person(new_person("Arto Hellas", None)).await.unwrap();

    p.phone = Some("12".into());
    assert!(matches!(s.update_person(p.clone()).await, Err(Error::Validation(_))));
    assert_eq!(s.find_person("Arto Hellas").await.unwrap().unwrap().phone, None);

    p.phone = Some("09-1234567".into());
    let saved = s.update_person(p.clone()).await.unwrap();
    assert_eq!(saved.phone.as_deref(), Some("09-1234567"));

    let ghost = new_person("Ghost Writer", None).into_person(Uuid::new_v4());
    assert!(matches!(s.update_person(ghost).await, Err(Error::PersonNotFound(_))));
  }

  #[tokio::test]
  async fn list_preserves_insertion_order() {
    let s = MemoryStore::new();
    for name in ["Charlie", "Alpha Centauri", "Bravo Two"] {
      s.insert_person(new_person(name, None)).await.unwrap();
    }
    let names: Vec<_> = s
      .list_persons(None)
      .await
      .unwrap()
      .into_iter()
      .map(|p| p.name)
      .collect();
    assert_eq!(names, ["Charlie", "Alpha Centauri", "Bravo Two"]);
  }

  #[tokio::test]
  async fn usernames_are_unique() {
    let s = MemoryStore::new();
    s.insert_user(NewUser { username: "mluukkai".into() }).await.unwrap();
    let err = s.insert_user(NewUser { username: "mluukkai".into() }).await.unwrap_err();
    assert!(matches!(err, Error::Validation(v) if v.has("username", Rule::Unique)));
  }

  #[tokio::test]
  async fn add_friend_is_idempotent_and_materializes() {
    let s = MemoryStore::new();
    let user = s.insert_user(NewUser { username: "mluukkai".into() }).await.unwrap();
    let p = s.insert_person(new_person("Arto Hellas", None)).await.unwrap();

    s.add_friend(user.id, p.id).await.unwrap();
    let after = s.add_friend(user.id, p.id).await.unwrap();
    assert_eq!(after.friends, vec![p.id]);

    let view = s.materialize_user(user.id).await.unwrap().unwrap();
    assert_eq!(view.friends, vec![p]);
    assert!(s.materialize_user(Uuid::new_v4()).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn add_friend_requires_both_records() {
    let s = MemoryStore::new();
    let user = s.insert_user(NewUser { username: "mluukkai".into() }).await.unwrap();
    let p = s.insert_person(new_person("Arto Hellas", None)).await.unwrap();

    assert!(matches!(
      s.add_friend(user.id, Uuid::new_v4()).await,
      Err(Error::PersonNotFound(_))
    ));
    assert!(matches!(
      s.add_friend(Uuid::new_v4(), p.id).await,
      Err(Error::UserNotFound(_))
    ));
  }

  proptest! {
    #[test]
    fn phone_filter_partitions_population(
      phones in proptest::collection::vec(proptest::option::of("[0-9]{5,10}"), 0..24)
    ) {
      let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
      rt.block_on(async {
        let s = MemoryStore::new();
        for (i, phone) in phones.iter().enumerate() {
          s.insert_person(new_person(&format!("person-{i}"), phone.as_deref()))
            .await
            .unwrap();
        }

        let all = s.list_persons(None).await.unwrap();
        let yes = s.list_persons(Some(PhoneFilter::Yes)).await.unwrap();
        let no  = s.list_persons(Some(PhoneFilter::No)).await.unwrap();

        assert_eq!(all.len(), phones.len());
        assert_eq!(yes.len(), phones.iter().filter(|p| p.is_some()).count());
        assert!(yes.iter().all(Person::has_phone));
        assert!(no.iter().all(|p| !p.has_phone()));
        assert_eq!(yes.len() + no.len(), all.len());
      });
    }
  }
}
