//! Shared test scaffolding.

use std::sync::Arc;

use argon2::{
  Argon2,
  password_hash::{PasswordHasher, SaltString},
};
use chrono::TimeDelta;
use rand_core::OsRng;
use roster_core::{person::NewPerson, store::DirectoryStore};

use crate::{Directory, auth::AuthConfig, bus::EventBus};

/// The login secret accepted by [`directory`].
pub const PASSWORD: &str = "secret";

pub fn hash(password: &str) -> String {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .expect("argon2 hashing failed")
    .to_string()
}

pub fn directory<S: DirectoryStore>(store: S) -> Directory<S> {
  let auth = AuthConfig {
    jwt_secret:    "test-secret".into(),
    password_hash: hash(PASSWORD),
    token_ttl:     TimeDelta::hours(1),
  };
  Directory::new(Arc::new(store), auth, EventBus::new())
}

pub fn new_person(name: &str, phone: Option<&str>) -> NewPerson {
  NewPerson {
    name:   name.into(),
    phone:  phone.map(str::to_owned),
    street: "Tapiolankatu 5 A".into(),
    city:   "Espoo".into(),
  }
}
