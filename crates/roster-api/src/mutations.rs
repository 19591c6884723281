//! State-changing operations.
//!
//! `addPerson` and `addAsFriend` require an authenticated caller; the rest
//! are open. Every write goes through the store, which validates it
//! atomically, so a rejected mutation leaves nothing behind.

use roster_core::{
  context::AuthContext,
  event::DirectoryEvent,
  person::{NewPerson, Person},
  store::DirectoryStore,
  user::{NewUser, UserView},
};
use serde::{Deserialize, Deserializer, de};

use crate::{
  ApiError, Directory,
  auth::verify_password,
  error::Result,
  resolve::{Envelope, Resolve, args, to_data},
  token::Token,
};

/// A mutation envelope: `{"operation": "addPerson", "args": {...}}`.
#[derive(Debug, Clone)]
pub enum Mutation {
  AddPerson(AddPerson),
  EditNumber(EditNumber),
  CreateUser(CreateUser),
  Login(Login),
  AddAsFriend(AddAsFriend),
}

impl<'de> Deserialize<'de> for Mutation {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let Envelope { operation, args: raw } = Envelope::deserialize(deserializer)?;
    match operation.as_str() {
      "addPerson" => args(raw).map(Self::AddPerson),
      "editNumber" => args(raw).map(Self::EditNumber),
      "createUser" => args(raw).map(Self::CreateUser),
      "login" => args(raw).map(Self::Login),
      "addAsFriend" => args(raw).map(Self::AddAsFriend),
      other => Err(de::Error::unknown_variant(other, Self::OPERATIONS)),
    }
  }
}

impl Mutation {
  pub const OPERATIONS: &'static [&'static str] =
    &["addPerson", "editNumber", "createUser", "login", "addAsFriend"];

  pub fn name(&self) -> &'static str {
    match self {
      Self::AddPerson(_) => "addPerson",
      Self::EditNumber(_) => "editNumber",
      Self::CreateUser(_) => "createUser",
      Self::Login(_) => "login",
      Self::AddAsFriend(_) => "addAsFriend",
    }
  }

  pub async fn execute<S: DirectoryStore>(
    self,
    directory: &Directory<S>,
    ctx: &AuthContext,
  ) -> Result<serde_json::Value> {
    match self {
      Self::AddPerson(op) => to_data(op.resolve(directory, ctx).await?),
      Self::EditNumber(op) => to_data(op.resolve(directory, ctx).await?),
      Self::CreateUser(op) => to_data(op.resolve(directory, ctx).await?),
      Self::Login(op) => to_data(op.resolve(directory, ctx).await?),
      Self::AddAsFriend(op) => to_data(op.resolve(directory, ctx).await?),
    }
  }
}

// ─── addPerson ───────────────────────────────────────────────────────────────

/// Create a person, append it to the caller's friend list, and announce it
/// on [`Topic::PersonAdded`](roster_core::event::Topic::PersonAdded).
#[derive(Debug, Clone, Deserialize)]
pub struct AddPerson {
  pub name:   String,
  #[serde(default)]
  pub phone:  Option<String>,
  pub street: String,
  pub city:   String,
}

impl<S: DirectoryStore> Resolve<S> for AddPerson {
  type Output = Person;

  async fn resolve(self, directory: &Directory<S>, ctx: &AuthContext) -> Result<Person> {
    let user = ctx.current_user().ok_or(ApiError::Forbidden)?;
    let store = directory.store();

    let person = store
      .insert_person(NewPerson {
        name:   self.name,
        phone:  self.phone,
        street: self.street,
        city:   self.city,
      })
      .await
      .map_err(ApiError::store)?;

    // The person is already persisted at this point; a failed link is
    // reported but not rolled back, and nothing is published.
    if let Err(e) = store.add_friend(user.id, person.id).await {
      tracing::warn!(
        person = %person.id,
        user = %user.id,
        error = %e,
        "person saved but could not be added to friend list",
      );
      return Err(ApiError::store(e));
    }

    tracing::info!(person = %person.id, name = %person.name, user = %user.id, "person added");
    directory.bus().publish(DirectoryEvent::PersonAdded(person.clone()));
    Ok(person)
  }
}

// ─── editNumber ──────────────────────────────────────────────────────────────

/// Replace the phone of the person called `name`. Open to anonymous callers.
#[derive(Debug, Clone, Deserialize)]
pub struct EditNumber {
  pub name:  String,
  pub phone: String,
}

impl<S: DirectoryStore> Resolve<S> for EditNumber {
  type Output = Option<Person>;

  async fn resolve(
    self,
    directory: &Directory<S>,
    _ctx: &AuthContext,
  ) -> Result<Option<Person>> {
    let store = directory.store();
    let Some(mut person) = store.find_person(&self.name).await.map_err(ApiError::store)?
    else {
      return Ok(None);
    };

    person.phone = Some(self.phone);
    let updated = store.update_person(person).await.map_err(ApiError::store)?;
    tracing::info!(person = %updated.id, "phone number changed");
    Ok(Some(updated))
  }
}

// ─── createUser ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
  pub username: String,
}

impl<S: DirectoryStore> Resolve<S> for CreateUser {
  type Output = UserView;

  async fn resolve(self, directory: &Directory<S>, _ctx: &AuthContext) -> Result<UserView> {
    let user = directory
      .store()
      .insert_user(NewUser { username: self.username })
      .await
      .map_err(ApiError::store)?;

    tracing::info!(user = %user.id, username = %user.username, "user created");
    Ok(UserView { id: user.id, username: user.username, friends: Vec::new() })
  }
}

// ─── login ───────────────────────────────────────────────────────────────────

/// Exchange a username and the shared login secret for a signed token.
#[derive(Debug, Clone, Deserialize)]
pub struct Login {
  pub username: String,
  pub password: String,
}

impl<S: DirectoryStore> Resolve<S> for Login {
  type Output = Token;

  async fn resolve(self, directory: &Directory<S>, _ctx: &AuthContext) -> Result<Token> {
    let user = directory
      .store()
      .find_user(&self.username)
      .await
      .map_err(ApiError::store)?;

    // Check the password even for unknown users so both failures cost the
    // same and read the same.
    let password_ok =
      verify_password(self.password, directory.password_hash().to_owned()).await;

    match user {
      Some(user) if password_ok => {
        tracing::info!(user = %user.id, "login succeeded");
        directory.tokens().sign(&user)
      }
      _ => {
        tracing::debug!(username = %self.username, "login rejected");
        Err(ApiError::wrong_credentials())
      }
    }
  }
}

// ─── addAsFriend ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AddAsFriend {
  pub name: String,
}

impl<S: DirectoryStore> Resolve<S> for AddAsFriend {
  type Output = UserView;

  async fn resolve(self, directory: &Directory<S>, ctx: &AuthContext) -> Result<UserView> {
    let user = ctx.current_user().ok_or(ApiError::Forbidden)?;
    let store = directory.store();

    let person = store
      .find_person(&self.name)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("person {} not found", self.name)))?;

    if user.is_friend(person.id) {
      return Ok(user.clone());
    }

    store.add_friend(user.id, person.id).await.map_err(ApiError::store)?;
    tracing::info!(user = %user.id, person = %person.id, "friend added");
    Ok(user.with_friend(person))
  }
}
