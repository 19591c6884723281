//! [`SqliteStore`] — the SQLite implementation of [`DirectoryStore`].

use std::path::Path;

use roster_core::{
  person::{NewPerson, Person, PhoneFilter},
  store::DirectoryStore,
  user::{NewUser, User, UserView},
  validate::{self, Entity, ValidationError},
};
use uuid::Uuid;

use crate::{
  encode::{
    PERSON_COLUMNS, RawPerson, RawUser, RawUserView, encode_uuid, is_unique_violation,
    load_user, row_exists,
  },
  schema::SCHEMA,
  Error, Result,
};

/// Outcome of a write that SQLite may reject on a UNIQUE constraint.
enum Write {
  Done,
  Duplicate,
  Missing,
}

/// Outcome of [`SqliteStore::add_friend`]'s transaction.
enum Link {
  Linked(Option<RawUser>),
  NoPerson,
  NoUser,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A directory store backed by a single SQLite file.
///
/// Clones share the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── DirectoryStore impl ─────────────────────────────────────────────────────

impl DirectoryStore for SqliteStore {
  type Error = Error;

  // ── Persons ───────────────────────────────────────────────────────────────

  async fn count_persons(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM persons", [], |row| row.get(0))?)
      })
      .await?;
    Ok(count as u64)
  }

  async fn list_persons(&self, filter: Option<PhoneFilter>) -> Result<Vec<Person>> {
    let condition = match filter {
      None => "",
      Some(PhoneFilter::Yes) => "WHERE phone IS NOT NULL AND phone <> ''",
      Some(PhoneFilter::No) => "WHERE phone IS NULL OR phone = ''",
    };

    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons {condition} ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map([], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn find_person(&self, name: &str) -> Result<Option<Person>> {
    use rusqlite::OptionalExtension as _;

    let name = name.to_owned();
    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE name = ?1"),
              rusqlite::params![name],
              RawPerson::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn insert_person(&self, input: NewPerson) -> Result<Person> {
    validate::new_person(&input)?;

    let person = input.into_person(Uuid::new_v4());
    let row = person.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO persons (person_id, name, phone, street, city)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![encode_uuid(row.id), row.name, row.phone, row.street, row.city],
        );
        match result {
          Ok(_) => Ok(Write::Done),
          Err(e) if is_unique_violation(&e) => Ok(Write::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match outcome {
      Write::Duplicate => Err(ValidationError::unique(Entity::Person, "name").into()),
      Write::Done | Write::Missing => Ok(person),
    }
  }

  async fn update_person(&self, person: Person) -> Result<Person> {
    validate::person(&person)?;

    let row = person.clone();
    let outcome = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "UPDATE persons SET name = ?2, phone = ?3, street = ?4, city = ?5
           WHERE person_id = ?1",
          rusqlite::params![encode_uuid(row.id), row.name, row.phone, row.street, row.city],
        );
        match result {
          Ok(0) => Ok(Write::Missing),
          Ok(_) => Ok(Write::Done),
          Err(e) if is_unique_violation(&e) => Ok(Write::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match outcome {
      Write::Done => Ok(person),
      Write::Duplicate => Err(ValidationError::unique(Entity::Person, "name").into()),
      Write::Missing => Err(Error::PersonNotFound(person.id)),
    }
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn insert_user(&self, input: NewUser) -> Result<User> {
    validate::new_user(&input)?;

    let user = User {
      id:       Uuid::new_v4(),
      username: input.username,
      friends:  Vec::new(),
    };
    let id_str   = encode_uuid(user.id);
    let username = user.username.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO users (user_id, username) VALUES (?1, ?2)",
          rusqlite::params![id_str, username],
        ) {
          Ok(_) => Ok(Write::Done),
          Err(e) if is_unique_violation(&e) => Ok(Write::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match outcome {
      Write::Duplicate => Err(ValidationError::unique(Entity::User, "username").into()),
      Write::Done | Write::Missing => Ok(user),
    }
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_user(conn, "user_id", &id_str)?))
      .await?;
    raw.map(|r| r.into_user()).transpose()
  }

  async fn find_user(&self, username: &str) -> Result<Option<User>> {
    let username = username.to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(load_user(conn, "username", &username)?))
      .await?;
    raw.map(|r| r.into_user()).transpose()
  }

  async fn materialize_user(&self, id: Uuid) -> Result<Option<UserView>> {
    use rusqlite::OptionalExtension as _;

    let id_str = encode_uuid(id);
    let raw: Option<RawUserView> = self
      .conn
      .call(move |conn| {
        let username: Option<String> = conn
          .query_row(
            "SELECT username FROM users WHERE user_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;

        let Some(username) = username else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT p.person_id, p.name, p.phone, p.street, p.city
           FROM friendships f
           JOIN persons p ON p.person_id = f.person_id
           WHERE f.user_id = ?1
           ORDER BY f.position",
        )?;
        let friends = stmt
          .query_map(rusqlite::params![id_str], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(RawUserView { user_id: id_str, username, friends }))
      })
      .await?;

    raw.map(RawUserView::into_view).transpose()
  }

  async fn add_friend(&self, user_id: Uuid, person_id: Uuid) -> Result<User> {
    let user_str   = encode_uuid(user_id);
    let person_str = encode_uuid(person_id);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !row_exists(&tx, "SELECT 1 FROM persons WHERE person_id = ?1", &person_str)? {
          return Ok(Link::NoPerson);
        }
        if !row_exists(&tx, "SELECT 1 FROM users WHERE user_id = ?1", &user_str)? {
          return Ok(Link::NoUser);
        }

        // Already-present friends are left where they are.
        tx.execute(
          "INSERT OR IGNORE INTO friendships (user_id, person_id, position)
           SELECT ?1, ?2, COALESCE(MAX(position) + 1, 0)
           FROM friendships WHERE user_id = ?1",
          rusqlite::params![user_str, person_str],
        )?;

        let user = load_user(&tx, "user_id", &user_str)?;
        tx.commit()?;
        Ok(Link::Linked(user))
      })
      .await?;

    match outcome {
      Link::Linked(Some(raw)) => raw.into_user(),
      Link::Linked(None) | Link::NoUser => Err(Error::UserNotFound(user_id)),
      Link::NoPerson => Err(Error::PersonNotFound(person_id)),
    }
  }
}
