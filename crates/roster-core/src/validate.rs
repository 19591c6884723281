//! Field constraints enforced by every store backend before a write.
//!
//! Length checks are pure and run here; uniqueness needs the store and is
//! reported through [`ValidationError::unique`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::{
  person::{NewPerson, Person},
  user::NewUser,
};

pub const PERSON_NAME_MIN: usize = 5;
pub const PERSON_PHONE_MIN: usize = 5;
pub const PERSON_STREET_MIN: usize = 5;
pub const PERSON_CITY_MIN: usize = 3;
pub const USERNAME_MIN: usize = 3;

// ─── Error ───────────────────────────────────────────────────────────────────

/// The collection a violation was raised against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
  Person,
  User,
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Person => f.write_str("person"),
      Self::User => f.write_str("user"),
    }
  }
}

/// The constraint a field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
  Required,
  MinLength { min: usize },
  Unique,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
  pub field: &'static str,
  #[serde(flatten)]
  pub rule:  Rule,
}

impl fmt::Display for FieldViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.rule {
      Rule::Required => write!(f, "`{}` is required", self.field),
      Rule::MinLength { min } => {
        write!(f, "`{}` must be at least {min} characters", self.field)
      }
      Rule::Unique => write!(f, "`{}` must be unique", self.field),
    }
  }
}

/// A rejected write. Carries every offending field; nothing was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{entity} validation failed: {}", joined(.violations))]
pub struct ValidationError {
  pub entity:     Entity,
  pub violations: Vec<FieldViolation>,
}

impl ValidationError {
  pub fn unique(entity: Entity, field: &'static str) -> Self {
    Self {
      entity,
      violations: vec![FieldViolation { field, rule: Rule::Unique }],
    }
  }

  /// Names of the offending fields, in report order.
  pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.violations.iter().map(|v| v.field)
  }

  pub fn has(&self, field: &str, rule: Rule) -> bool {
    self.violations.iter().any(|v| v.field == field && v.rule == rule)
  }
}

fn joined(violations: &[FieldViolation]) -> String {
  violations
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Checks ──────────────────────────────────────────────────────────────────

struct Checker {
  entity:     Entity,
  violations: Vec<FieldViolation>,
}

impl Checker {
  fn new(entity: Entity) -> Self { Self { entity, violations: Vec::new() } }

  fn required(&mut self, field: &'static str, value: &str, min: usize) {
    if value.is_empty() {
      self.violations.push(FieldViolation { field, rule: Rule::Required });
    } else {
      self.min_length(field, value, min);
    }
  }

  fn optional(&mut self, field: &'static str, value: Option<&str>, min: usize) {
    if let Some(value) = value {
      self.min_length(field, value, min);
    }
  }

  fn min_length(&mut self, field: &'static str, value: &str, min: usize) {
    if value.chars().count() < min {
      self
        .violations
        .push(FieldViolation { field, rule: Rule::MinLength { min } });
    }
  }

  fn finish(self) -> Result<(), ValidationError> {
    if self.violations.is_empty() {
      Ok(())
    } else {
      Err(ValidationError { entity: self.entity, violations: self.violations })
    }
  }
}

fn person_fields(
  name: &str,
  phone: Option<&str>,
  street: &str,
  city: &str,
) -> Result<(), ValidationError> {
  let mut c = Checker::new(Entity::Person);
  c.required("name", name, PERSON_NAME_MIN);
  c.optional("phone", phone, PERSON_PHONE_MIN);
  c.required("street", street, PERSON_STREET_MIN);
  c.required("city", city, PERSON_CITY_MIN);
  c.finish()
}

pub fn new_person(input: &NewPerson) -> Result<(), ValidationError> {
  person_fields(&input.name, input.phone.as_deref(), &input.street, &input.city)
}

pub fn person(p: &Person) -> Result<(), ValidationError> {
  person_fields(&p.name, p.phone.as_deref(), &p.street, &p.city)
}

pub fn new_user(input: &NewUser) -> Result<(), ValidationError> {
  let mut c = Checker::new(Entity::User);
  c.required("username", &input.username, USERNAME_MIN);
  c.finish()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn input(name: &str, phone: Option<&str>, street: &str, city: &str) -> NewPerson {
    NewPerson {
      name:   name.into(),
      phone:  phone.map(str::to_owned),
      street: street.into(),
      city:   city.into(),
    }
  }

  #[test]
  fn valid_person_passes() {
    let p = input("Arto Hellas", Some("040-123543"), "Tapiolankatu 5", "Espoo");
    assert!(new_person(&p).is_ok());
    assert!(new_person(&input("Venla", None, "Katu 1", "Oulu")).is_ok());
  }

  #[test]
  fn reports_every_offending_field() {
    let err = new_person(&input("Ada", Some("12"), "", "Po")).unwrap_err();
    assert_eq!(err.entity, Entity::Person);
    assert_eq!(err.fields().collect::<Vec<_>>(), ["name", "phone", "street", "city"]);
    assert!(err.has("name", Rule::MinLength { min: PERSON_NAME_MIN }));
    assert!(err.has("street", Rule::Required));
  }

  #[test]
  fn length_counts_characters_not_bytes() {
    // five characters, ten bytes
    assert!(new_person(&input("ääööå", None, "Katu 1", "Oulu")).is_ok());
  }

  #[test]
  fn username_minimum() {
    assert!(new_user(&NewUser { username: "mluukkai".into() }).is_ok());
    let err = new_user(&NewUser { username: "ml".into() }).unwrap_err();
    assert!(err.has("username", Rule::MinLength { min: USERNAME_MIN }));
  }

  #[test]
  fn display_lists_violations() {
    let err = ValidationError::unique(Entity::User, "username");
    assert_eq!(err.to_string(), "user validation failed: `username` must be unique");

    let err = new_person(&input("Ada", None, "Katu 1", "Po")).unwrap_err();
    assert_eq!(
      err.to_string(),
      "person validation failed: `name` must be at least 5 characters, \
       `city` must be at least 3 characters",
    );

    let source: &dyn std::error::Error = &err;
    assert!(source.source().is_none());
  }

  #[test]
  fn violation_serialises_flat() {
    let v = FieldViolation { field: "name", rule: Rule::MinLength { min: 5 } };
    let json = serde_json::to_value(&v).unwrap();
    assert_eq!(json, serde_json::json!({ "field": "name", "rule": "min_length", "min": 5 }));
  }
}
