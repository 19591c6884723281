//! Events carried by the in-process fan-out bus.

use serde::{Deserialize, Serialize};

use crate::person::Person;

/// A named channel on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
  PersonAdded,
}

/// A transient notification; exists only between publish and delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum DirectoryEvent {
  PersonAdded(Person),
}

impl DirectoryEvent {
  pub fn topic(&self) -> Topic {
    match self {
      Self::PersonAdded(_) => Topic::PersonAdded,
    }
  }
}
