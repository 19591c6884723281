//! SQL schema for the Roster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- rowid order is insertion order; rows are never deleted.
CREATE TABLE IF NOT EXISTS persons (
    person_id  TEXT PRIMARY KEY,
    name       TEXT NOT NULL UNIQUE,
    phone      TEXT,
    street     TEXT NOT NULL,
    city       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id    TEXT PRIMARY KEY,
    username   TEXT NOT NULL UNIQUE
);

-- Ordered, duplicate-free friend references from a user to persons.
CREATE TABLE IF NOT EXISTS friendships (
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    person_id  TEXT NOT NULL REFERENCES persons(person_id),
    position   INTEGER NOT NULL,
    PRIMARY KEY (user_id, person_id)
);

CREATE INDEX IF NOT EXISTS friendships_order_idx ON friendships(user_id, position);

PRAGMA user_version = 1;
";
