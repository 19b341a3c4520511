//! SQLite repositories

pub mod resource;
