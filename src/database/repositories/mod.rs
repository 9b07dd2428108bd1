//! Repository layer
//!
//! Data access objects for the Postgres-backed user directory

pub mod user;

pub use user::UserRepository;
