//! Hospital records.
//!
//! Entity definitions for departments, doctors, patients, appointments and
//! medical records, plus the storage gateway used to create, wipe and populate
//! them. [`database::Database`] is the SQLite implementation of
//! [`store::StorageGateway`].

pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod store;

pub use config::Settings;
pub use database::{Database, DbSession};
pub use errors::StoreError;
pub use store::{ScopedSession, Session, StorageGateway};
