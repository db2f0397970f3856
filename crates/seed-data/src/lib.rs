//! Demo data for the hospital records store.
//!
//! This crate holds the fixed demo dataset and the staged seeder that resets a
//! store to it.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use seed_data::prelude::*;
//!
//! let db = Database::connect("sqlite://hospital.db").await?;
//! db.create_tables().await?;
//! let summary = Seeder::new(db).seed().await?;
//! ```

pub mod db;
pub mod fixtures;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::db::{SeedError, SeedSummary, Seeder, Stage};
    pub use crate::fixtures::DemoDataset;
    pub use hospital::{Database, StorageGateway};
}
