//! Database seeding.
//!
//! The [`Seeder`] wipes the store and writes the fixed demo dataset in
//! dependency order, one committed stage at a time.

mod seeder;

pub use seeder::{SeedError, SeedSummary, Seeder, Stage, local_today};
