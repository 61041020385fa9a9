//! # Shiftlist DB
//!
//! SQLite implementation of the `TaskDatastore` seam plus the administrative
//! reference-data operations (stores, users, templates) around it.

pub mod admin;
pub mod db;
pub mod seed;

pub use admin::Administration;
pub use db::{SqliteDb, TemplateDraft};
pub use seed::{SeedSummary, seed_demo};
