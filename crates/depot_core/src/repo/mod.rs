//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Keep SQL text and row mapping out of service orchestration.
//! - Report absence as a semantic `NotFound` next to store transport errors.

pub mod geography_repo;
