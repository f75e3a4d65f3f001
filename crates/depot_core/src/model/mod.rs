//! Domain model for the geographic hierarchy.
//!
//! # Invariants
//! - Country 1-* Province 1-* Locality forms a strict three-level tree.
//! - Country/Province ids are store-assigned; Locality ids are caller-supplied.

pub mod geography;
