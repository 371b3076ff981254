//! Entity model: identity contract, capabilities and relation descriptors.
//!
//! # Invariants
//! - Every persisted entity has `id > 0` and a creation timestamp.
//! - Relations are declared explicitly per entity type, never discovered.

pub mod capability;
pub mod entity;
pub mod relation;
