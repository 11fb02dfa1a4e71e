//! Lazily materialized object graph over the key-value store.
//!
//! # Responsibility
//! - Model directory -> users -> notes as a strict ownership tree.
//! - Defer field reads until first access and write changes through.
//!
//! # Invariants
//! - Parents hold children by value; no entity refers back to its parent.
//! - Every entity tracks `LoadState`; deleted handles reject further use.
//! - Create/delete sequences are not transactional. An entity's own keys are
//!   written before its membership record and a crash mid-sequence may leave
//!   an orphan, never a dangling membership entry on create.

pub mod directory;
pub mod error;
pub mod keys;
pub mod name;
pub mod note;
pub mod state;
pub mod user;
