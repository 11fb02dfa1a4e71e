//! Use-case services.
//!
//! # Responsibility
//! - Offer the per-user note contract consumed by outer layers (HTTP, CLI).
//! - Keep callers decoupled from the object graph and store details.

pub mod note_service;
