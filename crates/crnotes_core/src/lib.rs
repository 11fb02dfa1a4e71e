//! Core of the CRNotes personal note service.
//!
//! A lazily materialized object graph (directory -> users -> notes) over a
//! key-value store. Outer layers (HTTP, CLI) talk to `NoteService`.

pub mod config;
pub mod db;
pub mod kv;
pub mod logging;
pub mod model;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use kv::{InMemoryStore, KeyValueStore, KvError, KvResult, SharedStore, SqliteStore};
pub use logging::{init_logging, logging_status, LogLevel};
pub use model::directory::NoteDirectory;
pub use model::error::{CoreError, CoreResult};
pub use model::keys::{EntityKind, IdAllocator};
pub use model::name::{is_safe_name, validate_name, NameError};
pub use model::note::{Note, NoteView};
pub use model::state::LoadState;
pub use model::user::User;
pub use service::note_service::{NoteService, NoteServiceError, NoteUpdate};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
