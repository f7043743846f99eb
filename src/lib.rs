//! Musicverse Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog_store;
pub mod config;
pub mod email;
pub mod error;
pub mod library;
pub mod listing;
pub mod media;
pub mod metadata;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogStore, SqliteCatalogStore};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use server::{run_server, RequestsLoggingLevel, ServerConfig};
pub use user::{SqliteUserStore, UserStore};
