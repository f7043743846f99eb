mod models;
mod ownership;
mod schema;
mod store;
mod trait_def;

pub use models::*;
pub use ownership::{is_owner, Owned};
pub use schema::CATALOG_VERSIONED_SCHEMAS;
pub use store::SqliteCatalogStore;
pub use trait_def::{CatalogStore, Page, PlaylistQuery, PlaylistScope, TrackQuery, TrackScope};
