//! SQLite schema for tracks and playlists.
//!
//! Owner columns hold user ids from the user database and carry no foreign
//! key: removing an account leaves its tracks and playlists in place.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

const TRACKS_TABLE_V_0: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text),
        sqlite_column!("cover", &SqlType::Text),
        sqlite_column!("url", &SqlType::Text, non_null = true),
        sqlite_column!("uploaded_by", &SqlType::Integer, non_null = true),
        // Unix millis.
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_tracks_created", "created"),
        ("idx_tracks_uploaded_by", "uploaded_by"),
    ],
    unique_constraints: &[&["name", "artist"]],
};

const PLAYLISTS_TABLE_V_0: Table = Table {
    name: "playlists",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("public", &SqlType::Integer, non_null = true),
        sqlite_column!("cover_name", &SqlType::Text),
        sqlite_column!("cover_url", &SqlType::Text),
        sqlite_column!("created_by", &SqlType::Integer, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_playlists_created", "created"),
        ("idx_playlists_created_by", "created_by"),
    ],
    unique_constraints: &[],
};

const PLAYLIST_TRACKS_TABLE_V_0: Table = Table {
    name: "playlist_tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "playlist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "playlists",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "tracks",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
    ],
    indices: &[("idx_playlist_tracks_playlist", "playlist_id")],
    unique_constraints: &[&["playlist_id", "track_id"]],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        TRACKS_TABLE_V_0,
        PLAYLISTS_TABLE_V_0,
        PLAYLIST_TRACKS_TABLE_V_0,
    ],
    migration: None,
}];
