//! SQLite-backed catalog store.

use super::models::{NewPlaylist, NewTrack, Playlist, PlaylistChanges, Track};
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::{CatalogStore, Page, PlaylistQuery, PlaylistScope, TrackQuery, TrackScope};
use crate::media::MediaDescriptor;
use crate::sqlite_persistence::open_versioned;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const TRACK_COLUMNS: &str = "t.id, t.name, t.artist, t.album, t.cover, t.url, t.uploaded_by, t.created";
const PLAYLIST_COLUMNS: &str =
    "id, name, description, public, cover_name, cover_url, created_by, created";

#[derive(Clone)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

/// `icontains(haystack, needle)`: case-insensitive substring test used by
/// name searches.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "icontains",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack: String = ctx.get(0)?;
            let needle: String = ctx.get(1)?;
            Ok(haystack.to_lowercase().contains(&needle.to_lowercase()))
        },
    )?;
    Ok(())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

fn to_sql_int(value: usize) -> Value {
    Value::Integer(i64::try_from(value).unwrap_or(i64::MAX))
}

fn parse_track_row(row: &rusqlite::Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        name: row.get(1)?,
        artist: row.get(2)?,
        album: row.get(3)?,
        cover: row.get(4)?,
        url: row.get(5)?,
        uploaded_by_user: row.get(6)?,
        created_at: timestamp(row.get(7)?),
    })
}

struct PlaylistRow {
    id: String,
    name: String,
    description: Option<String>,
    public: bool,
    cover_name: Option<String>,
    cover_url: Option<String>,
    created_by: usize,
    created: i64,
}

fn parse_playlist_row(row: &rusqlite::Row) -> rusqlite::Result<PlaylistRow> {
    Ok(PlaylistRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        public: row.get(3)?,
        cover_name: row.get(4)?,
        cover_url: row.get(5)?,
        created_by: row.get(6)?,
        created: row.get(7)?,
    })
}

fn playlist_track_ids(conn: &Connection, playlist_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT track_id FROM playlist_tracks WHERE playlist_id = ?1 ORDER BY id",
    )?;
    let ids = stmt
        .query_map(params![playlist_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

fn into_playlist(conn: &Connection, row: PlaylistRow) -> Result<Playlist> {
    let tracks = playlist_track_ids(conn, &row.id)?;
    let cover = match (row.cover_name, row.cover_url) {
        (Some(name), Some(url)) => Some(MediaDescriptor { name, url }),
        _ => None,
    };
    Ok(Playlist {
        id: row.id,
        name: row.name,
        description: row.description,
        public: row.public,
        cover,
        created_by_user: row.created_by,
        tracks,
        created_at: timestamp(row.created),
    })
}

/// Appends the ordering and window shared by every list query.
fn push_page(sql: &mut String, values: &mut Vec<Value>, order_prefix: &str, page: Page) {
    sql.push_str(&format!(
        " ORDER BY {p}created DESC, {p}rowid DESC LIMIT ?{} OFFSET ?{}",
        values.len() + 1,
        values.len() + 2,
        p = order_prefix
    ));
    values.push(to_sql_int(page.take));
    values.push(to_sql_int(page.skip));
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, CATALOG_VERSIONED_SCHEMAS, "catalog")?;
        register_functions(&conn)?;

        let tracks: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;
        let playlists: i64 = conn.query_row("SELECT COUNT(*) FROM playlists", [], |r| r.get(0))?;
        info!(
            "Opened catalog with {} tracks and {} playlists",
            tracks, playlists
        );

        Ok(SqliteCatalogStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Catalog db connection lock is poisoned"))
    }

    fn get_track_inner(conn: &Connection, id: &str) -> Result<Option<Track>> {
        let track = conn
            .query_row(
                &format!("SELECT {} FROM tracks t WHERE t.id = ?1", TRACK_COLUMNS),
                params![id],
                parse_track_row,
            )
            .optional()?;
        Ok(track)
    }

    fn get_playlist_inner(conn: &Connection, id: &str) -> Result<Option<Playlist>> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM playlists WHERE id = ?1", PLAYLIST_COLUMNS),
                params![id],
                parse_playlist_row,
            )
            .optional()?;
        row.map(|row| into_playlist(conn, row)).transpose()
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn insert_track(&self, new_track: &NewTrack) -> Result<Track> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tracks (id, name, artist, album, cover, url, uploaded_by, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new_track.id,
                new_track.name,
                new_track.artist,
                new_track.album,
                new_track.cover,
                new_track.url,
                new_track.uploaded_by_user,
                now_millis(),
            ],
        )
        .with_context(|| format!("Failed to insert track {}", new_track.id))?;
        Self::get_track_inner(&conn, &new_track.id)?
            .with_context(|| format!("Track {} missing after insert", new_track.id))
    }

    fn get_track(&self, id: &str) -> Result<Option<Track>> {
        let conn = self.conn()?;
        Self::get_track_inner(&conn, id)
    }

    fn find_track(&self, name: &str, artist: &str) -> Result<Option<Track>> {
        let conn = self.conn()?;
        let track = conn
            .query_row(
                &format!(
                    "SELECT {} FROM tracks t WHERE t.name = ?1 AND t.artist = ?2",
                    TRACK_COLUMNS
                ),
                params![name, artist],
                parse_track_row,
            )
            .optional()?;
        Ok(track)
    }

    fn delete_track(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn list_tracks(&self, query: &TrackQuery) -> Result<Vec<Track>> {
        let mut sql = format!("SELECT {} FROM tracks t", TRACK_COLUMNS);
        let mut conditions: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        match &query.scope {
            TrackScope::All => {}
            TrackScope::Ids(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = (0..ids.len())
                    .map(|i| format!("?{}", values.len() + i + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                conditions.push(format!("t.id IN ({})", placeholders));
                values.extend(ids.iter().cloned().map(Value::Text));
            }
            TrackScope::InPlaylist(playlist_id) => {
                sql.push_str(" JOIN playlist_tracks pt ON pt.track_id = t.id");
                values.push(Value::Text(playlist_id.clone()));
                conditions.push(format!("pt.playlist_id = ?{}", values.len()));
            }
        }
        if let Some(search) = &query.search {
            values.push(Value::Text(search.clone()));
            conditions.push(format!("icontains(t.name, ?{})", values.len()));
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        push_page(&mut sql, &mut values, "t.", query.page);
        debug!("list_tracks: {}", sql);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let tracks = stmt
            .query_map(params_from_iter(values), parse_track_row)?
            .collect::<rusqlite::Result<Vec<Track>>>()?;
        Ok(tracks)
    }

    fn count_tracks(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn insert_playlist(&self, new_playlist: &NewPlaylist) -> Result<Playlist> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO playlists (id, name, description, public, cover_name, cover_url, created_by, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new_playlist.id,
                new_playlist.name,
                new_playlist.description,
                new_playlist.public,
                new_playlist.cover.as_ref().map(|c| c.name.as_str()),
                new_playlist.cover.as_ref().map(|c| c.url.as_str()),
                new_playlist.created_by_user,
                now_millis(),
            ],
        )
        .with_context(|| format!("Failed to insert playlist {}", new_playlist.id))?;
        Self::get_playlist_inner(&conn, &new_playlist.id)?
            .with_context(|| format!("Playlist {} missing after insert", new_playlist.id))
    }

    fn get_playlist(&self, id: &str) -> Result<Option<Playlist>> {
        let conn = self.conn()?;
        Self::get_playlist_inner(&conn, id)
    }

    fn list_playlists(&self, query: &PlaylistQuery) -> Result<Vec<Playlist>> {
        let mut sql = format!("SELECT {} FROM playlists", PLAYLIST_COLUMNS);
        let mut values: Vec<Value> = Vec::new();
        let mut conditions: Vec<String> = Vec::new();

        match query.scope {
            PlaylistScope::Public => conditions.push("public = 1".to_string()),
            PlaylistScope::CreatedBy(user_id) => {
                values.push(to_sql_int(user_id));
                conditions.push(format!("created_by = ?{}", values.len()));
            }
        }
        if let Some(search) = &query.search {
            values.push(Value::Text(search.clone()));
            conditions.push(format!("icontains(name, ?{})", values.len()));
        }
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
        push_page(&mut sql, &mut values, "", query.page);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), parse_playlist_row)?
            .collect::<rusqlite::Result<Vec<PlaylistRow>>>()?;
        rows.into_iter()
            .map(|row| into_playlist(&conn, row))
            .collect()
    }

    fn count_playlists(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM playlists", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn update_playlist(&self, id: &str, changes: &PlaylistChanges) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut updated = 0;
        if let Some(name) = &changes.name {
            updated = tx.execute(
                "UPDATE playlists SET name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
        }
        if let Some(cover) = &changes.cover {
            updated = tx.execute(
                "UPDATE playlists SET cover_name = ?1, cover_url = ?2 WHERE id = ?3",
                params![cover.name, cover.url, id],
            )?;
        }
        tx.commit()?;
        Ok(updated > 0)
    }

    fn add_playlist_track(&self, playlist_id: &str, track_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO playlist_tracks (playlist_id, track_id) VALUES (?1, ?2)",
                params![playlist_id, track_id],
            )
            .with_context(|| format!("Failed to add track {} to {}", track_id, playlist_id))?;
        Ok(inserted > 0)
    }

    fn remove_playlist_track(&self, playlist_id: &str, track_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM playlist_tracks WHERE playlist_id = ?1 AND track_id = ?2",
            params![playlist_id, track_id],
        )?;
        Ok(removed > 0)
    }

    fn delete_playlist(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM playlists WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}
