use super::models::{AccountUpdate, NewUser, User, UserCollection};
use super::pending::{ConfirmationIntent, PendingAction};
use super::user_store::UserStore;
use crate::media::MediaDescriptor;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("username", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("password_hash", &SqlType::Text, non_null = true),
        sqlite_column!(
            "verified",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("pending_token", &SqlType::Text),
        sqlite_column!("pending_intent", &SqlType::Text),
        sqlite_column!("pending_expires", &SqlType::Integer),
        sqlite_column!("avatar_name", &SqlType::Text),
        sqlite_column!("avatar_url", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const USER_COLLECTION_TABLE_V_0: Table = Table {
    name: "user_collection",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("collection", &SqlType::Text, non_null = true),
        sqlite_column!("item_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_user_collection_user", "user_id")],
    unique_constraints: &[&["user_id", "collection", "item_id"]],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[USER_TABLE_V_0, USER_COLLECTION_TABLE_V_0],
    migration: None,
}];

const USER_COLUMNS: &str = "id, username, email, password_hash, verified, pending_token, pending_intent, pending_expires, avatar_name, avatar_url";

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

struct UserRow {
    id: usize,
    username: String,
    email: String,
    password_hash: String,
    verified: bool,
    pending_token: Option<String>,
    pending_intent: Option<String>,
    pending_expires: Option<i64>,
    avatar_name: Option<String>,
    avatar_url: Option<String>,
}

fn read_user_row(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        verified: row.get::<_, i64>(4)? != 0,
        pending_token: row.get(5)?,
        pending_intent: row.get(6)?,
        pending_expires: row.get(7)?,
        avatar_name: row.get(8)?,
        avatar_url: row.get(9)?,
    })
}

fn pending_from_columns(
    token: Option<String>,
    intent: Option<String>,
    expires: Option<i64>,
) -> Result<PendingAction> {
    match (token, intent, expires) {
        (Some(token), Some(intent), Some(expires_at)) => Ok(PendingAction::pending(
            token,
            intent.parse::<ConfirmationIntent>()?,
            expires_at,
        )),
        _ => Ok(PendingAction::None),
    }
}

fn pending_to_columns(pending: &PendingAction) -> [Value; 3] {
    match pending {
        PendingAction::None => [Value::Null, Value::Null, Value::Null],
        PendingAction::Pending {
            token,
            intent,
            expires_at,
        } => [
            Value::Text(token.clone()),
            Value::Text(intent.as_str().to_string()),
            Value::Integer(*expires_at),
        ],
    }
}

fn optional_text(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

fn read_collection(
    conn: &Connection,
    user_id: usize,
    collection: UserCollection,
) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT item_id FROM user_collection WHERE user_id = ?1 AND collection = ?2",
    )?;
    let ids = stmt
        .query_map(params![user_id, collection.as_str()], |row| row.get(0))?
        .collect::<rusqlite::Result<HashSet<String>>>()?;
    Ok(ids)
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned(db_path, USER_VERSIONED_SCHEMAS, "user")?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("User db connection lock is poisoned"))
    }

    fn find_user(&self, column: &str, value: &dyn rusqlite::ToSql) -> Result<Option<User>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM user WHERE {} = ?1", USER_COLUMNS, column),
                params![value],
                read_user_row,
            )
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };

        let avatar = match (row.avatar_name, row.avatar_url) {
            (Some(name), Some(url)) => Some(MediaDescriptor { name, url }),
            _ => None,
        };
        Ok(Some(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            verified: row.verified,
            pending: pending_from_columns(row.pending_token, row.pending_intent, row.pending_expires)?,
            avatar,
            uploaded_tracks: read_collection(&conn, row.id, UserCollection::UploadedTracks)?,
            liked_tracks: read_collection(&conn, row.id, UserCollection::LikedTracks)?,
            playlists: read_collection(&conn, row.id, UserCollection::Playlists)?,
        }))
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, new_user: &NewUser) -> Result<usize> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user (username, email, password_hash) VALUES (?1, ?2, ?3)",
            params![new_user.username, new_user.email, new_user.password_hash],
        )
        .with_context(|| format!("Failed to create user {}", new_user.username))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<User>> {
        self.find_user("id", &user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user("email", &email)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_user("username", &username)
    }

    fn update_account(&self, user_id: usize, update: &AccountUpdate) -> Result<()> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(username) = &update.username {
            assignments.push("username");
            values.push(Value::Text(username.clone()));
        }
        if let Some(email) = &update.email {
            assignments.push("email");
            values.push(Value::Text(email.clone()));
        }
        if let Some(password_hash) = &update.password_hash {
            assignments.push("password_hash");
            values.push(Value::Text(password_hash.clone()));
        }
        if let Some(verified) = update.verified {
            assignments.push("verified");
            values.push(Value::Integer(verified as i64));
        }
        if let Some(pending) = &update.pending {
            assignments.extend(["pending_token", "pending_intent", "pending_expires"]);
            values.extend(pending_to_columns(pending));
        }
        if let Some(avatar) = &update.avatar {
            assignments.extend(["avatar_name", "avatar_url"]);
            values.push(optional_text(&avatar.as_ref().map(|a| a.name.clone())));
            values.push(optional_text(&avatar.as_ref().map(|a| a.url.clone())));
        }

        if assignments.is_empty() {
            return Ok(());
        }

        let set_clause = assignments
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        values.push(Value::Integer(user_id as i64));
        let sql = format!(
            "UPDATE user SET {} WHERE id = ?{}",
            set_clause,
            values.len()
        );
        debug!("update_account user_id={} columns={:?}", user_id, assignments);

        let conn = self.conn()?;
        let updated = conn
            .execute(&sql, params_from_iter(values))
            .with_context(|| format!("Failed to update user {}", user_id))?;
        if updated == 0 {
            anyhow::bail!("User {} does not exist", user_id);
        }
        Ok(())
    }

    fn delete_user(&self, user_id: usize) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM user WHERE id = ?1", params![user_id])?;
        Ok(deleted > 0)
    }

    fn add_to_collection(
        &self,
        user_id: usize,
        collection: UserCollection,
        item_id: &str,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO user_collection (user_id, collection, item_id) VALUES (?1, ?2, ?3)",
            params![user_id, collection.as_str(), item_id],
        )?;
        Ok(inserted > 0)
    }

    fn remove_from_collection(
        &self,
        user_id: usize,
        collection: UserCollection,
        item_id: &str,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM user_collection WHERE user_id = ?1 AND collection = ?2 AND item_id = ?3",
            params![user_id, collection.as_str(), item_id],
        )?;
        Ok(removed > 0)
    }

    fn get_collection(
        &self,
        user_id: usize,
        collection: UserCollection,
    ) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        read_collection(&conn, user_id, collection)
    }

    fn count_users(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteUserStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let temp_file_path = temp_dir.path().join("test.db");
        let store = SqliteUserStore::new(&temp_file_path).unwrap();
        (store, temp_dir)
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$fake".to_string(),
        }
    }

    #[test]
    fn test_create_user() {
        let (store, _temp_dir) = create_tmp_store();

        let user_id = store.create_user(&new_user("alice", "alice@mail.com")).unwrap();
        assert_eq!(user_id, 1);

        let user = store.get_user(user_id).unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(!user.verified);
        assert_eq!(user.pending, PendingAction::None);
        assert!(user.avatar.is_none());

        assert!(store.create_user(&new_user("alice", "other@mail.com")).is_err());
        assert!(store.create_user(&new_user("bob", "alice@mail.com")).is_err());
    }

    #[test]
    fn test_lookup_by_email_and_username() {
        let (store, _temp_dir) = create_tmp_store();
        let id = store.create_user(&new_user("alice", "alice@mail.com")).unwrap();

        assert_eq!(store.get_user_by_email("alice@mail.com").unwrap().unwrap().id, id);
        assert_eq!(store.get_user_by_username("alice").unwrap().unwrap().id, id);
        assert!(store.get_user_by_email("nobody@mail.com").unwrap().is_none());
        assert!(store.get_user(999).unwrap().is_none());
    }

    #[test]
    fn test_update_account_persists_pending_and_avatar() {
        let (store, _temp_dir) = create_tmp_store();
        let id = store.create_user(&new_user("alice", "alice@mail.com")).unwrap();

        let pending =
            PendingAction::pending("tok".to_string(), ConfirmationIntent::ChangeEmail, 1234);
        store
            .update_account(
                id,
                &AccountUpdate {
                    verified: Some(true),
                    pending: Some(pending.clone()),
                    avatar: Some(Some(MediaDescriptor {
                        name: "a.png".to_string(),
                        url: "http://x/a.png".to_string(),
                    })),
                    ..Default::default()
                },
            )
            .unwrap();

        let user = store.get_user(id).unwrap().unwrap();
        assert!(user.verified);
        assert_eq!(user.pending, pending);
        assert_eq!(user.avatar.unwrap().name, "a.png");

        store
            .update_account(id, &AccountUpdate::pending(PendingAction::None))
            .unwrap();
        let user = store.get_user(id).unwrap().unwrap();
        assert_eq!(user.pending, PendingAction::None);
        assert!(user.verified);
    }

    #[test]
    fn test_update_missing_user_fails() {
        let (store, _temp_dir) = create_tmp_store();
        let update = AccountUpdate {
            verified: Some(true),
            ..Default::default()
        };
        assert!(store.update_account(42, &update).is_err());
    }

    #[test]
    fn test_collections_are_sets() {
        let (store, _temp_dir) = create_tmp_store();
        let id = store.create_user(&new_user("alice", "alice@mail.com")).unwrap();

        assert!(store
            .add_to_collection(id, UserCollection::LikedTracks, "t1")
            .unwrap());
        assert!(!store
            .add_to_collection(id, UserCollection::LikedTracks, "t1")
            .unwrap());
        assert!(store
            .add_to_collection(id, UserCollection::UploadedTracks, "t1")
            .unwrap());

        let user = store.get_user(id).unwrap().unwrap();
        assert_eq!(user.liked_tracks.len(), 1);
        assert!(user.uploaded_tracks.contains("t1"));
        assert!(user.playlists.is_empty());

        assert!(store
            .remove_from_collection(id, UserCollection::LikedTracks, "t1")
            .unwrap());
        assert!(!store
            .remove_from_collection(id, UserCollection::LikedTracks, "t1")
            .unwrap());
    }

    #[test]
    fn test_delete_user_cascades_collections() {
        let (store, temp_dir) = create_tmp_store();
        let id = store.create_user(&new_user("alice", "alice@mail.com")).unwrap();
        store
            .add_to_collection(id, UserCollection::Playlists, "p1")
            .unwrap();

        assert!(store.delete_user(id).unwrap());
        assert!(!store.delete_user(id).unwrap());
        assert!(store.get_user(id).unwrap().is_none());
        assert_eq!(store.count_users().unwrap(), 0);

        drop(store);
        let reopened = SqliteUserStore::new(temp_dir.path().join("test.db")).unwrap();
        let conn = reopened.conn().unwrap();
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_collection", [], |r| r.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
