mod versioned_schema;

pub use versioned_schema::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Opens the database at `db_path`, creating the latest schema when the file is
/// new, then validates the on-disk version and runs pending migrations.
pub fn open_versioned<P: AsRef<Path>>(
    db_path: P,
    schemas: &[VersionedSchema],
    label: &str,
) -> Result<Connection> {
    let db_path = db_path.as_ref();
    let latest = schemas.last().context("No schema versions defined")?;

    let conn = if db_path.exists() {
        Connection::open(db_path)
            .with_context(|| format!("Failed to open {} db at {:?}", label, db_path))?
    } else {
        info!(
            "Creating {} db schema at version {} in {:?}",
            label, latest.version, db_path
        );
        let conn = Connection::open(db_path)?;
        latest.create(&conn)?;
        conn
    };
    conn.execute("PRAGMA foreign_keys = ON;", [])?;

    let db_version = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
        .context("Failed to read database version")?
        - BASE_DB_VERSION as i64;

    if db_version < 0 {
        bail!(
            "{} db at {:?} was not created by this server (version {})",
            label,
            db_path,
            db_version
        );
    }
    let version = db_version as usize;
    if version >= schemas.len() {
        bail!("{} db version {} is too new", label, version);
    }
    schemas[version].validate(&conn)?;

    let mut latest_from = version;
    for schema in schemas.iter().skip(version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating {} db from version {} to {}",
                label, latest_from, schema.version
            );
            migration_fn(&conn)?;
        }
        latest_from = schema.version;
    }
    if latest_from != version {
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;
    }

    Ok(conn)
}
