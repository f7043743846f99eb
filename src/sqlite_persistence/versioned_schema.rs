use anyhow::{bail, Result};
use rusqlite::{params, types::Type, Connection};

/// Unix seconds at insert time.
pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

/// `PRAGMA user_version` is stored as `BASE_DB_VERSION + schema version` so a
/// foreign database (user_version 0) is never mistaken for ours.
pub const BASE_DB_VERSION: usize = 70000;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }

    fn parse(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            _ => None,
        }
    }
}

#[allow(unused)]
pub enum ForeignKeyOnChange {
    NoAction,
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<S>,
    pub foreign_key: Option<&'a ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

impl Table {
    fn create_sql(&self) -> String {
        let mut columns_sql = Vec::with_capacity(self.columns.len());
        for column in self.columns {
            let mut sql = format!("{} {}", column.name, column.sql_type.as_sql());
            if column.is_primary_key {
                sql.push_str(" PRIMARY KEY");
                // Row ids of deleted rows must never come back, records
                // elsewhere may still point at them.
                if *column.sql_type == SqlType::Integer {
                    sql.push_str(" AUTOINCREMENT");
                }
            }
            if column.non_null {
                sql.push_str(" NOT NULL");
            }
            if column.is_unique {
                sql.push_str(" UNIQUE");
            }
            if let Some(default_value) = column.default_value {
                sql.push_str(&format!(" DEFAULT {}", default_value));
            }
            if let Some(fk) = column.foreign_key {
                sql.push_str(&format!(
                    " REFERENCES {}({}) ON DELETE {}",
                    fk.foreign_table,
                    fk.foreign_column,
                    fk.on_delete.as_sql()
                ));
            }
            columns_sql.push(sql);
        }
        for unique_constraint in self.unique_constraints {
            columns_sql.push(format!("UNIQUE ({})", unique_constraint.join(", ")));
        }
        format!("CREATE TABLE {} ({});", self.name, columns_sql.join(", "))
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate_columns(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual_columns = stmt
            .query_map(params![], |row| {
                let type_name = row.get::<_, String>(2)?;
                let sql_type = SqlType::parse(&type_name).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(2, type_name.clone(), Type::Text)
                })?;
                Ok(Column {
                    name: row.get::<_, String>(1)?,
                    sql_type,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get::<_, Option<String>>(4)?,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                    is_unique: false,
                    foreign_key: None,
                })
            })?
            .collect::<Result<Vec<Column<'_, String>>, _>>()?;

        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}",
                self.name,
                actual_columns.len(),
                self.columns.len()
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != expected.sql_type
                || actual.non_null != expected.non_null
                || actual.is_primary_key != expected.is_primary_key
            {
                bail!(
                    "Table {} column {} definition mismatch",
                    self.name,
                    expected.name
                );
            }
            // SQLite may report defaults wrapped in parentheses.
            if actual.default_value.as_deref().map(strip_parentheses)
                != expected.default_value.map(strip_parentheses)
            {
                bail!(
                    "Table {} column {} default value mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.default_value,
                    actual.default_value
                );
            }
        }
        Ok(())
    }

    fn validate_indices(&self, conn: &Connection) -> Result<()> {
        for (index_name, _) in self.indices {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }

    fn validate_foreign_keys(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({})", self.name))?;
        // (from, table, to, on_delete)
        let actual_fks: Vec<(String, String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(3)?, row.get(2)?, row.get(4)?, row.get(6)?)))?
            .filter_map(|r| r.ok())
            .collect();

        for column in self.columns {
            let Some(fk) = column.foreign_key else {
                continue;
            };
            let found = actual_fks.iter().any(|(from, table, to, on_delete)| {
                from == column.name
                    && table == fk.foreign_table
                    && to == fk.foreign_column
                    && on_delete == fk.on_delete.as_sql()
            });
            if !found {
                bail!(
                    "Table {} column {} is missing foreign key: expected REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    fk.foreign_table,
                    fk.foreign_column,
                    fk.on_delete.as_sql()
                );
            }
        }
        Ok(())
    }
}

fn strip_parentheses<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();
    if s.starts_with('(') && s.ends_with(')') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate_columns(conn)?;
            table.validate_indices(conn)?;
            table.validate_foreign_keys(conn)?;
        }
        Ok(())
    }
}
