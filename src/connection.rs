//! DuckDB connection wrapper with schema migrations and query execution.
//!
//! Migrations are embedded in the binary and applied in version order. The
//! applied version is recorded in a single-row `schema_version` table.

use crate::error::{CoopGamesError, Result};
use duckdb::{types::ValueRef, Connection as DuckDbConnection};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;

/// A schema migration: the version it brings the database to and its SQL file.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Migrations shipped with the crate, in ascending version order.
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "001_create_games.sql",
            sql: include_str!("../migrations/001_create_games.sql"),
        },
        Migration {
            version: 2,
            name: "002_country_data.sql",
            sql: include_str!("../migrations/002_country_data.sql"),
        },
    ]
}

/// Extract the section between `-- Up` and `-- Down` from a migration file.
///
/// Files without a `-- Up` marker are executed whole.
pub fn up_section(sql: &str) -> &str {
    let after_up = match sql.split_once("-- Up") {
        Some((_, rest)) => rest,
        None => sql,
    };
    match after_up.split_once("-- Down") {
        Some((up, _)) => up,
        None => after_up,
    }
}

/// Wraps a DuckDB connection holding the game catalogue.
pub struct Connection {
    conn: DuckDbConnection,
}

impl Connection {
    /// Open (or create) a file-backed database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = DuckDbConnection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Return the schema version recorded in the database (0 when fresh).
    pub fn schema_version(&self) -> Result<u32> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        )?;
        let version = self
            .execute_scalar("SELECT MAX(version) FROM schema_version", &[])?
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(version as u32)
    }

    /// Apply every embedded migration newer than the recorded schema version.
    ///
    /// Returns the resulting schema version. A failing migration stops the run
    /// and leaves the version at the last migration that succeeded.
    pub fn migrate(&self) -> Result<u32> {
        self.apply_migrations(&migrations())
    }

    /// Apply the given migrations (ascending order) on top of the current version.
    pub fn apply_migrations(&self, migrations: &[Migration]) -> Result<u32> {
        let start = self.schema_version()?;
        let mut version = start;

        for migration in migrations.iter().filter(|m| m.version > start) {
            // The version row commits together with the migration body
            let result = self.conn.execute_batch(&format!(
                "BEGIN TRANSACTION; {} ; \
                 DELETE FROM schema_version; \
                 INSERT INTO schema_version VALUES ({}); \
                 COMMIT;",
                up_section(migration.sql),
                migration.version
            ));
            if let Err(e) = result {
                let _ = self.conn.execute_batch("ROLLBACK");
                log::error!("Unable to run migration {}: {}", migration.name, e);
                return Err(CoopGamesError::Migration {
                    version: migration.version,
                    message: e.to_string(),
                });
            }
            version = migration.version;
            log::info!("Ran migration {:03}", version);
        }

        Ok(version)
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Each row is represented as a `HashMap<String, serde_json::Value>`.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let mut stmt = self.conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the query has run
        let column_names: Vec<String> = match rows.as_ref() {
            Some(stmt) => stmt.column_names().into_iter().map(|s| s.to_string()).collect(),
            None => Vec::new(),
        };

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        while let Some(row) = rows.next()? {
            let mut map = HashMap::with_capacity(column_names.len());
            for (i, col_name) in column_names.iter().enumerate() {
                let value = convert_value_ref(row.get_ref(i)?);
                map.insert(col_name.clone(), value);
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(&self, sql: &str, params: &[String]) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(
                row.into_iter().collect::<serde_json::Map<String, serde_json::Value>>(),
            );
            let item: T = serde_json::from_value(value)?;
            results.push(item);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            Ok(Some(convert_value_ref(row.get_ref(0)?)))
        } else {
            Ok(None)
        }
    }

    /// Execute a single statement with typed parameters, returning affected rows.
    pub fn execute_typed(&self, sql: &str, params: &[&dyn duckdb::ToSql]) -> Result<usize> {
        Ok(self.conn.execute(sql, params)?)
    }

    /// Execute one or more statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(self.conn.execute_batch(sql)?)
    }

    /// Run `f` inside a transaction, committing on success and rolling back on error.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Access the underlying DuckDB connection for advanced usage.
    pub fn raw(&self) -> &DuckDbConnection {
        &self.conn
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UTinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::USmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UBigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            // HugeInt may not fit in i64; try i64, fallback to string
            if let Ok(i) = i64::try_from(n) {
                serde_json::Value::Number(i.into())
            } else {
                serde_json::Value::String(n.to_string())
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        // Dates are stored as ISO text, so other types never reach the models
        _ => serde_json::Value::Null,
    }
}
