// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes; query
//! modules accept `&Database` and go through [`Database::connection`].

use chrono::{DateTime, SecondsFormat, Utc};
use leadflow_core::LeadflowError;
use tokio_rusqlite::Connection;

use crate::migrations;

/// Handle to the single SQLite connection used by the storage layer.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, LeadflowError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LeadflowError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path.to_owned())
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| {
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        tracing::debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(&self) -> Result<(), LeadflowError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the crate-wide storage error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> LeadflowError {
    LeadflowError::Storage {
        source: Box::new(e),
    }
}

/// Encode a timestamp as fixed-width RFC 3339 with millisecond precision,
/// matching the ordering assumption in the schema.
pub(crate) fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a stored RFC 3339 timestamp, surfacing a conversion failure as a
/// rusqlite error so row mappers can use `?`.
pub(crate) fn decode_ts(idx: usize, raw: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Decode a stored UUID column the same way.
pub(crate) fn decode_uuid(idx: usize, raw: String) -> Result<uuid::Uuid, rusqlite::Error> {
    uuid::Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Decode an enum stored as snake_case TEXT via its `FromStr`.
pub(crate) fn decode_enum<T: std::str::FromStr>(
    idx: usize,
    raw: String,
) -> Result<T, rusqlite::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_database_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn migrations_seed_the_toggle_row() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("seed.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();

        let value: String = db
            .connection()
            .call(|conn| {
                let v = conn.query_row(
                    "SELECT value FROM settings WHERE key = 'auto_distribution'",
                    [],
                    |row| row.get(0),
                )?;
                Ok::<_, rusqlite::Error>(v)
            })
            .await
            .unwrap();
        assert_eq!(value, "false");

        db.close().await.unwrap();
    }

    #[test]
    fn timestamps_round_trip_with_fixed_width() {
        let now = Utc::now();
        let encoded = encode_ts(now);
        assert!(encoded.ends_with('Z'));
        let decoded = decode_ts(0, encoded.clone()).unwrap();
        assert_eq!(encode_ts(decoded), encoded);
    }
}
