//! Metadata catalog: a durable store over `files` and `chunks`, backed by
//! `rusqlite`.
//!
//! `Connection` isn't `Sync`, so the catalog serializes access itself behind
//! a `Mutex` — callers may invoke it concurrently without worrying about the
//! underlying connection.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMetadata {
    pub name: String,
    pub version: i64,
    pub hash: String,
    pub size: i64,
    pub deleted: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlacement {
    pub file_name: String,
    pub chunk_index: i64,
    pub shard_index: i64,
    pub node_id: String,
}

pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    /// Opens (creating if absent) the catalog at `path` and ensures its
    /// schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let conn = Connection::open(path)?;
        let catalog = Catalog {
            conn: Mutex::new(conn),
        };
        catalog.init()?;
        Ok(catalog)
    }

    pub fn open_in_memory() -> Result<Self, SyncError> {
        let conn = Connection::open_in_memory()?;
        let catalog = Catalog {
            conn: Mutex::new(conn),
        };
        catalog.init()?;
        Ok(catalog)
    }

    fn init(&self) -> Result<(), SyncError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS files (
                name TEXT PRIMARY KEY,
                version INTEGER NOT NULL,
                hash TEXT NOT NULL,
                size INTEGER NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0,
                timestamp INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS chunks (
                file_name TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                shard_index INTEGER NOT NULL DEFAULT 0,
                node_id TEXT NOT NULL,
                PRIMARY KEY (file_name, chunk_index, shard_index)
            );",
        )?;
        Ok(())
    }

    /// Inserts or updates a file's metadata. Version is 1 on first upload
    /// and increments by one on every re-upload of the same name.
    pub fn upsert_file(&self, name: &str, hash: &str, size: i64, timestamp: i64) -> Result<i64, SyncError> {
        let conn = self.conn.lock();
        let prev_version: Option<i64> = conn
            .query_row("SELECT version FROM files WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()?;
        let version = prev_version.map(|v| v + 1).unwrap_or(1);
        conn.execute(
            "INSERT INTO files (name, version, hash, size, deleted, timestamp)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)
             ON CONFLICT(name) DO UPDATE SET
                version = excluded.version,
                hash = excluded.hash,
                size = excluded.size,
                deleted = 0,
                timestamp = excluded.timestamp",
            params![name, version, hash, size, timestamp],
        )?;
        Ok(version)
    }

    pub fn get_file(&self, name: &str) -> Result<Option<FileMetadata>, SyncError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT name, version, hash, size, deleted, timestamp FROM files WHERE name = ?1",
            params![name],
            |row| {
                Ok(FileMetadata {
                    name: row.get(0)?,
                    version: row.get(1)?,
                    hash: row.get(2)?,
                    size: row.get(3)?,
                    deleted: row.get::<_, i64>(4)? != 0,
                    timestamp: row.get(5)?,
                })
            },
        )
        .optional()
        .map_err(SyncError::from)
    }

    /// All files excluding those marked deleted.
    pub fn list_live_files(&self) -> Result<Vec<FileMetadata>, SyncError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name, version, hash, size, deleted, timestamp FROM files WHERE deleted = 0",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FileMetadata {
                name: row.get(0)?,
                version: row.get(1)?,
                hash: row.get(2)?,
                size: row.get(3)?,
                deleted: row.get::<_, i64>(4)? != 0,
                timestamp: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(SyncError::from)
    }

    pub fn upsert_chunk(&self, placement: &ChunkPlacement) -> Result<(), SyncError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chunks (file_name, chunk_index, shard_index, node_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(file_name, chunk_index, shard_index) DO UPDATE SET node_id = excluded.node_id",
            params![
                placement.file_name,
                placement.chunk_index,
                placement.shard_index,
                placement.node_id
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_get_round_trips() {
        let cat = Catalog::open_in_memory().unwrap();
        let version = cat.upsert_file("a.txt", "deadbeef", 10, 1_000).unwrap();
        assert_eq!(version, 1);
        let meta = cat.get_file("a.txt").unwrap().unwrap();
        assert_eq!(meta.hash, "deadbeef");
        assert_eq!(meta.size, 10);
        assert!(!meta.deleted);
    }

    #[test]
    fn reupload_increments_version() {
        let cat = Catalog::open_in_memory().unwrap();
        cat.upsert_file("a.txt", "hash1", 10, 1_000).unwrap();
        let v2 = cat.upsert_file("a.txt", "hash2", 20, 2_000).unwrap();
        assert_eq!(v2, 2);
        let meta = cat.get_file("a.txt").unwrap().unwrap();
        assert_eq!(meta.hash, "hash2");
        assert_eq!(meta.size, 20);
    }

    #[test]
    fn get_missing_file_returns_none() {
        let cat = Catalog::open_in_memory().unwrap();
        assert!(cat.get_file("nope.txt").unwrap().is_none());
    }

    #[test]
    fn list_live_files_excludes_nothing_when_nothing_deleted() {
        let cat = Catalog::open_in_memory().unwrap();
        cat.upsert_file("a.txt", "h1", 1, 1).unwrap();
        cat.upsert_file("b.txt", "h2", 2, 2).unwrap();
        let live = cat.list_live_files().unwrap();
        assert_eq!(live.len(), 2);
    }

    #[test]
    fn chunk_placement_upserts_idempotently() {
        let cat = Catalog::open_in_memory().unwrap();
        let placement = ChunkPlacement {
            file_name: "a.txt".into(),
            chunk_index: 0,
            shard_index: 0,
            node_id: "primary".into(),
        };
        cat.upsert_chunk(&placement).unwrap();
        cat.upsert_chunk(&placement).unwrap();
    }
}
