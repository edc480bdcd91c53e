//! Function signature database.
//!
//! Stores `checksum -> (size, name, object)` for named functions so that the
//! same code can be recognised and renamed in another build, where it may sit
//! at a different address.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

use crate::symbols::{SymbolDb, SymbolKind};

/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Prefix of names given to functions found by analysis.
const ANALYZED_NAME_PREFIX: &str = "zz_";

#[derive(Debug, Error)]
pub enum SignatureDbError {
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

pub type SignatureDbResult<T> = Result<T, SignatureDbError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureRecord {
    pub checksum: u32,
    pub size: u32,
    pub name: String,
    pub object_name: String,
    /// RFC 3339 timestamp of the last time this checksum was written.
    pub added_at: String,
}

/// Outcome of [`SignatureDb::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub renamed: usize,
    /// Checksum matched but the sizes differed, so the function was left alone.
    pub size_mismatches: usize,
}

/// SQLite-backed signature store.
#[derive(Debug)]
pub struct SignatureDb {
    conn: Connection,
}

impl SignatureDb {
    /// Open (or create) a signature database at `path` and bring its schema up to date.
    pub fn open(path: &Path) -> SignatureDbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> SignatureDbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert or replace the signature for `record.checksum`.
    pub fn upsert(&self, record: &SignatureRecord) -> SignatureDbResult<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO signatures (checksum, size, name, object_name, added_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                i64::from(record.checksum),
                i64::from(record.size),
                record.name,
                record.object_name,
                record.added_at
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, checksum: u32) -> SignatureDbResult<Option<SignatureRecord>> {
        let record = self
            .conn
            .query_row(
                r#"
                SELECT checksum, size, name, object_name, added_at
                FROM signatures
                WHERE checksum = ?1
                "#,
                params![i64::from(checksum)],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// All signatures ordered by checksum.
    pub fn list(&self) -> SignatureDbResult<Vec<SignatureRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT checksum, size, name, object_name, added_at
            FROM signatures
            ORDER BY checksum
            "#,
        )?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn len(&self) -> SignatureDbResult<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM signatures", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> SignatureDbResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Record every named, analysed function of `symbols`.
    ///
    /// Functions still carrying an analysis placeholder name are skipped.
    /// With a `filter`, only names containing it are taken. Returns the
    /// number of signatures written.
    pub fn populate(&self, symbols: &SymbolDb, filter: Option<&str>) -> SignatureDbResult<usize> {
        let added_at = chrono::Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO signatures (checksum, size, name, object_name, added_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for symbol in symbols.symbols() {
                if symbol.kind != SymbolKind::Function
                    || symbol.checksum == 0
                    || symbol.name.starts_with(ANALYZED_NAME_PREFIX)
                {
                    continue;
                }
                if filter.is_some_and(|filter| !symbol.name.contains(filter)) {
                    continue;
                }
                stmt.execute(params![
                    i64::from(symbol.checksum),
                    i64::from(symbol.size),
                    symbol.name,
                    symbol.object_name,
                    added_at
                ])?;
                written += 1;
            }
        }
        tx.commit()?;
        tracing::info!(written, "signatures populated");
        Ok(written)
    }

    /// Rename every function of `symbols` whose checksum and size match a stored signature.
    pub fn apply(&self, symbols: &SymbolDb) -> SignatureDbResult<ApplyReport> {
        let mut report = ApplyReport::default();
        for record in self.list()? {
            for symbol in symbols.symbols_with_checksum(record.checksum) {
                if symbol.size != record.size {
                    tracing::warn!(
                        name = %record.name,
                        addr = format_args!("{:#010x}", symbol.address),
                        expected = record.size,
                        found = symbol.size,
                        "signature size mismatch"
                    );
                    report.size_mismatches += 1;
                    continue;
                }
                let object_name = (!record.object_name.is_empty()).then_some(record.object_name.as_str());
                if symbols.rename(symbol.address, &record.name, object_name) {
                    tracing::debug!(
                        name = %record.name,
                        addr = format_args!("{:#010x}", symbol.address),
                        "signature applied"
                    );
                    report.renamed += 1;
                }
            }
        }
        symbols.rebuild_call_graph();
        Ok(report)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SignatureRecord> {
    let checksum: i64 = row.get(0)?;
    let size: i64 = row.get(1)?;
    Ok(SignatureRecord {
        checksum: checksum as u32,
        size: size as u32,
        name: row.get(2)?,
        object_name: row.get(3)?,
        added_at: row.get(4)?,
    })
}

fn current_schema_version(conn: &Connection) -> SignatureDbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

fn apply_migrations(conn: &Connection) -> SignatureDbResult<()> {
    let mut current_version = current_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(SignatureDbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS signatures (
                checksum INTEGER PRIMARY KEY,
                size     INTEGER NOT NULL,
                name     TEXT NOT NULL
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
        current_version = 1;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            ALTER TABLE signatures ADD COLUMN object_name TEXT NOT NULL DEFAULT '';
            ALTER TABLE signatures ADD COLUMN added_at TEXT NOT NULL DEFAULT '';

            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}
