//! Database schema migrations for SQLite.
//!
//! Versioned, forward-only. Each version is applied in one transaction
//! together with its row in `schema_migrations`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: contents, grants, audit ledger.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Write-once metadata for each stored ciphertext
        CREATE TABLE contents (
            content_id TEXT PRIMARY KEY,      -- assigned by the content store
            iv BLOB NOT NULL,                 -- 12 bytes
            auth_tag BLOB NOT NULL,           -- 16 bytes
            content_hash BLOB NOT NULL,       -- 32 bytes, Blake3 of plaintext
            owner TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- One grant per (content, principal); re-grant replaces the row
        CREATE TABLE grants (
            content_id TEXT NOT NULL,
            principal_id TEXT NOT NULL,
            grant_id BLOB NOT NULL,           -- 32 bytes
            wrapped_key BLOB NOT NULL,        -- CBOR WrappedKey
            issued_at INTEGER NOT NULL,
            expires_at INTEGER,               -- NULL = permanent
            revoked INTEGER NOT NULL DEFAULT 0,
            revoked_at INTEGER,
            PRIMARY KEY (content_id, principal_id)
        );

        -- Append-only, hash-linked, signed
        CREATE TABLE audit_log (
            seq INTEGER PRIMARY KEY,
            timestamp INTEGER NOT NULL,
            action INTEGER NOT NULL,          -- AuditAction as u16
            content_id TEXT NOT NULL,
            principal_id TEXT,
            metadata BLOB NOT NULL,           -- CBOR map of text -> text
            prev_hash BLOB,                   -- 32 bytes, NULL for seq 1
            signature BLOB NOT NULL           -- 64 bytes, Ed25519
        );

        CREATE INDEX idx_audit_content ON audit_log(content_id, seq);
        "#,
    )?;

    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
