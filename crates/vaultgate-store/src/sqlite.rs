//! SQLite implementation of the RecordStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use vaultgate_core::{
    AccessGrant, AuditAction, AuditEntry, AuditHeader, AuthTag, Blake3Hash, ContentId,
    ContentObject, Ed25519Signature, GrantId, Iv, PrincipalId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, RecordStore, RevokeOutcome};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. Every trait method runs as one closure
/// under the lock on the blocking pool, which is what makes each mutation a
/// single critical section.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::info!(path = %path.display(), "opened sqlite record store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn fixed<const N: usize>(bytes: &[u8], column: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        StoreError::InvalidData(format!(
            "{column}: expected {N} bytes, got {}",
            bytes.len()
        ))
    })
}

struct ContentRow {
    content_id: String,
    iv: Vec<u8>,
    auth_tag: Vec<u8>,
    content_hash: Vec<u8>,
    owner: String,
    created_at: i64,
}

impl ContentRow {
    const COLUMNS: &'static str = "content_id, iv, auth_tag, content_hash, owner, created_at";

    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content_id: row.get(0)?,
            iv: row.get(1)?,
            auth_tag: row.get(2)?,
            content_hash: row.get(3)?,
            owner: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_content(self) -> Result<ContentObject> {
        Ok(ContentObject {
            content_id: ContentId::new(self.content_id),
            iv: Iv::from_bytes(fixed(&self.iv, "iv")?),
            auth_tag: AuthTag::from_bytes(fixed(&self.auth_tag, "auth_tag")?),
            content_hash: Blake3Hash::from_bytes(fixed(&self.content_hash, "content_hash")?),
            owner: PrincipalId::new(self.owner),
            created_at: self.created_at,
        })
    }
}

struct GrantRow {
    content_id: String,
    principal_id: String,
    grant_id: Vec<u8>,
    wrapped_key: Vec<u8>,
    issued_at: i64,
    expires_at: Option<i64>,
    revoked: bool,
    revoked_at: Option<i64>,
}

impl GrantRow {
    const COLUMNS: &'static str = "content_id, principal_id, grant_id, wrapped_key, \
                                   issued_at, expires_at, revoked, revoked_at";

    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content_id: row.get(0)?,
            principal_id: row.get(1)?,
            grant_id: row.get(2)?,
            wrapped_key: row.get(3)?,
            issued_at: row.get(4)?,
            expires_at: row.get(5)?,
            revoked: row.get(6)?,
            revoked_at: row.get(7)?,
        })
    }

    fn into_grant(self) -> Result<AccessGrant> {
        Ok(AccessGrant {
            grant_id: GrantId::from_bytes(fixed(&self.grant_id, "grant_id")?),
            content_id: ContentId::new(self.content_id),
            principal_id: PrincipalId::new(self.principal_id),
            wrapped_key: self.wrapped_key,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            revoked: self.revoked,
            revoked_at: self.revoked_at,
        })
    }
}

struct AuditRow {
    seq: i64,
    timestamp: i64,
    action: u16,
    content_id: String,
    principal_id: Option<String>,
    metadata: Vec<u8>,
    prev_hash: Option<Vec<u8>>,
    signature: Vec<u8>,
}

impl AuditRow {
    const COLUMNS: &'static str =
        "seq, timestamp, action, content_id, principal_id, metadata, prev_hash, signature";

    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            seq: row.get(0)?,
            timestamp: row.get(1)?,
            action: row.get(2)?,
            content_id: row.get(3)?,
            principal_id: row.get(4)?,
            metadata: row.get(5)?,
            prev_hash: row.get(6)?,
            signature: row.get(7)?,
        })
    }

    fn into_entry(self) -> Result<AuditEntry> {
        let action = AuditAction::from_u16(self.action)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let metadata = ciborium::from_reader(self.metadata.as_slice())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let prev_hash = match self.prev_hash {
            Some(bytes) => Some(Blake3Hash::from_bytes(fixed(&bytes, "prev_hash")?)),
            None => None,
        };

        Ok(AuditEntry {
            header: AuditHeader {
                seq: self.seq as u64,
                timestamp: self.timestamp,
                action,
                content_id: ContentId::new(self.content_id),
                principal_id: self.principal_id.map(PrincipalId::new),
                metadata,
                prev_hash,
            },
            signature: Ed25519Signature(fixed(&self.signature, "signature")?),
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert_content(&self, content: &ContentObject) -> Result<InsertResult> {
        let content = content.clone();
        self.run(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO contents
                    (content_id, iv, auth_tag, content_hash, owner, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    content.content_id.as_str(),
                    content.iv.as_bytes().as_slice(),
                    content.auth_tag.as_bytes().as_slice(),
                    content.content_hash.as_bytes().as_slice(),
                    content.owner.as_str(),
                    content.created_at,
                ],
            )?;

            Ok(if inserted == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get_content(&self, content_id: &ContentId) -> Result<Option<ContentObject>> {
        let content_id = content_id.clone();
        self.run(move |conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM contents WHERE content_id = ?1",
                        ContentRow::COLUMNS
                    ),
                    params![content_id.as_str()],
                    ContentRow::read,
                )
                .optional()?;
            row.map(ContentRow::into_content).transpose()
        })
        .await
    }

    async fn put_grant(&self, grant: &AccessGrant) -> Result<()> {
        let grant = grant.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO grants
                    (content_id, principal_id, grant_id, wrapped_key,
                     issued_at, expires_at, revoked, revoked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (content_id, principal_id) DO UPDATE SET
                    grant_id = excluded.grant_id,
                    wrapped_key = excluded.wrapped_key,
                    issued_at = excluded.issued_at,
                    expires_at = excluded.expires_at,
                    revoked = excluded.revoked,
                    revoked_at = excluded.revoked_at",
                params![
                    grant.content_id.as_str(),
                    grant.principal_id.as_str(),
                    grant.grant_id.as_bytes().as_slice(),
                    grant.wrapped_key,
                    grant.issued_at,
                    grant.expires_at,
                    grant.revoked,
                    grant.revoked_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
    ) -> Result<Option<AccessGrant>> {
        let content_id = content_id.clone();
        let principal_id = principal_id.clone();
        self.run(move |conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM grants WHERE content_id = ?1 AND principal_id = ?2",
                        GrantRow::COLUMNS
                    ),
                    params![content_id.as_str(), principal_id.as_str()],
                    GrantRow::read,
                )
                .optional()?;
            row.map(GrantRow::into_grant).transpose()
        })
        .await
    }

    async fn revoke_grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
        at: i64,
    ) -> Result<RevokeOutcome> {
        let content_id = content_id.clone();
        let principal_id = principal_id.clone();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE grants SET revoked = 1, revoked_at = ?3
                 WHERE content_id = ?1 AND principal_id = ?2 AND revoked = 0",
                params![content_id.as_str(), principal_id.as_str(), at],
            )?;
            if changed > 0 {
                return Ok(RevokeOutcome::Revoked);
            }

            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM grants WHERE content_id = ?1 AND principal_id = ?2)",
                params![content_id.as_str(), principal_id.as_str()],
                |row| row.get(0),
            )?;
            Ok(if exists {
                RevokeOutcome::AlreadyRevoked
            } else {
                RevokeOutcome::NotFound
            })
        })
        .await
    }

    async fn grants_for_content(&self, content_id: &ContentId) -> Result<Vec<AccessGrant>> {
        let content_id = content_id.clone();
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM grants WHERE content_id = ?1 ORDER BY principal_id",
                GrantRow::COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![content_id.as_str()], GrantRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(GrantRow::into_grant).collect()
        })
        .await
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        let entry = entry.clone();
        let mut metadata = Vec::new();
        ciborium::into_writer(&entry.header.metadata, &mut metadata)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let next: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM audit_log",
                [],
                |row| row.get(0),
            )?;
            let seq = entry.seq() as i64;
            if seq < next {
                return Err(StoreError::Conflict { seq: entry.seq() });
            }
            if seq > next {
                return Err(StoreError::InvalidData(format!(
                    "audit seq {seq} skips ahead of {next}"
                )));
            }

            let header = &entry.header;
            tx.execute(
                "INSERT INTO audit_log
                    (seq, timestamp, action, content_id, principal_id,
                     metadata, prev_hash, signature)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    seq,
                    header.timestamp,
                    header.action.to_u16(),
                    header.content_id.as_str(),
                    header.principal_id.as_ref().map(PrincipalId::as_str),
                    metadata,
                    header.prev_hash.as_ref().map(|h| h.as_bytes().to_vec()),
                    entry.signature.as_bytes().as_slice(),
                ],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn last_audit_entry(&self) -> Result<Option<AuditEntry>> {
        self.run(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM audit_log ORDER BY seq DESC LIMIT 1",
                        AuditRow::COLUMNS
                    ),
                    [],
                    AuditRow::read,
                )
                .optional()?;
            row.map(AuditRow::into_entry).transpose()
        })
        .await
    }

    async fn audit_entries(&self, content_id: Option<&ContentId>) -> Result<Vec<AuditEntry>> {
        let content_id = content_id.cloned();
        self.run(move |conn| {
            let rows = match &content_id {
                Some(id) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {} FROM audit_log WHERE content_id = ?1 ORDER BY seq",
                        AuditRow::COLUMNS
                    ))?;
                    let rows = stmt
                        .query_map(params![id.as_str()], AuditRow::read)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {} FROM audit_log ORDER BY seq",
                        AuditRow::COLUMNS
                    ))?;
                    let rows = stmt
                        .query_map([], AuditRow::read)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
            };
            rows.into_iter().map(AuditRow::into_entry).collect()
        })
        .await
    }
}
