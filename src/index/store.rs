use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, ErrorCode};

use super::schema::{apply_schema, read_schema_version};
use super::{Field, IndexError, QueryError};
use crate::document::{Identity, PageDocument};
use crate::lock::FileLock;
use crate::search::{FieldQuery, FieldSearch, SearchError, SearchHit};

/// FTS5 accepts snippet lengths in this range only.
const SNIPPET_TOKENS_MAX: u32 = 64;

const HIGHLIGHT_OPEN: &str = "<b>";
const HIGHLIGHT_CLOSE: &str = "</b>";

/// Full-text index of one library, one row per snapshot.
///
/// Owns the only handle to the index file: a lock file next to it keeps
/// other processes out. Writes run in a transaction, so readers see either
/// the old or the new row of a snapshot.
pub struct IndexStore {
    conn: Mutex<Connection>,
    file_lock: FileLock,
}

impl IndexStore {
    /// Open (or create) the index at `path`.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock = FileLock::try_acquire(path).map_err(|source| IndexError::Locked {
            path: path.to_path_buf(),
            source,
        })?;

        let conn = Connection::open(path)?;
        apply_schema(&conn)?;

        let schema_version = read_schema_version(&conn)?.unwrap_or_default();
        let store = Self {
            conn: Mutex::new(conn),
            file_lock: lock,
        };

        log::info!(
            "opened index {} (schema v{schema_version}, {} pages, lock {})",
            path.display(),
            store.len()?,
            store.file_lock.path().display()
        );

        Ok(store)
    }

    /// Replace everything indexed for `identity` with `doc`.
    ///
    /// `None` only clears the old rows.
    pub fn update(&self, identity: Identity, doc: Option<&PageDocument>) -> Result<(), IndexError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let removed = tx.execute("DELETE FROM pages WHERE uid = ?1", params![identity.value()])?;

        if let Some(doc) = doc {
            tx.execute(
                "INSERT INTO pages (uid, url, title, text, aux_text) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    identity.value(),
                    doc.url,
                    doc.title,
                    doc.text,
                    doc.aux_text
                ],
            )?;
        }

        tx.commit()?;

        log::debug!(
            "index {identity}: removed {removed} rows, inserted {}",
            usize::from(doc.is_some())
        );

        Ok(())
    }

    /// Total number of indexed snapshots.
    pub fn len(&self) -> Result<usize, IndexError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT count(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Match `query.text` against one field, best match first.
    pub fn query(&self, query: &FieldQuery<'_>) -> Result<Vec<SearchHit>, SearchError> {
        if query.limit == 0 {
            return Ok(vec![]);
        }

        let field = query.field;
        let (open, close) = if query.highlight {
            (HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE)
        } else {
            ("", "")
        };
        let snippet_tokens = query.snippet_size.clamp(1, SNIPPET_TOKENS_MAX);

        let sql = format!(
            "SELECT uid, url, title, snippet(pages, {}, ?1, ?2, ?3, ?4) \
             FROM pages WHERE {} MATCH ?5 ORDER BY rank LIMIT ?6",
            field.column_index(),
            field.column()
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(classify_error)?;
        let rows = stmt
            .query_map(
                params![
                    open,
                    close,
                    field.ellipsis(),
                    snippet_tokens,
                    query.text,
                    query.limit as i64
                ],
                |row| {
                    Ok(SearchHit {
                        identity: Identity::new(row.get(0)?),
                        url: row.get(1)?,
                        title: row.get(2)?,
                        snippet: row.get(3)?,
                    })
                },
            )
            .map_err(classify_error)?;

        let mut hits = Vec::new();
        for hit in rows {
            hits.push(hit.map_err(classify_error)?);
        }
        Ok(hits)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, IndexError> {
        self.conn.lock().map_err(|_| IndexError::Poisoned)
    }
}

impl FieldSearch for IndexStore {
    fn query_field(&self, query: &FieldQuery<'_>) -> Result<Vec<SearchHit>, SearchError> {
        self.query(query)
    }
}

/// The engine reports bad MATCH expressions as plain SQL errors; anything
/// else is a storage problem.
fn classify_error(err: rusqlite::Error) -> SearchError {
    match err {
        rusqlite::Error::SqliteFailure(code, Some(message)) if code.code == ErrorCode::Unknown => {
            SearchError::Query(QueryError(message))
        }
        err => SearchError::Index(IndexError::Sqlite(err)),
    }
}
