//! DDL of the search index file.

use rusqlite::Connection;

pub(crate) const SCHEMA_VERSION: u32 = 1;

/// Idempotent, so reopening an existing index is safe.
///
/// `uid` and `url` are stored but not tokenized. Tokens are case-folded
/// with diacritics removed; 2 and 3 character prefix indexes keep prefix
/// queries (`wel*`) cheap.
const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS pages USING fts5 (
    uid UNINDEXED,
    url UNINDEXED,
    title,
    text,
    aux_text,
    tokenize = 'unicode61 remove_diacritics 2',
    prefix = '2 3'
);
"#;

pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let value: String = row.get(0)?;
            Ok(value.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema_twice() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_prefix_and_diacritics() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO pages (uid, url, title, text, aux_text) VALUES (1, 'u', 'Café Crème', '', '')",
            [],
        )
        .unwrap();

        let count = |query: &str| -> i64 {
            conn.query_row(
                "SELECT count(*) FROM pages WHERE title MATCH ?1",
                [query],
                |row| row.get(0),
            )
            .unwrap()
        };

        assert_eq!(count("cafe"), 1);
        assert_eq!(count("CREME"), 1);
        assert_eq!(count("cr*"), 1);
        assert_eq!(count("tea"), 0);
    }
}
