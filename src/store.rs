use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::Path;

use tracing::debug;

use crate::error::{BooksError, Result};

/// Run a fixed query against the store at `path` and map every row with `map_row`.
///
/// The store is opened read-only and the connection is dropped before this
/// returns, on the error path too. Rows come back in the order SQLite yields them.
pub fn extract<T, F>(path: &Path, sql: &str, map_row: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let wrap = |source: rusqlite::Error| BooksError::Extraction {
        path: path.to_path_buf(),
        source,
    };

    // Open in read-only mode
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
    )
    .map_err(wrap)?;

    let rows = {
        let mut stmt = conn.prepare(sql).map_err(wrap)?;
        let iter = stmt.query_map([], map_row).map_err(wrap)?;
        iter.collect::<rusqlite::Result<Vec<T>>>().map_err(wrap)?
    };

    debug!("Extracted {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read a column as text whatever its storage class.
///
/// Core Data stores are loosely typed: identifier columns hold TEXT in one
/// store and INTEGER in another. Integers are rendered without a fractional
/// part so `42` and `'42'` read back identically.
pub fn loose_text(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(column)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("scratch.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE t (k, v TEXT);
             INSERT INTO t VALUES (1, 'one');
             INSERT INTO t VALUES ('2', 'two');
             INSERT INTO t VALUES (3.5, NULL);
             INSERT INTO t VALUES (NULL, 'four');",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_extract_preserves_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_store(dir.path());

        let rows = extract(&path, "SELECT k, v FROM t ORDER BY rowid", |row| {
            Ok((loose_text(row, "k")?, row.get::<_, Option<String>>("v")?))
        })
        .unwrap();

        assert_eq!(
            rows,
            vec![
                (Some("1".to_string()), Some("one".to_string())),
                (Some("2".to_string()), Some("two".to_string())),
                (Some("3.5".to_string()), None),
                (None, Some("four".to_string())),
            ]
        );
    }

    #[test]
    fn test_extract_empty_result_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_store(dir.path());

        let rows = extract(&path, "SELECT v FROM t WHERE 0", |row| {
            row.get::<_, Option<String>>(0)
        })
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_extract_missing_table_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_store(dir.path());

        let err = extract(&path, "SELECT * FROM nope", |row| row.get::<_, i64>(0)).unwrap_err();
        assert!(matches!(err, BooksError::Extraction { .. }));
    }

    #[test]
    fn test_extract_does_not_create_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.sqlite");

        let err = extract(&path, "SELECT 1", |row| row.get::<_, i64>(0)).unwrap_err();
        assert!(matches!(err, BooksError::Extraction { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_extract_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_store(dir.path());

        let result = extract(&path, "DELETE FROM t RETURNING k", |row| row.get::<_, i64>(0));
        assert!(result.is_err());

        let remaining = extract(&path, "SELECT COUNT(*) FROM t", |row| row.get::<_, i64>(0)).unwrap();
        assert_eq!(remaining, vec![4]);
    }
}
