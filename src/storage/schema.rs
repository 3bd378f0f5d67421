//! Database schema definitions
//!
//! The dictionary is split into one table per initial consonant. Table names
//! come from `Consonant::partition`, never from input.

use crate::hangul::Consonant;

/// SQL schema for the bookkeeping tables
pub const SCHEMA_SQL: &str = r#"
-- Track crawl, import, and winning-word runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Words after which no word can be chained
CREATE TABLE IF NOT EXISTS winning_words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE,
    last_char TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_winning_words_last_char ON winning_words(last_char);
"#;

/// DDL for a single dictionary partition
pub fn partition_sql(consonant: Consonant) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE,
    definition TEXT NOT NULL
);
",
        consonant.partition()
    )
}

/// Initializes the database schema
///
/// Creates the 19 partitions, `runs`, and `winning_words`. Safe to run on an
/// existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    let partitions: String = Consonant::ALL.into_iter().map(partition_sql).collect();
    conn.execute_batch(&partitions)?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn table_exists(conn: &Connection, table: &str) -> bool {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for consonant in Consonant::ALL {
            assert!(
                table_exists(&conn, consonant.partition()),
                "Partition {} should exist",
                consonant.partition()
            );
        }
        assert!(table_exists(&conn, "runs"));
        assert!(table_exists(&conn, "winning_words"));
    }

    #[test]
    fn test_partition_rejects_duplicate_word() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO dict_g (word, definition) VALUES ('가정', '')",
            [],
        )
        .unwrap();
        let again = conn.execute(
            "INSERT INTO dict_g (word, definition) VALUES ('가정', 'other')",
            [],
        );
        assert!(again.is_err());
    }
}
