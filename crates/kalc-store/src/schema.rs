use rusqlite::Connection;

use kalc_core::KalcError;

pub fn init_db(conn: &Connection) -> Result<(), KalcError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL, -- 'user:<id>' or 'session:<key>'
            expression TEXT NOT NULL,
            result TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'basic',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_history_owner ON history(owner);
        CREATE INDEX IF NOT EXISTS idx_history_created ON history(created_at);

        CREATE TABLE IF NOT EXISTS preferences (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL UNIQUE, -- at most one record per owner
            theme TEXT NOT NULL DEFAULT 'dark',
            decimal_places INTEGER NOT NULL DEFAULT 10,
            angle_unit TEXT NOT NULL DEFAULT 'rad',
            memory_value TEXT NOT NULL DEFAULT '0'
        );
        ",
    )
    .map_err(|e| KalcError::Database(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        // Second call should be idempotent
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .map(|r| r.unwrap())
                .collect()
        };

        assert!(tables.contains(&"history".to_string()));
        assert!(tables.contains(&"preferences".to_string()));
    }

    #[test]
    fn test_owner_uniqueness_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();

        conn.execute("INSERT INTO preferences (owner) VALUES ('user:1')", [])
            .unwrap();
        let dup = conn.execute("INSERT INTO preferences (owner) VALUES ('user:1')", []);
        assert!(dup.is_err());
    }
}
