use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DatabaseError::MigrationFailed {
            version: 0,
            reason: format!("cannot create {}: {e}", parent.display()),
        })?;
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA busy_timeout=5000;
         PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;"
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn)?;

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet).
/// Any other failure is returned so a busy database never re-runs
/// applied migrations.
fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let tracked: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;
    if !tracked {
        return Ok(0);
    }
    let version = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })?;
    Ok(version.unwrap_or(0))
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // users, doctors, appointments, medical_history + schema_version
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // Run migrations again: should not error
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn fresh_database_reports_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_current_version(&conn).unwrap(), 0);
    }

    #[test]
    fn unreadable_version_table_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE schema_version (label TEXT)").unwrap();

        let err = run_migrations(&conn).unwrap_err();
        assert!(matches!(err, DatabaseError::Sqlite(_)), "got: {err}");
        // Migration v1 was not attempted
        assert_eq!(count_tables(&conn).unwrap(), 1);
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn file_database_reopens_without_rerunning_migrations() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/clinic.db");
        {
            let conn = open_database(&path).unwrap();
            conn.execute(
                "INSERT INTO users (email, password_hash, fullname) VALUES ('a@x.com', 'h', 'A')",
                [],
            )
            .unwrap();
        }
        let conn = open_database(&path).unwrap();
        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 1);
    }

    #[test]
    fn slot_uniqueness_enforced_by_schema() {
        let conn = open_memory_database().unwrap();
        conn.execute_batch(
            "INSERT INTO users (email, password_hash, fullname) VALUES ('p@x.com', 'h', 'P');
             INSERT INTO doctors (name, specialty, img, dept) VALUES ('Dr. A', 'GP', 'a.jpg', 'general');
             INSERT INTO appointments (date, time, user_id, doctor_id) VALUES ('2030-01-01', '10:00', 1, 1);",
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO appointments (date, time, user_id, doctor_id) VALUES ('2030-01-01', '10:00', 1, 1)",
            [],
        );
        let err = DatabaseError::from(dup.unwrap_err());
        assert!(err.is_unique_violation());
    }
}
