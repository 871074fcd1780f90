use rusqlite::Connection;
use taskpad_core::db::{ensure_schema, open_db_in_memory, DbError, SCHEMA_VERSION};

#[test]
fn fresh_database_lands_on_current_schema_version() {
    let conn = open_db_in_memory().unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[test]
fn ensure_schema_is_idempotent() {
    let mut conn = Connection::open_in_memory().unwrap();
    ensure_schema(&mut conn).unwrap();
    ensure_schema(&mut conn).unwrap();

    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[test]
fn database_from_a_newer_build_is_refused() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION + 1))
        .unwrap();

    let err = ensure_schema(&mut conn).unwrap_err();
    assert!(matches!(
        err,
        DbError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        } if found == SCHEMA_VERSION + 1
    ));
}

#[test]
fn schema_accepts_task_and_flag_rows() {
    let conn = open_db_in_memory().unwrap();

    conn.execute(
        "INSERT INTO tasks (uuid, title, description, created_at_ms, is_completed)
         VALUES ('11111111-2222-4333-8444-555555555555', 'water plants', '', 1, 0);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO app_flags (name, value) VALUES ('seed_completed', 1);",
        [],
    )
    .unwrap();
}
