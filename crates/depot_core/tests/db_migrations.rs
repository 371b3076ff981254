use depot_core::db::migrations::{apply_migrations, current_version, ensure_current, latest_version};
use depot_core::db::{open_db, open_db_in_memory, DbError, DEFAULT_BUSY_TIMEOUT};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory(DEFAULT_BUSY_TIMEOUT).unwrap();

    assert_eq!(current_version(&conn).unwrap(), latest_version());
    assert_column_exists(&conn, "records", "payload");
    ensure_current(&conn).unwrap();
}

#[test]
fn opening_same_store_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("depot.sqlite3");

    let first = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(current_version(&first).unwrap(), latest_version());
    drop(first);

    let second = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(current_version(&second).unwrap(), latest_version());
}

#[test]
fn records_table_holds_only_columns_the_store_reads() {
    let mut conn = Connection::open_in_memory().unwrap();
    apply_migrations(&mut conn).unwrap();

    let mut statement = conn
        .prepare("SELECT name FROM pragma_table_info('records') ORDER BY cid;")
        .unwrap();
    let columns: Vec<String> = statement
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(columns, vec!["id", "set_name", "timestamp", "payload"]);
    assert_eq!(current_version(&conn).unwrap(), 1);
}

#[test]
fn opening_store_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn assert_column_exists(conn: &Connection, table: &str, column: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2);",
            [table, column],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "missing column {table}.{column}");
}
