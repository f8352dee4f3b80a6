use jarvis_core::db::migrations::{latest_version, schema_version};
use jarvis_core::db::{open_db, open_db_in_memory, DbError};
use jarvis_core::{NoteDraft, NoteRepository, NoteStore, NoteType, RepoError, SqliteNoteRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    for table in ["memos", "events", "tasks", "memo_tags", "event_tags", "task_tags"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opened_connections_enforce_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO memo_tags (note_id, position, tag) VALUES (42, 0, 'orphan');",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), latest_version());
    assert_table_exists(&conn_second, "tasks");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
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

#[test]
fn repository_rejects_unmigrated_connection() {
    let mut conn = Connection::open_in_memory().unwrap();
    let err = SqliteNoteRepository::try_new(&mut conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::Storage(DbError::MissingTable("memos"))
    ));
}

#[test]
fn repository_rejects_partition_missing_variant_column() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE memos (id INTEGER PRIMARY KEY, name TEXT, content TEXT, created_at INTEGER, updated_at INTEGER);
         CREATE TABLE memo_tags (note_id INTEGER, position INTEGER, tag TEXT);
         CREATE TABLE events (id INTEGER PRIMARY KEY, name TEXT, content TEXT, created_at INTEGER, updated_at INTEGER);",
    )
    .unwrap();

    let err = SqliteNoteRepository::try_new(&mut conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::Storage(DbError::MissingColumn {
            table: "events",
            column: "date"
        })
    ));
}

#[test]
fn note_store_checks_schema_once_and_lends_repositories() {
    let err = NoteStore::try_new(Connection::open_in_memory().unwrap())
        .err()
        .unwrap();
    assert!(matches!(err, RepoError::Storage(DbError::MissingTable("memos"))));

    let mut store = NoteStore::try_new(open_db_in_memory().unwrap()).unwrap();
    let id = store
        .repository()
        .create(&NoteDraft::new(NoteType::Memo, "kept", ""))
        .unwrap();
    let note = store.repository().read(id, NoteType::Memo).unwrap().unwrap();
    assert_eq!(note.name, "kept");
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
