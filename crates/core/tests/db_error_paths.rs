// crates/core/tests/db_error_paths.rs

use asmdb_core::db::{DatasetDb, DbError, CURRENT_SCHEMA_VERSION};
use rusqlite::Connection;
use tempfile::tempdir;

#[test]
fn dataset_db_open_errors_on_unsupported_schema_version() {
    let tmp = tempdir().expect("temp dir");
    let db_path = tmp.path().join("dataset.db");

    // Manually create a DB and set user_version higher than we support.
    {
        let conn = Connection::open(&db_path).expect("open raw sqlite db");
        conn.pragma_update(None, "user_version", 99_i32).expect("set user_version pragma");
    }

    match DatasetDb::open(&db_path) {
        Err(DbError::UnsupportedSchemaVersion { found, min_supported, max_supported }) => {
            assert_eq!(found, 99, "unexpected found schema version");
            assert_eq!(min_supported, 0, "unexpected min_supported schema version");
            assert_eq!(max_supported, CURRENT_SCHEMA_VERSION, "unexpected max_supported");
        }
        Err(err) => {
            panic!("expected UnsupportedSchemaVersion error, got different DbError: {err}");
        }
        Ok(_) => {
            panic!("expected UnsupportedSchemaVersion error, got Ok(_)");
        }
    }
}

#[test]
fn corrupt_instructions_list_surfaces_as_encoding_error() {
    let tmp = tempdir().expect("temp dir");
    let db_path = tmp.path().join("dataset.db");
    let db = DatasetDb::open(&db_path).expect("open db");
    db.connection()
        .execute("INSERT INTO filtered_functions (id, instructions_list) VALUES (7, 'not json')", [])
        .expect("raw insert");

    assert!(matches!(db.load_filtered(7), Err(DbError::Encoding(_))));
    assert!(db.load_filtered(8).expect("missing id").is_none());
}

#[test]
fn opening_a_directory_path_fails_with_sql_error() {
    let tmp = tempdir().expect("temp dir");
    assert!(matches!(DatasetDb::open(tmp.path()), Err(DbError::Sql(_))));
}
