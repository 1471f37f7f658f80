use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use thiserror::Error;

use crate::db::GroupStats;
use crate::model::{FileIdentity, FilteredFunction, FunctionRecord, NewFunction};

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB), or a store created by an older
/// builder that never stamped a version; both tables are created if missing.
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// How long a connection waits on a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for dataset store operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },

    /// A read-only open found a database without the dataset tables.
    #[error("Not a dataset: table `{0}` is missing")]
    MissingTable(&'static str),

    /// `instructions_list` could not be encoded or decoded as a JSON id array.
    #[error("Invalid instructions_list encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed dataset store.
///
/// Thin wrapper around `rusqlite::Connection` responsible for:
/// - Opening/creating the DB file.
/// - Creating the `functions` / `filtered_functions` tables.
/// - Small, testable helpers for inserting and reading rows.
///
/// Writers in the build pipeline do not share a `DatasetDb`; they go through
/// [`crate::db::StoreWriter`], which opens one per insert under the write permit.
#[derive(Debug)]
pub struct DatasetDb {
    conn: Connection,
}

impl DatasetDb {
    /// Open (or create) a dataset store at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        // Readers (stats, dedup) may overlap a commit from the build.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an existing dataset for reading only.
    ///
    /// Never creates the file, the tables or the version stamp. Rejects newer
    /// schema versions and databases without both dataset tables.
    pub fn open_read_only(path: &Path) -> DbResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let version = current_schema_version(&conn)?;
        if version > CURRENT_SCHEMA_VERSION {
            return Err(DbError::UnsupportedSchemaVersion {
                found: version,
                min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
                max_supported: CURRENT_SCHEMA_VERSION,
            });
        }
        for table in ["functions", "filtered_functions"] {
            let present: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                params![table],
                |row| row.get(0),
            )?;
            if !present {
                return Err(DbError::MissingTable(table));
            }
        }
        Ok(Self { conn })
    }

    /// Expose a reference to the underlying connection for advanced callers.
    /// For most code, prefer higher-level helpers.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert one function and its filtered instruction ids as a single unit.
    ///
    /// The `filtered_functions` row reuses the id assigned to the `functions` row.
    pub fn insert_function(&self, function: &NewFunction) -> DbResult<i64> {
        let instructions_list = serde_json::to_string(&function.instruction_ids)?;
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO functions (project, compiler, optimization, file_name, function_name, asm, num_instructions)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                function.identity.project,
                function.identity.compiler,
                function.identity.optimization,
                function.identity.file_name,
                function.function_name,
                function.asm,
                function.num_instructions(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            r#"
            INSERT INTO filtered_functions (id, instructions_list)
            VALUES (?1, ?2)
            "#,
            params![id, instructions_list],
        )?;

        tx.commit()?;
        Ok(id)
    }

    /// Distinct file identities that already have at least one function stored.
    pub fn ingested_files(&self) -> DbResult<Vec<FileIdentity>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT project, compiler, optimization, file_name
            FROM functions
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FileIdentity {
                project: row.get(0)?,
                compiler: row.get(1)?,
                optimization: row.get(2)?,
                file_name: row.get(3)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// List all function rows (ordered by id).
    pub fn list_functions(&self) -> DbResult<Vec<FunctionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, project, compiler, optimization, file_name, function_name, asm, num_instructions
            FROM functions
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FunctionRecord {
                id: row.get(0)?,
                identity: FileIdentity {
                    project: row.get(1)?,
                    compiler: row.get(2)?,
                    optimization: row.get(3)?,
                    file_name: row.get(4)?,
                },
                function_name: row.get(5)?,
                asm: row.get(6)?,
                num_instructions: row.get(7)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Load the filtered instruction ids for a function id, if present.
    pub fn load_filtered(&self, id: i64) -> DbResult<Option<FilteredFunction>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT instructions_list FROM filtered_functions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => {
                Ok(Some(FilteredFunction { id, instruction_ids: serde_json::from_str(&raw)? }))
            }
            None => Ok(None),
        }
    }

    /// List all filtered rows (ordered by id).
    pub fn list_filtered(&self) -> DbResult<Vec<FilteredFunction>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, instructions_list
            FROM filtered_functions
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let mut out = Vec::new();
        for row in rows {
            let (id, raw) = row?;
            out.push(FilteredFunction { id, instruction_ids: serde_json::from_str(&raw)? });
        }
        Ok(out)
    }

    /// Number of rows in `functions`.
    pub fn count_functions(&self) -> DbResult<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM functions", [], |row| row.get(0))?)
    }

    /// Number of rows in `filtered_functions`.
    pub fn count_filtered(&self) -> DbResult<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM filtered_functions", [], |row| row.get(0))?)
    }

    /// File and function counts grouped by project/compiler/optimization.
    pub fn group_stats(&self) -> DbResult<Vec<GroupStats>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT project, compiler, optimization, COUNT(DISTINCT file_name), COUNT(*)
            FROM functions
            GROUP BY project, compiler, optimization
            ORDER BY project, compiler, optimization
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(GroupStats {
                project: row.get(0)?,
                compiler: row.get(1)?,
                optimization: row.get(2)?,
                files: row.get(3)?,
                functions: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema (or unversioned tables from an earlier build)
/// - 1: functions + filtered_functions
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let current_version = current_schema_version(conn)?;

    // Reject DBs created with a newer schema than we support.
    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version < 1 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS functions (
                id               INTEGER PRIMARY KEY,
                project          TEXT,
                compiler         TEXT,
                optimization     TEXT,
                file_name        TEXT,
                function_name    TEXT,
                asm              TEXT,
                num_instructions INTEGER
            );

            CREATE TABLE IF NOT EXISTS filtered_functions (
                id                INTEGER PRIMARY KEY,
                instructions_list TEXT
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
