use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::db::{DatasetDb, DbError, DbResult};
use crate::model::{ExtractedFunction, FileIdentity, FunctionMap, NewFunction};
use crate::vocab::InstructionConverter;

/// Gate serializing every write against the store. Holds exactly one permit.
pub type WritePermit = Arc<Semaphore>;

/// Create a fresh single-permit write gate.
pub fn write_permit() -> WritePermit {
    Arc::new(Semaphore::new(1))
}

/// Errors raised while persisting extracted functions.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("store write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("write permit was closed")]
    PermitClosed,
}

/// Outcome of persisting one object file's functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileInsertOutcome {
    pub inserted: usize,
    /// Functions dropped because the file path had no valid identity.
    pub dropped: usize,
}

/// Persists extracted functions into the dataset store.
///
/// Every insert acquires the shared write permit *before* opening a
/// connection and releases it only after the connection is closed, so at most
/// one writer touches the store at a time regardless of the worker count.
#[derive(Clone)]
pub struct StoreWriter {
    db_path: PathBuf,
    root: PathBuf,
    permit: WritePermit,
    converter: Arc<dyn InstructionConverter>,
}

impl StoreWriter {
    pub fn new(
        db_path: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        permit: WritePermit,
        converter: Arc<dyn InstructionConverter>,
    ) -> Self {
        Self { db_path: db_path.into(), root: root.into(), permit, converter }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the tables if they do not exist yet. Safe to call repeatedly.
    pub fn ensure_schema(&self) -> DbResult<()> {
        DatasetDb::open(&self.db_path).map(|_| ())
    }

    /// Build the row for one function, or `None` when the path has no identity.
    pub fn prepare(
        &self,
        file_path: &Path,
        function_name: &str,
        record: &ExtractedFunction,
    ) -> Option<NewFunction> {
        let identity = FileIdentity::from_path(&self.root, file_path)?;
        Some(NewFunction {
            identity,
            function_name: function_name.to_string(),
            asm: record.asm.clone(),
            instruction_ids: self.converter.convert(&record.filtered_instructions),
        })
    }

    /// Insert one function. Returns the assigned id, or `None` if it was dropped.
    pub async fn insert(
        &self,
        file_path: &Path,
        function_name: &str,
        record: &ExtractedFunction,
    ) -> Result<Option<i64>, StoreError> {
        let Some(function) = self.prepare(file_path, function_name, record) else {
            debug!(
                path = %file_path.display(),
                function = function_name,
                "dropping function: path has fewer than four segments below root"
            );
            return Ok(None);
        };

        let permit =
            self.permit.clone().acquire_owned().await.map_err(|_| StoreError::PermitClosed)?;
        let db_path = self.db_path.clone();
        let id = tokio::task::spawn_blocking(move || -> DbResult<i64> {
            let _permit = permit;
            let db = DatasetDb::open(&db_path)?;
            db.insert_function(&function)
        })
        .await??;

        Ok(Some(id))
    }

    /// Insert every function of one object file, one permit acquisition each.
    pub async fn insert_file(
        &self,
        file_path: &Path,
        functions: &FunctionMap,
    ) -> Result<FileInsertOutcome, StoreError> {
        if let Some(prefix) = FileIdentity::dropped_prefix(&self.root, file_path) {
            warn!(
                path = %file_path.display(),
                prefix = %prefix.display(),
                "path is nested deeper than project/compiler/optimization/file; \
                 its rows will not be recognized as ingested on the next build"
            );
        }
        let mut outcome = FileInsertOutcome::default();
        for (name, record) in functions {
            match self.insert(file_path, name, record).await? {
                Some(_) => outcome.inserted += 1,
                None => outcome.dropped += 1,
            }
        }
        Ok(outcome)
    }
}
