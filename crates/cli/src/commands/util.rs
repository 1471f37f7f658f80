use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use asmdb_core::db::DatasetDb;

/// Open an existing dataset read-only; inspection commands never create or migrate one.
pub fn open_existing_db(db_path: &Path) -> Result<DatasetDb> {
    if !db_path.is_file() {
        bail!("Dataset not found at {}", db_path.display());
    }
    DatasetDb::open_read_only(db_path)
        .with_context(|| format!("Failed to open dataset at {}", db_path.display()))
}

/// Pretty-print `value` as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}
