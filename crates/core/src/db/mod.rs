//! Dataset store integration.
//!
//! The store is a single SQLite file with two tables:
//! - `functions`: one row per extracted function, identified by the object
//!   file's project/compiler/optimization/file_name plus the function name.
//! - `filtered_functions`: the function's vocabulary ids, sharing its id.
//!
//! `DatasetDb` is the synchronous wrapper (schema, inserts, reads);
//! `StoreWriter` is what the build pipeline uses to write under the permit.

pub mod dataset_db;
pub mod models;
pub mod writer;

pub use dataset_db::*;
pub use models::*;
pub use writer::*;
