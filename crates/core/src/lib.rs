//! asmdb-core
//!
//! Core library for building a per-function disassembly dataset from a tree of
//! compiled object files laid out as `root/<project>/<compiler>/<optimization>/<file>`.
//!
//! This crate defines the data model, the SQLite dataset store, the candidate
//! scanner and dedup filter, the instruction vocabulary, extraction backends
//! (rizin, pre-extracted sidecars), and the parallel build pipeline.
//!
//! All substantive logic lives here so it is fully testable and reusable from
//! multiple frontends; the CLI only parses arguments and renders output.

pub mod config;
pub mod db;
pub mod model;
pub mod pipeline;
pub mod scan;
pub mod services;
pub mod vocab;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
