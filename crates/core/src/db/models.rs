use serde::{Deserialize, Serialize};

/// Aggregate counts for one project/compiler/optimization group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupStats {
    pub project: String,
    pub compiler: String,
    pub optimization: String,
    /// Distinct object files with at least one stored function.
    pub files: i64,
    pub functions: i64,
}
