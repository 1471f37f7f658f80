use anyhow::Result;
use serde::Serialize;

use asmdb_core::db::GroupStats;

use crate::canonicalize_or_current;
use crate::commands::{open_existing_db, print_json};

#[derive(Debug, Serialize)]
pub struct DatasetStats {
    pub db_path: String,
    pub functions: i64,
    pub filtered_functions: i64,
    pub files: usize,
    pub groups: Vec<GroupStats>,
}

/// Report per project/compiler/optimization counts of a dataset.
pub fn stats_command(db: &str, json: bool) -> Result<()> {
    let db_path = canonicalize_or_current(db)?;
    let dataset = open_existing_db(&db_path)?;

    let stats = DatasetStats {
        db_path: db_path.display().to_string(),
        functions: dataset.count_functions()?,
        filtered_functions: dataset.count_filtered()?,
        files: dataset.ingested_files()?.len(),
        groups: dataset.group_stats()?,
    };

    if json {
        return print_json(&stats);
    }

    println!("Dataset: {}", stats.db_path);
    println!("Functions: {} (filtered: {})", stats.functions, stats.filtered_functions);
    println!("Files: {}", stats.files);
    if stats.groups.is_empty() {
        println!("Groups: (none)");
        return Ok(());
    }
    println!("Groups:");
    for group in &stats.groups {
        println!(
            "- {}/{}/{}: {} files, {} functions",
            group.project, group.compiler, group.optimization, group.files, group.functions
        );
    }
    Ok(())
}
