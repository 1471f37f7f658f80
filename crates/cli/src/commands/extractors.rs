use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use asmdb_core::services::extraction::{default_extractor_registry, ToolStatus};

use crate::commands::print_json;

/// One registered extractor and, for tool-backed ones, whether the tool runs here.
#[derive(Debug, Serialize)]
pub struct ExtractorReport {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolStatus>,
}

/// Collect the extractors compiled into this binary, resolving rizin via `rizin`.
pub fn extractor_reports(rizin: Option<PathBuf>) -> Vec<ExtractorReport> {
    let registry = default_extractor_registry(rizin);
    registry
        .names()
        .into_iter()
        .filter_map(|name| registry.get(&name))
        .map(|adapter| ExtractorReport {
            name: adapter.name().to_string(),
            description: adapter.description().to_string(),
            tool: adapter.tool_status(),
        })
        .collect()
}

/// List extraction backends and the state of the tools they run.
pub fn list_extractors_command(rizin: Option<PathBuf>, json: bool) -> Result<()> {
    let reports = extractor_reports(rizin);
    if json {
        return print_json(&reports);
    }

    println!("Extractors:");
    for report in &reports {
        println!("- {}: {}", report.name, report.description);
        if let Some(tool) = &report.tool {
            match (&tool.version, &tool.error) {
                (Some(version), _) => println!("    {} ({})", tool.path.display(), version),
                (None, Some(err)) => {
                    println!("    {} (unavailable: {})", tool.path.display(), err)
                }
                (None, None) => println!("    {}", tool.path.display()),
            }
        }
    }
    Ok(())
}
