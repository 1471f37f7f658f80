use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use asmdb::commands::{
    build_command, list_extractors_command, scan_command, stats_command, BuildArgs,
};
use asmdb::logging::setup_logging;
use asmdb_core::scan::OBJECT_SUFFIX;

/// Build a per-function disassembly dataset from a tree of object files.
///
/// This CLI is a thin wrapper around `asmdb-core` (exposed in code as `asmdb_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "asmdb",
    version,
    about = "Build a per-function disassembly dataset from compiled object files",
    long_about = None
)]
struct Cli {
    /// More log output (repeat for more detail). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract every new object file under the root into the dataset.
    ///
    /// Files already present in the dataset are skipped, so an interrupted
    /// build can simply be run again.
    Build(BuildArgs),

    /// List candidate object files and which of them a build would process.
    Scan {
        /// Root of the `<project>/<compiler>/<optimization>/<file>` tree.
        #[arg(long, default_value = ".")]
        root: String,

        /// Existing dataset to check for already-ingested files.
        #[arg(long)]
        db: Option<String>,

        /// Suffix of candidate object files.
        #[arg(long, default_value = OBJECT_SUFFIX)]
        suffix: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show function and file counts per project/compiler/optimization.
    Stats {
        /// Dataset to inspect.
        #[arg(long)]
        db: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List available extraction backends.
    Extractors {
        /// Path to the rizin binary.
        #[arg(long)]
        rizin: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Build(args) => {
            build_command(&args).await?;
        }
        Command::Scan { root, db, suffix, json } => {
            scan_command(&root, db.as_deref(), &suffix, json)?
        }
        Command::Stats { db, json } => stats_command(&db, json)?,
        Command::Extractors { rizin, json } => {
            list_extractors_command(rizin.map(Into::into), json)?
        }
    }

    Ok(())
}
