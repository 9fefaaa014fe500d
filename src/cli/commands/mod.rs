//! Command implementations for the mudata CLI
//!
//! Each command is implemented in its own module:
//! - `import`: archive import with rollback on failure
//! - `query`: filtered data listings
//! - `view`: single dataset, location or param summaries

pub mod import;
pub mod query;
pub mod shared;
pub mod view;

use crate::cli::args::{Args, Commands};
use anyhow::Result;

/// Main command runner
pub fn run(args: Args) -> Result<()> {
    shared::setup_logging(&args.common);

    match &args.command {
        Commands::Import(import_args) => import::run_import(&args.common, import_args),
        Commands::Query(query_args) => query::run_query(&args.common, query_args),
        Commands::View(view_command) => view::run_view(&args.common, view_command),
    }
}
