//! Import command implementation

use super::shared::{create_import_progress_bar, load_configuration, load_store, save_store};
use crate::cli::args::{CommonArgs, ImportArgs};
use crate::importer::{ImportSummary, Importer};
use anyhow::{Context, Result};
use colored::*;
use tracing::info;

/// Import an archive file or extracted directory; the store is saved only
/// when the import commits
pub fn run_import(common: &CommonArgs, args: &ImportArgs) -> Result<()> {
    let config = load_configuration(common)?;
    let mut store = load_store(&config)?;

    let result = {
        let mut importer = Importer::new(&mut store).with_config(config.import.clone());
        if config.import.show_progress {
            importer = importer.with_progress(create_import_progress_bar());
        }

        if args.archive.is_dir() {
            importer.import_directory(&args.archive)
        } else {
            importer.import_archive_file(&args.archive)
        }
    };
    let summary = result.with_context(|| {
        format!(
            "Import of {} failed; the store was left unchanged",
            args.archive.display()
        )
    })?;

    save_store(&config, &store)?;
    info!("Imported {}", args.archive.display());
    if !common.quiet {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ImportSummary) {
    println!("{}", "Import complete".green().bold());
    let lines = [
        ("datasets", summary.datasets_created, summary.datasets_reused),
        ("locations", summary.locations_created, summary.locations_reused),
        ("params", summary.params_created, summary.params_reused),
        ("columns", summary.columns_created, summary.columns_reused),
    ];
    for (kind, created, reused) in lines {
        println!(
            "  {:<10} {} created, {} reused",
            kind.bold(),
            created.to_string().cyan(),
            reused
        );
    }
    println!(
        "  {:<10} {} created ({} typed, {} raw)",
        "data".bold(),
        summary.total_data().to_string().cyan(),
        summary.data_created,
        summary.raw_data_created
    );
    println!("  {} rows read", summary.rows_read);
}
