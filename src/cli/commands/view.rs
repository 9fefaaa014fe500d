//! View command implementation

use super::shared::{load_configuration, load_store};
use crate::cli::args::{CommonArgs, OutputFormat, ViewCommand};
use crate::query::views::{DataExtent, view_dataset, view_location, view_param};
use crate::tags::Tags;
use anyhow::{Result, bail};
use colored::*;
use serde::Serialize;

pub fn run_view(common: &CommonArgs, command: &ViewCommand) -> Result<()> {
    let config = load_configuration(common)?;
    let store = load_store(&config)?;

    match command {
        ViewCommand::Dataset { dataset, format } => {
            let view = view_dataset(&store, dataset)?;
            if let Some(json) = as_json(*format, &view)? {
                println!("{}", json);
                return Ok(());
            }
            println!("{} {}", "Dataset".bold(), view.dataset.dataset.cyan());
            print_tags(&view.dataset.tags);
            println!("  locations: {}", view.locations.join(", "));
            println!("  params:    {}", view.params.join(", "));
            println!("  columns:   {}", view.columns);
            print_extent(&view.extent);
        }
        ViewCommand::Location {
            dataset,
            location,
            format,
        } => {
            let view = view_location(&store, dataset, location)?;
            if let Some(json) = as_json(*format, &view)? {
                println!("{}", json);
                return Ok(());
            }
            println!(
                "{} {} in {}",
                "Location".bold(),
                view.location.location.cyan(),
                view.dataset
            );
            print_tags(&view.location.tags);
            println!("  params: {}", view.params.join(", "));
            print_extent(&view.extent);
        }
        ViewCommand::Param {
            dataset,
            param,
            format,
        } => {
            let view = view_param(&store, dataset, param)?;
            if let Some(json) = as_json(*format, &view)? {
                println!("{}", json);
                return Ok(());
            }
            println!(
                "{} {} in {}",
                "Param".bold(),
                view.param.param.cyan(),
                view.dataset
            );
            print_tags(&view.param.tags);
            println!("  locations: {}", view.locations.join(", "));
            print_extent(&view.extent);
        }
    }
    Ok(())
}

fn as_json<T: Serialize>(format: OutputFormat, view: &T) -> Result<Option<String>> {
    match format {
        OutputFormat::Table => Ok(None),
        OutputFormat::Json => Ok(Some(serde_json::to_string_pretty(view)?)),
        OutputFormat::Csv => bail!("views support table and json output only"),
    }
}

fn print_tags(tags: &Tags) {
    if tags.is_empty() {
        return;
    }
    for (key, value) in tags.iter() {
        println!("  {} = {}", key.dimmed(), value);
    }
}

fn print_extent(extent: &DataExtent) {
    println!(
        "  data:      {} ({} typed, {} raw)",
        extent.total(),
        extent.data,
        extent.raw_data
    );
    if let (Some(first), Some(last)) = (extent.x_first, extent.x_last) {
        println!("  x range:   {} to {}", first, last);
    }
}
