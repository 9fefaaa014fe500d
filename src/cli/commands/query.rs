//! Query command implementation

use super::shared::{load_configuration, load_store};
use crate::cli::args::{CommonArgs, OutputFormat, QueryArgs};
use crate::query::QueryRow;
use anyhow::{Context, Result};
use colored::*;
use std::io::{self, Write};
use tracing::info;

pub fn run_query(common: &CommonArgs, args: &QueryArgs) -> Result<()> {
    let config = load_configuration(common)?;
    let store = load_store(&config)?;

    let query = args.to_query()?;
    let rows = query.run(&store)?;
    info!("Query matched {} rows", rows.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Table => write_table(&mut out, &rows)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &rows)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_csv(&mut out, &rows)?,
    }
    Ok(())
}

fn write_table(out: &mut impl Write, rows: &[QueryRow]) -> Result<()> {
    if rows.is_empty() {
        writeln!(out, "No data found matching the specified filters.")?;
        return Ok(());
    }

    let headers = ["dataset", "location", "param", "x", "value", "tags"];
    let cells: Vec<[String; 6]> = rows.iter().map(row_cells).collect();
    let mut widths = headers.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = headers
        .iter()
        .zip(widths)
        .map(|(h, w)| format!("{:<w$}", h, w = w))
        .collect();
    writeln!(out, "{}", header.join("  ").bold())?;
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(c, w)| format!("{:<w$}", c, w = w))
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }
    writeln!(out, "{}", format!("{} rows", rows.len()).dimmed())?;
    Ok(())
}

fn write_csv(out: &mut impl Write, rows: &[QueryRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["dataset", "location", "param", "x", "value", "tags"])
        .context("Failed to write CSV header")?;
    for row in rows {
        writer
            .write_record(row_cells(row))
            .context("Failed to write CSV row")?;
    }
    writer.flush()?;
    Ok(())
}

fn row_cells(row: &QueryRow) -> [String; 6] {
    [
        row.dataset.clone(),
        row.location.clone(),
        row.param.clone(),
        row.x.to_string(),
        row.value.clone().unwrap_or_else(|| "NA".to_string()),
        row.tags.encode(),
    ]
}
