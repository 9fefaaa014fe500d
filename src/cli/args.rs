//! Command-line argument definitions for mudata
//!
//! Defines the CLI interface using the clap derive API.

use crate::MudataError;
use crate::error::Result;
use crate::query::{DatumQuery, DatumTable, XBound};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

/// Import and query multi-parameter, multi-location observational data
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mudata",
    version,
    about = "Import and query mudata archives",
    long_about = "Imports mudata archives (zip files holding datasets.csv, locations.csv, \
                  params.csv, columns.csv and data.csv) into a local store as one \
                  all-or-nothing operation, and queries the imported data."
)]
pub struct Args {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand
#[derive(Debug, Clone, ClapArgs)]
pub struct CommonArgs {
    /// Store snapshot file (overrides the configured store path)
    #[arg(long = "store", value_name = "PATH", global = true)]
    pub store: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl CommonArgs {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Import a mudata archive into the store
    Import(ImportArgs),
    /// Query data by dataset, location, param and x range
    Query(QueryArgs),
    /// Show one dataset, location or param
    #[command(subcommand)]
    View(ViewCommand),
}

#[derive(Debug, Clone, Parser)]
pub struct ImportArgs {
    /// Zip archive, or a directory holding an extracted archive
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,
}

/// Output format for query and view results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON for scripting
    Json,
    /// CSV for data analysis
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableArg {
    /// Data with a typed x
    Data,
    /// Data whose x was kept verbatim
    RawData,
}

impl From<TableArg> for DatumTable {
    fn from(table: TableArg) -> Self {
        match table {
            TableArg::Data => DatumTable::Data,
            TableArg::RawData => DatumTable::RawData,
        }
    }
}

/// Wrapper for parsing comma-separated slug lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugList {
    pub slugs: Vec<String>,
}

impl FromStr for SlugList {
    type Err = MudataError;

    fn from_str(s: &str) -> Result<Self> {
        let slugs: Vec<String> = s
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if slugs.is_empty() {
            return Err(MudataError::query("list cannot be empty"));
        }
        Ok(SlugList { slugs })
    }
}

#[derive(Debug, Clone, Parser)]
pub struct QueryArgs {
    /// Table to read
    #[arg(long = "table", value_enum, default_value = "data")]
    pub table: TableArg,

    /// Comma-separated dataset names
    #[arg(long = "datasets", value_name = "LIST")]
    pub datasets: Option<SlugList>,

    /// Comma-separated location slugs
    #[arg(long = "locations", value_name = "LIST")]
    pub locations: Option<SlugList>,

    /// Comma-separated param slugs
    #[arg(long = "params", value_name = "LIST")]
    pub params: Option<SlugList>,

    /// Inclusive lower x bound as a date/time, e.g. "2017-05-09 17:25"
    #[arg(long = "x-from", value_name = "TEXT")]
    pub x_from: Option<String>,

    /// Inclusive lower x bound in epoch seconds (or a number for raw data)
    #[arg(long = "x-from-seconds", value_name = "N", allow_negative_numbers = true)]
    pub x_from_seconds: Option<f64>,

    /// Inclusive upper x bound as a date/time
    #[arg(long = "x-to", value_name = "TEXT")]
    pub x_to: Option<String>,

    /// Inclusive upper x bound in epoch seconds (or a number for raw data)
    #[arg(long = "x-to-seconds", value_name = "N", allow_negative_numbers = true)]
    pub x_to_seconds: Option<f64>,

    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl QueryArgs {
    /// Build the query; both bound kinds on one edge are left for the query to reject
    pub fn to_query(&self) -> Result<DatumQuery> {
        let mut query = DatumQuery::new().table(self.table.into());
        if let Some(list) = &self.datasets {
            query = query.datasets(list.slugs.iter().cloned());
        }
        if let Some(list) = &self.locations {
            query = query.locations(list.slugs.iter().cloned());
        }
        if let Some(list) = &self.params {
            query = query.params(list.slugs.iter().cloned());
        }
        if let Some(text) = &self.x_from {
            query = query.x_from(XBound::parse_temporal(text)?);
        }
        if let Some(seconds) = self.x_from_seconds {
            query = query.x_from(XBound::Numeric(seconds));
        }
        if let Some(text) = &self.x_to {
            query = query.x_to(XBound::parse_temporal(text)?);
        }
        if let Some(seconds) = self.x_to_seconds {
            query = query.x_to(XBound::Numeric(seconds));
        }
        Ok(query)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum ViewCommand {
    /// Show a dataset
    Dataset {
        dataset: String,
        #[arg(long = "format", value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Show a location of a dataset
    Location {
        dataset: String,
        location: String,
        #[arg(long = "format", value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Show a param of a dataset
    Param {
        dataset: String,
        param: String,
        #[arg(long = "format", value_enum, default_value = "table")]
        format: OutputFormat,
    },
}
