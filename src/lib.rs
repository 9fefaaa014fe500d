//! mudata Library
//!
//! Manages multi-parameter, multi-location observational data (climate
//! station records and the like) in a tagged, schema-light model, and
//! imports bulk datasets from mudata archives.
//!
//! This library provides tools for:
//! - Parsing x values into points in time, falling back to a raw representation
//! - Encoding and decoding the tag mapping carried by every record
//! - Validating records against a store, reporting every violated constraint
//! - Importing archives as one all-or-nothing operation with rollback
//! - Filtering data by dataset, location, param and x range

pub mod config;
pub mod constants;
pub mod error;
pub mod importer;
pub mod models;
pub mod query;
pub mod store;
pub mod tags;
pub mod temporal;
pub mod validation;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{ImportConfig, MudataConfig};
pub use error::{MudataError, Result, StoreError, ValidationError};
pub use importer::{ImportSummary, Importer, import_archive};
pub use models::{Column, Dataset, Datum, Location, Param, TableName, XValue};
pub use query::{DatumQuery, DatumTable, XBound};
pub use store::{MemoryStore, Store};
pub use tags::Tags;
pub use temporal::PointInTime;
