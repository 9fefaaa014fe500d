//! Application constants for mudata
//!
//! Archive table names, required columns, field limits and defaults used
//! throughout the importer and the entity model.

// =============================================================================
// Archive Layout
// =============================================================================

pub const DATASETS_FILE: &str = "datasets.csv";
pub const LOCATIONS_FILE: &str = "locations.csv";
pub const PARAMS_FILE: &str = "params.csv";
pub const COLUMNS_FILE: &str = "columns.csv";
pub const DATA_FILE: &str = "data.csv";

/// Required header columns per table file
pub mod required_columns {
    pub const DATASETS: &[&str] = &["dataset", "tags"];
    pub const LOCATIONS: &[&str] = &["dataset", "location", "tags"];
    pub const PARAMS: &[&str] = &["dataset", "param", "tags"];
    pub const COLUMNS: &[&str] = &["dataset", "table", "column", "tags"];
    pub const DATA: &[&str] = &["dataset", "location", "param", "x", "value", "tags"];
}

// =============================================================================
// Field Limits
// =============================================================================

/// Slug fields are limited to 50 characters
pub const SLUG_MAX_LENGTH: usize = 50;

/// Datum value and raw x are limited to 200 characters
pub const TEXT_MAX_LENGTH: usize = 200;

/// Allowed slug characters
pub const SLUG_PATTERN: &str = r"^[a-z0-9_-]+$";

/// Overall shape of a temporal x value, checked before any format is tried
pub const X_PATTERN: &str = r"^\d{4}-\d{1,2}-\d{1,2}( \d{1,2}:\d{1,2}(:\d{1,2})?( [+-]\d{4})?)?$";

// =============================================================================
// Defaults
// =============================================================================

/// Values normalised to an absent datum value
pub const DEFAULT_MISSING_VALUES: &[&str] = &["", "NA"];

pub const DEFAULT_STORE_DIR: &str = "mudata";
pub const DEFAULT_STORE_FILE: &str = "store.json";
