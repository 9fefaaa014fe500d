//! Data models for mudata
//!
//! The five record kinds of the mudata model. Every record other than a
//! [`Dataset`] is scoped by exactly one dataset, and every record carries a
//! [`Tags`] mapping for its user-defined columns.

use crate::error::{MudataError, Result};
use crate::tags::Tags;
use crate::temporal::{self, PointInTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Store-assigned identifier of a [`Dataset`]
    DatasetId
);
entity_id!(LocationId);
entity_id!(ParamId);
entity_id!(ColumnId);
entity_id!(DatumId);

// =============================================================================
// Scoping Entities
// =============================================================================

/// A scope in which location, param and column identifiers have consistent meaning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub dataset: String,
    #[serde(default)]
    pub tags: Tags,
}

/// A discrete spatial entity (e.g. a climate station) within a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub dataset: DatasetId,
    pub location: String,
    #[serde(default)]
    pub tags: Tags,
}

/// A measured parameter (e.g. maxtemp) within a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub id: ParamId,
    pub dataset: DatasetId,
    pub param: String,
    #[serde(default)]
    pub tags: Tags,
}

/// Logical tables a [`Column`] can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableName {
    Datasets,
    Locations,
    Params,
    Data,
    Columns,
}

impl TableName {
    pub const ALL: [TableName; 5] = [
        TableName::Datasets,
        TableName::Locations,
        TableName::Params,
        TableName::Data,
        TableName::Columns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Datasets => "datasets",
            TableName::Locations => "locations",
            TableName::Params => "params",
            TableName::Data => "data",
            TableName::Columns => "columns",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = MudataError;

    fn from_str(s: &str) -> Result<Self> {
        TableName::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| MudataError::UnknownTableName {
                value: s.to_string(),
            })
    }
}

/// Metadata describing one column of a logical table within a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub dataset: DatasetId,
    pub table: TableName,
    pub column: String,
    #[serde(default)]
    pub tags: Tags,
}

// =============================================================================
// Observations
// =============================================================================

/// Which of the two datum representations a value uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Representation {
    Typed,
    Raw,
}

/// Position of a datum on its x axis
///
/// `Typed` when the text parsed as a point in time, `Raw` otherwise. The two
/// variants never compare equal, so uniqueness is enforced separately for each.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XValue {
    Typed(PointInTime),
    Raw(String),
}

impl XValue {
    /// Route x text to a representation: typed when it parses, raw verbatim otherwise
    pub fn from_text(text: &str) -> Self {
        match temporal::parse_x(text) {
            Ok(point) => XValue::Typed(point),
            Err(e) => {
                debug!("Keeping x '{}' raw: {}", text, e);
                XValue::Raw(text.to_string())
            }
        }
    }

    pub fn representation(&self) -> Representation {
        match self {
            XValue::Typed(_) => Representation::Typed,
            XValue::Raw(_) => Representation::Raw,
        }
    }

    pub fn as_point(&self) -> Option<&PointInTime> {
        match self {
            XValue::Typed(point) => Some(point),
            XValue::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            XValue::Typed(_) => None,
            XValue::Raw(text) => Some(text),
        }
    }
}

impl fmt::Display for XValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XValue::Typed(point) => write!(f, "{}", point),
            XValue::Raw(text) => f.write_str(text),
        }
    }
}

/// One observation: (dataset, location, param, x) => value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    pub id: DatumId,
    pub dataset: DatasetId,
    pub location: LocationId,
    pub param: ParamId,
    pub x: XValue,
    pub value: Option<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl Datum {
    pub fn key(&self) -> DatumKey {
        DatumKey {
            dataset: self.dataset,
            location: self.location,
            param: self.param,
            x: self.x.clone(),
        }
    }
}

/// Natural key of a datum
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatumKey {
    pub dataset: DatasetId,
    pub location: LocationId,
    pub param: ParamId,
    pub x: XValue,
}

impl fmt::Display for DatumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.dataset, self.location, self.param, self.x
        )
    }
}

// =============================================================================
// Validated Records
// =============================================================================

/// Validated field values, ready for a store to assign an identifier
#[derive(Debug, Clone, PartialEq)]
pub struct NewDataset {
    pub dataset: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub dataset: DatasetId,
    pub location: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewParam {
    pub dataset: DatasetId,
    pub param: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewColumn {
    pub dataset: DatasetId,
    pub table: TableName,
    pub column: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDatum {
    pub dataset: DatasetId,
    pub location: LocationId,
    pub param: ParamId,
    pub x: XValue,
    pub value: Option<String>,
    pub tags: Tags,
}

impl NewDatum {
    pub fn key(&self) -> DatumKey {
        DatumKey {
            dataset: self.dataset,
            location: self.location,
            param: self.param,
            x: self.x.clone(),
        }
    }
}
