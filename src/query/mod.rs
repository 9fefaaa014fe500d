//! Read-only filtering of data
//!
//! [`DatumQuery`] restricts data by dataset, location and param (union inside
//! each restriction, intersection across them) and by an inclusive x range.
//! Each edge of the range takes either a numeric bound in epoch seconds or a
//! temporal bound, never both.

pub mod views;

pub use views::{DatasetView, LocationView, ParamView, view_dataset, view_location, view_param};

use crate::error::{MudataError, Result};
use crate::models::{DatasetId, Datum, DatumId, LocationId, ParamId, Representation, XValue};
use crate::store::Store;
use crate::tags::Tags;
use crate::temporal::{self, PointInTime};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Which datum representation a query reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatumTable {
    /// Data with a typed x
    #[default]
    Data,
    /// Data whose x was kept verbatim
    RawData,
}

impl DatumTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatumTable::Data => "data",
            DatumTable::RawData => "raw_data",
        }
    }

    fn representation(&self) -> Representation {
        match self {
            DatumTable::Data => Representation::Typed,
            DatumTable::RawData => Representation::Raw,
        }
    }
}

impl fmt::Display for DatumTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatumTable {
    type Err = MudataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "data" => Ok(DatumTable::Data),
            "raw_data" | "raw-data" => Ok(DatumTable::RawData),
            other => Err(MudataError::query(format!(
                "table '{}' does not exist: must be data or raw_data",
                other
            ))),
        }
    }
}

/// One edge of an x range
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XBound {
    /// Seconds since the Unix epoch
    Numeric(f64),
    Temporal(PointInTime),
}

impl XBound {
    /// Parse a temporal bound; text the temporal parser rejects is a query error
    pub fn parse_temporal(text: &str) -> Result<Self> {
        temporal::parse_x(text)
            .map(XBound::Temporal)
            .map_err(|_| MudataError::query(format!("'{}' is not a valid x bound", text)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Edge {
    numeric: Option<f64>,
    temporal: Option<PointInTime>,
}

impl Edge {
    fn set(&mut self, bound: XBound) {
        match bound {
            XBound::Numeric(seconds) => self.numeric = Some(seconds),
            XBound::Temporal(point) => self.temporal = Some(point),
        }
    }

    fn resolve(&self, name: &str) -> Result<Option<XBound>> {
        match (self.numeric, self.temporal) {
            (Some(_), Some(_)) => Err(MudataError::query(format!(
                "{} has both a numeric and a temporal bound",
                name
            ))),
            (Some(seconds), None) => {
                if seconds.is_nan() {
                    return Err(MudataError::query(format!("{} is not a number", name)));
                }
                Ok(Some(XBound::Numeric(seconds)))
            }
            (None, Some(point)) => Ok(Some(XBound::Temporal(point))),
            (None, None) => Ok(None),
        }
    }
}

/// A datum with its references resolved to slugs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRow {
    pub id: DatumId,
    pub dataset: String,
    pub location: String,
    pub param: String,
    #[serde(serialize_with = "serialize_display")]
    pub x: XValue,
    pub value: Option<String>,
    pub tags: Tags,
}

fn serialize_display<S: Serializer>(value: &XValue, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Builder for a filtered view over the data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatumQuery {
    table: DatumTable,
    datasets: Vec<String>,
    locations: Vec<String>,
    params: Vec<String>,
    x_from: Edge,
    x_to: Edge,
}

impl DatumQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: DatumTable) -> Self {
        self.table = table;
        self
    }

    /// Keep data in any of these datasets
    pub fn datasets<I, S>(mut self, datasets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.datasets.extend(datasets.into_iter().map(Into::into));
        self
    }

    /// Keep data at any location with one of these slugs, in any dataset
    pub fn locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations.extend(locations.into_iter().map(Into::into));
        self
    }

    /// Keep data of any param with one of these slugs, in any dataset
    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    /// Inclusive lower bound on x
    pub fn x_from(mut self, bound: XBound) -> Self {
        self.x_from.set(bound);
        self
    }

    /// Inclusive upper bound on x
    pub fn x_to(mut self, bound: XBound) -> Self {
        self.x_to.set(bound);
        self
    }

    /// Run the query and return matching rows ordered by
    /// (dataset, location, param, x)
    pub fn run(&self, store: &dyn Store) -> Result<Vec<QueryRow>> {
        let lower = self.x_from.resolve("x_from")?;
        let upper = self.x_to.resolve("x_to")?;
        if self.table == DatumTable::RawData
            && [lower, upper]
                .iter()
                .any(|b| matches!(b, Some(XBound::Temporal(_))))
        {
            return Err(MudataError::query(
                "raw data has no temporal x; use a numeric bound",
            ));
        }

        let datasets = self.dataset_ids(store)?;
        let locations = self.location_ids(store);
        let params = self.param_ids(store);
        let representation = self.table.representation();

        let mut rows: Vec<QueryRow> = store
            .data()
            .filter(|d| d.x.representation() == representation)
            .filter(|d| datasets.as_ref().is_none_or(|ids| ids.contains(&d.dataset)))
            .filter(|d| locations.as_ref().is_none_or(|ids| ids.contains(&d.location)))
            .filter(|d| params.as_ref().is_none_or(|ids| ids.contains(&d.param)))
            .filter(|d| within(&d.x, lower, upper))
            .filter_map(|d| resolve_row(store, d))
            .collect();

        rows.sort_by(|a, b| {
            a.dataset
                .cmp(&b.dataset)
                .then_with(|| a.location.cmp(&b.location))
                .then_with(|| a.param.cmp(&b.param))
                .then_with(|| compare_x(&a.x, &b.x))
        });
        Ok(rows)
    }

    /// `None` when unrestricted; unknown dataset names are an error
    fn dataset_ids(&self, store: &dyn Store) -> Result<Option<HashSet<DatasetId>>> {
        if self.datasets.is_empty() {
            return Ok(None);
        }
        self.datasets
            .iter()
            .map(|name| {
                store.find_dataset(name).map(|d| d.id).ok_or_else(|| {
                    MudataError::query(format!("dataset '{}' does not exist", name))
                })
            })
            .collect::<Result<HashSet<_>>>()
            .map(Some)
    }

    fn location_ids(&self, store: &dyn Store) -> Option<HashSet<LocationId>> {
        if self.locations.is_empty() {
            return None;
        }
        let ids = store
            .datasets()
            .into_iter()
            .flat_map(|d| store.locations(d.id))
            .filter(|l| self.locations.contains(&l.location))
            .map(|l| l.id)
            .collect();
        Some(ids)
    }

    fn param_ids(&self, store: &dyn Store) -> Option<HashSet<ParamId>> {
        if self.params.is_empty() {
            return None;
        }
        let ids = store
            .datasets()
            .into_iter()
            .flat_map(|d| store.params(d.id))
            .filter(|p| self.params.contains(&p.param))
            .map(|p| p.id)
            .collect();
        Some(ids)
    }
}

fn resolve_row(store: &dyn Store, datum: &Datum) -> Option<QueryRow> {
    Some(QueryRow {
        id: datum.id,
        dataset: store.dataset(datum.dataset)?.dataset.clone(),
        location: store.location(datum.location)?.location.clone(),
        param: store.param(datum.param)?.param.clone(),
        x: datum.x.clone(),
        value: datum.value.clone(),
        tags: datum.tags.clone(),
    })
}

/// Raw x as a number, when it is one
fn raw_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

fn compare_bound(x: &XValue, bound: XBound) -> Option<Ordering> {
    match (x, bound) {
        (XValue::Typed(point), XBound::Temporal(b)) => Some(point.cmp(&b)),
        (XValue::Typed(point), XBound::Numeric(b)) => {
            temporal::to_epoch_seconds(point).partial_cmp(&b)
        }
        (XValue::Raw(text), XBound::Numeric(b)) => raw_number(text)?.partial_cmp(&b),
        (XValue::Raw(_), XBound::Temporal(_)) => None,
    }
}

fn within(x: &XValue, lower: Option<XBound>, upper: Option<XBound>) -> bool {
    let above = lower.is_none_or(|b| compare_bound(x, b).is_some_and(Ordering::is_ge));
    let below = upper.is_none_or(|b| compare_bound(x, b).is_some_and(Ordering::is_le));
    above && below
}

fn compare_x(a: &XValue, b: &XValue) -> Ordering {
    match (a, b) {
        (XValue::Typed(a), XValue::Typed(b)) => a.cmp(b),
        // numbers first in numeric order, then text
        (XValue::Raw(a), XValue::Raw(b)) => match (raw_number(a), raw_number(b)) {
            (Some(na), Some(nb)) => na.total_cmp(&nb).then_with(|| a.cmp(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        },
        (XValue::Typed(_), XValue::Raw(_)) => Ordering::Less,
        (XValue::Raw(_), XValue::Typed(_)) => Ordering::Greater,
    }
}
