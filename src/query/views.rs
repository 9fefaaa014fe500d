//! Single-entity views
//!
//! Summaries of one dataset, location or param with their tags and the
//! counts of the records that reference them.

use crate::error::{MudataError, Result};
use crate::models::{Dataset, Datum, Location, Param};
use crate::store::Store;
use crate::temporal::PointInTime;
use serde::Serialize;
use std::collections::BTreeSet;

/// Data counts and typed x extent over a set of data
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataExtent {
    /// Data with a typed x
    pub data: usize,
    /// Data whose x was kept as raw text
    pub raw_data: usize,
    /// Earliest typed x, if any
    pub x_first: Option<PointInTime>,
    /// Latest typed x, if any
    pub x_last: Option<PointInTime>,
}

impl DataExtent {
    fn add(&mut self, datum: &Datum) {
        match datum.x.as_point() {
            Some(point) => {
                self.data += 1;
                self.x_first = Some(self.x_first.map_or(*point, |first| first.min(*point)));
                self.x_last = Some(self.x_last.map_or(*point, |last| last.max(*point)));
            }
            None => self.raw_data += 1,
        }
    }

    /// Typed and raw data together
    pub fn total(&self) -> usize {
        self.data + self.raw_data
    }

    pub fn has_raw(&self) -> bool {
        self.raw_data > 0
    }
}

/// Summary of one dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetView {
    /// The dataset record, tags included
    pub dataset: Dataset,
    /// Location slugs in id order
    pub locations: Vec<String>,
    /// Param slugs in id order
    pub params: Vec<String>,
    /// Number of column metadata records
    pub columns: usize,
    /// Counts and x range over all data in the dataset
    pub extent: DataExtent,
}

/// Summary of one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationView {
    /// Name of the owning dataset
    pub dataset: String,
    pub location: Location,
    /// Params measured at this location
    pub params: Vec<String>,
    pub extent: DataExtent,
}

/// Summary of one param
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamView {
    /// Name of the owning dataset
    pub dataset: String,
    pub param: Param,
    /// Locations where this param was measured
    pub locations: Vec<String>,
    pub extent: DataExtent,
}

fn find_dataset<'a>(store: &'a dyn Store, slug: &str) -> Result<&'a Dataset> {
    store
        .find_dataset(slug)
        .ok_or_else(|| MudataError::query(format!("dataset '{}' does not exist", slug)))
}

pub fn view_dataset(store: &dyn Store, dataset: &str) -> Result<DatasetView> {
    let dataset = find_dataset(store, dataset)?;

    let mut extent = DataExtent::default();
    for datum in store.data().filter(|d| d.dataset == dataset.id) {
        extent.add(datum);
    }

    Ok(DatasetView {
        dataset: dataset.clone(),
        locations: store
            .locations(dataset.id)
            .into_iter()
            .map(|l| l.location.clone())
            .collect(),
        params: store
            .params(dataset.id)
            .into_iter()
            .map(|p| p.param.clone())
            .collect(),
        columns: store.columns(dataset.id).len(),
        extent,
    })
}

pub fn view_location(store: &dyn Store, dataset: &str, location: &str) -> Result<LocationView> {
    let dataset = find_dataset(store, dataset)?;
    let location = store.find_location(dataset.id, location).ok_or_else(|| {
        MudataError::query(format!(
            "location '{}' does not exist in dataset '{}'",
            location, dataset.dataset
        ))
    })?;

    let mut extent = DataExtent::default();
    let mut params = BTreeSet::new();
    for datum in store.data().filter(|d| d.location == location.id) {
        extent.add(datum);
        if let Some(param) = store.param(datum.param) {
            params.insert(param.param.clone());
        }
    }

    Ok(LocationView {
        dataset: dataset.dataset.clone(),
        location: location.clone(),
        params: params.into_iter().collect(),
        extent,
    })
}

pub fn view_param(store: &dyn Store, dataset: &str, param: &str) -> Result<ParamView> {
    let dataset = find_dataset(store, dataset)?;
    let param = store.find_param(dataset.id, param).ok_or_else(|| {
        MudataError::query(format!(
            "param '{}' does not exist in dataset '{}'",
            param, dataset.dataset
        ))
    })?;

    let mut extent = DataExtent::default();
    let mut locations = BTreeSet::new();
    for datum in store.data().filter(|d| d.param == param.id) {
        extent.add(datum);
        if let Some(location) = store.location(datum.location) {
            locations.insert(location.location.clone());
        }
    }

    Ok(ParamView {
        dataset: dataset.dataset.clone(),
        param: param.clone(),
        locations: locations.into_iter().collect(),
        extent,
    })
}
