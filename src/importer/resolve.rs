//! Natural-key reference resolution
//!
//! Later stages reference datasets by name and locations/params by
//! (dataset, slug). References resolve against entities seen earlier in the
//! same import first and fall back to the store; confirmed store lookups are
//! cached.

use crate::error::{EntityKind, MudataError, Result};
use crate::models::{DatasetId, LocationId, ParamId};
use crate::store::Store;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ReferenceIndex {
    datasets: HashMap<String, DatasetId>,
    locations: HashMap<(DatasetId, String), LocationId>,
    params: HashMap<(DatasetId, String), ParamId>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_dataset(&mut self, name: &str, id: DatasetId) {
        self.datasets.insert(name.to_string(), id);
    }

    pub fn insert_location(&mut self, dataset: DatasetId, location: &str, id: LocationId) {
        self.locations.insert((dataset, location.to_string()), id);
    }

    pub fn insert_param(&mut self, dataset: DatasetId, param: &str, id: ParamId) {
        self.params.insert((dataset, param.to_string()), id);
    }

    pub fn dataset(&mut self, store: &dyn Store, name: &str) -> Result<DatasetId> {
        if let Some(id) = self.datasets.get(name) {
            return Ok(*id);
        }
        let id = store
            .find_dataset(name)
            .map(|d| d.id)
            .ok_or_else(|| MudataError::UnresolvedReference {
                kind: EntityKind::Dataset,
                key: name.to_string(),
            })?;
        self.insert_dataset(name, id);
        Ok(id)
    }

    pub fn location(
        &mut self,
        store: &dyn Store,
        dataset: (DatasetId, &str),
        location: &str,
    ) -> Result<LocationId> {
        let (dataset_id, dataset_name) = dataset;
        let key = (dataset_id, location.to_string());
        if let Some(id) = self.locations.get(&key) {
            return Ok(*id);
        }
        let id = store
            .find_location(dataset_id, location)
            .map(|l| l.id)
            .ok_or_else(|| MudataError::UnresolvedReference {
                kind: EntityKind::Location,
                key: format!("({}, {})", dataset_name, location),
            })?;
        self.locations.insert(key, id);
        Ok(id)
    }

    pub fn param(
        &mut self,
        store: &dyn Store,
        dataset: (DatasetId, &str),
        param: &str,
    ) -> Result<ParamId> {
        let (dataset_id, dataset_name) = dataset;
        let key = (dataset_id, param.to_string());
        if let Some(id) = self.params.get(&key) {
            return Ok(*id);
        }
        let id = store
            .find_param(dataset_id, param)
            .map(|p| p.id)
            .ok_or_else(|| MudataError::UnresolvedReference {
                kind: EntityKind::Param,
                key: format!("({}, {})", dataset_name, param),
            })?;
        self.params.insert(key, id);
        Ok(id)
    }
}
