//! Persistence collaborator for the entity model.
//!
//! [`Store`] is the contract the importer and the query builder run against:
//! natural-key lookup, atomic create-if-absent and cascading delete for each
//! record kind. [`MemoryStore`] implements it with id-ordered tables and
//! natural-key indexes and can be saved to and loaded from a JSON snapshot.

use crate::error::{EntityKind, MudataError, Result, StoreError};
use crate::models::{
    Column, ColumnId, Dataset, DatasetId, Datum, DatumId, DatumKey, Location, LocationId,
    NewColumn, NewDataset, NewDatum, NewLocation, NewParam, Param, ParamId, TableName,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Record storage with natural-key uniqueness
///
/// `create_*` must be atomic per natural key: a create whose key already
/// exists fails with [`StoreError::DuplicateKey`] and changes nothing.
pub trait Store {
    // Datasets

    /// Look up a dataset by id
    fn dataset(&self, id: DatasetId) -> Option<&Dataset>;
    /// Look up a dataset by its name
    fn find_dataset(&self, dataset: &str) -> Option<&Dataset>;
    /// Insert a dataset, assigning its id
    fn create_dataset(&mut self, new: NewDataset) -> StoreResult<Dataset>;
    /// Removes the dataset and every record scoped by it
    fn delete_dataset(&mut self, id: DatasetId) -> StoreResult<()>;

    // Locations

    fn location(&self, id: LocationId) -> Option<&Location>;
    /// Look up a location by its `(dataset, location)` natural key
    fn find_location(&self, dataset: DatasetId, location: &str) -> Option<&Location>;
    /// Insert a location; its dataset must exist
    fn create_location(&mut self, new: NewLocation) -> StoreResult<Location>;
    /// Removes the location and the data that reference it
    fn delete_location(&mut self, id: LocationId) -> StoreResult<()>;

    // Params

    fn param(&self, id: ParamId) -> Option<&Param>;
    /// Look up a param by its `(dataset, param)` natural key
    fn find_param(&self, dataset: DatasetId, param: &str) -> Option<&Param>;
    /// Insert a param; its dataset must exist
    fn create_param(&mut self, new: NewParam) -> StoreResult<Param>;
    /// Removes the param and the data that reference it
    fn delete_param(&mut self, id: ParamId) -> StoreResult<()>;

    // Columns

    fn column(&self, id: ColumnId) -> Option<&Column>;
    /// Look up a column by its `(dataset, table, column)` natural key
    fn find_column(&self, dataset: DatasetId, table: TableName, column: &str) -> Option<&Column>;
    /// Insert a column; its dataset must exist
    fn create_column(&mut self, new: NewColumn) -> StoreResult<Column>;
    fn delete_column(&mut self, id: ColumnId) -> StoreResult<()>;

    // Data

    fn datum(&self, id: DatumId) -> Option<&Datum>;
    /// Look up a datum by its natural key; typed and raw x never match each other
    fn find_datum(&self, key: &DatumKey) -> Option<&Datum>;
    /// Insert a datum; its dataset, location and param must exist
    fn create_datum(&mut self, new: NewDatum) -> StoreResult<Datum>;
    fn delete_datum(&mut self, id: DatumId) -> StoreResult<()>;

    // Listings, each ordered by id

    /// All datasets
    fn datasets(&self) -> Vec<&Dataset>;
    /// Locations of one dataset
    fn locations(&self, dataset: DatasetId) -> Vec<&Location>;
    /// Params of one dataset
    fn params(&self, dataset: DatasetId) -> Vec<&Param>;
    /// Column metadata of one dataset
    fn columns(&self, dataset: DatasetId) -> Vec<&Column>;
    /// Every datum in every dataset
    fn data(&self) -> Box<dyn Iterator<Item = &Datum> + '_>;
}

// =============================================================================
// In-memory Store
// =============================================================================

/// In-memory [`Store`] with natural-key indexes
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    next_id: u64,
    datasets: BTreeMap<DatasetId, Dataset>,
    locations: BTreeMap<LocationId, Location>,
    params: BTreeMap<ParamId, Param>,
    columns: BTreeMap<ColumnId, Column>,
    data: BTreeMap<DatumId, Datum>,

    dataset_index: HashMap<String, DatasetId>,
    location_index: HashMap<(DatasetId, String), LocationId>,
    param_index: HashMap<(DatasetId, String), ParamId>,
    column_index: HashMap<(DatasetId, TableName, String), ColumnId>,
    datum_index: HashMap<DatumKey, DatumId>,
}

/// Serialised form of a [`MemoryStore`]; indexes are rebuilt on load
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_id: u64,
    pub datasets: Vec<Dataset>,
    pub locations: Vec<Location>,
    pub params: Vec<Param>,
    pub columns: Vec<Column>,
    pub data: Vec<Datum>,
}

/// Counts of stored records per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub datasets: usize,
    pub locations: usize,
    pub params: usize,
    pub columns: usize,
    pub data: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            datasets: self.datasets.len(),
            locations: self.locations.len(),
            params: self.params.len(),
            columns: self.columns.len(),
            data: self.data.len(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_dataset(&self, id: DatasetId) -> StoreResult<()> {
        if self.datasets.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference {
                kind: EntityKind::Dataset,
                id: id.0,
            })
        }
    }

    pub fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            next_id: self.next_id,
            datasets: self.datasets.values().cloned().collect(),
            locations: self.locations.values().cloned().collect(),
            params: self.params.values().cloned().collect(),
            columns: self.columns.values().cloned().collect(),
            data: self.data.values().cloned().collect(),
        }
    }

    /// Rebuild a store from a snapshot, re-checking references and uniqueness
    pub fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        let mut store = Self::new();

        for dataset in snapshot.datasets {
            if store.dataset_index.contains_key(&dataset.dataset) {
                return Err(StoreError::DuplicateKey {
                    kind: EntityKind::Dataset,
                    key: dataset.dataset,
                });
            }
            store
                .dataset_index
                .insert(dataset.dataset.clone(), dataset.id);
            store.datasets.insert(dataset.id, dataset);
        }

        for location in snapshot.locations {
            store.require_dataset(location.dataset)?;
            let key = (location.dataset, location.location.clone());
            if store.location_index.insert(key, location.id).is_some() {
                return Err(StoreError::DuplicateKey {
                    kind: EntityKind::Location,
                    key: location.location,
                });
            }
            store.locations.insert(location.id, location);
        }

        for param in snapshot.params {
            store.require_dataset(param.dataset)?;
            let key = (param.dataset, param.param.clone());
            if store.param_index.insert(key, param.id).is_some() {
                return Err(StoreError::DuplicateKey {
                    kind: EntityKind::Param,
                    key: param.param,
                });
            }
            store.params.insert(param.id, param);
        }

        for column in snapshot.columns {
            store.require_dataset(column.dataset)?;
            let key = (column.dataset, column.table, column.column.clone());
            if store.column_index.insert(key, column.id).is_some() {
                return Err(StoreError::DuplicateKey {
                    kind: EntityKind::Column,
                    key: column.column,
                });
            }
            store.columns.insert(column.id, column);
        }

        for datum in snapshot.data {
            store.require_dataset(datum.dataset)?;
            if !store.locations.contains_key(&datum.location) {
                return Err(StoreError::MissingReference {
                    kind: EntityKind::Location,
                    id: datum.location.0,
                });
            }
            if !store.params.contains_key(&datum.param) {
                return Err(StoreError::MissingReference {
                    kind: EntityKind::Param,
                    id: datum.param.0,
                });
            }
            let key = datum.key();
            if store.datum_index.contains_key(&key) {
                return Err(StoreError::DuplicateKey {
                    kind: EntityKind::Datum,
                    key: key.to_string(),
                });
            }
            store.datum_index.insert(key, datum.id);
            store.data.insert(datum.id, datum);
        }

        let max_id = store
            .datasets
            .keys()
            .map(|id| id.0)
            .chain(store.locations.keys().map(|id| id.0))
            .chain(store.params.keys().map(|id| id.0))
            .chain(store.columns.keys().map(|id| id.0))
            .chain(store.data.keys().map(|id| id.0))
            .max()
            .unwrap_or(0);
        store.next_id = snapshot.next_id.max(max_id);

        Ok(store)
    }

    /// Load a snapshot file; a missing file is an empty store
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No store snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let reader = BufReader::new(File::open(path)?);
        let snapshot: StoreSnapshot = serde_json::from_reader(reader)?;
        let store = Self::from_snapshot(snapshot)?;
        debug!(
            "Loaded store snapshot from {}: {:?}",
            path.display(),
            store.counts()
        );
        Ok(store)
    }

    /// Write a snapshot file, replacing any previous one in a single rename
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &self.to_snapshot())?;
            writer.flush()?;
        }
        temp.persist(path).map_err(|e| MudataError::Io(e.error))?;

        debug!("Saved store snapshot to {}", path.display());
        Ok(())
    }

    fn remove_data_where(&mut self, predicate: impl Fn(&Datum) -> bool) {
        let doomed: Vec<DatumId> = self
            .data
            .values()
            .filter(|datum| predicate(datum))
            .map(|datum| datum.id)
            .collect();
        for id in doomed {
            if let Some(datum) = self.data.remove(&id) {
                self.datum_index.remove(&datum.key());
            }
        }
    }
}

impl Store for MemoryStore {
    fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        self.datasets.get(&id)
    }

    fn find_dataset(&self, dataset: &str) -> Option<&Dataset> {
        self.dataset_index
            .get(dataset)
            .and_then(|id| self.datasets.get(id))
    }

    fn create_dataset(&mut self, new: NewDataset) -> StoreResult<Dataset> {
        if self.dataset_index.contains_key(&new.dataset) {
            return Err(StoreError::DuplicateKey {
                kind: EntityKind::Dataset,
                key: new.dataset,
            });
        }
        let dataset = Dataset {
            id: DatasetId(self.allocate_id()),
            dataset: new.dataset,
            tags: new.tags,
        };
        self.dataset_index
            .insert(dataset.dataset.clone(), dataset.id);
        self.datasets.insert(dataset.id, dataset.clone());
        Ok(dataset)
    }

    fn delete_dataset(&mut self, id: DatasetId) -> StoreResult<()> {
        let dataset = self.datasets.remove(&id).ok_or(StoreError::NotFound {
            kind: EntityKind::Dataset,
            id: id.0,
        })?;
        self.dataset_index.remove(&dataset.dataset);

        self.remove_data_where(|datum| datum.dataset == id);
        self.columns.retain(|_, column| column.dataset != id);
        self.column_index.retain(|(dataset, _, _), _| *dataset != id);
        self.params.retain(|_, param| param.dataset != id);
        self.param_index.retain(|(dataset, _), _| *dataset != id);
        self.locations.retain(|_, location| location.dataset != id);
        self.location_index.retain(|(dataset, _), _| *dataset != id);
        Ok(())
    }

    fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    fn find_location(&self, dataset: DatasetId, location: &str) -> Option<&Location> {
        self.location_index
            .get(&(dataset, location.to_string()))
            .and_then(|id| self.locations.get(id))
    }

    fn create_location(&mut self, new: NewLocation) -> StoreResult<Location> {
        self.require_dataset(new.dataset)?;
        let key = (new.dataset, new.location.clone());
        if self.location_index.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                kind: EntityKind::Location,
                key: new.location,
            });
        }
        let location = Location {
            id: LocationId(self.allocate_id()),
            dataset: new.dataset,
            location: new.location,
            tags: new.tags,
        };
        self.location_index.insert(key, location.id);
        self.locations.insert(location.id, location.clone());
        Ok(location)
    }

    fn delete_location(&mut self, id: LocationId) -> StoreResult<()> {
        let location = self.locations.remove(&id).ok_or(StoreError::NotFound {
            kind: EntityKind::Location,
            id: id.0,
        })?;
        self.location_index
            .remove(&(location.dataset, location.location));
        self.remove_data_where(|datum| datum.location == id);
        Ok(())
    }

    fn param(&self, id: ParamId) -> Option<&Param> {
        self.params.get(&id)
    }

    fn find_param(&self, dataset: DatasetId, param: &str) -> Option<&Param> {
        self.param_index
            .get(&(dataset, param.to_string()))
            .and_then(|id| self.params.get(id))
    }

    fn create_param(&mut self, new: NewParam) -> StoreResult<Param> {
        self.require_dataset(new.dataset)?;
        let key = (new.dataset, new.param.clone());
        if self.param_index.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                kind: EntityKind::Param,
                key: new.param,
            });
        }
        let param = Param {
            id: ParamId(self.allocate_id()),
            dataset: new.dataset,
            param: new.param,
            tags: new.tags,
        };
        self.param_index.insert(key, param.id);
        self.params.insert(param.id, param.clone());
        Ok(param)
    }

    fn delete_param(&mut self, id: ParamId) -> StoreResult<()> {
        let param = self.params.remove(&id).ok_or(StoreError::NotFound {
            kind: EntityKind::Param,
            id: id.0,
        })?;
        self.param_index.remove(&(param.dataset, param.param));
        self.remove_data_where(|datum| datum.param == id);
        Ok(())
    }

    fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(&id)
    }

    fn find_column(&self, dataset: DatasetId, table: TableName, column: &str) -> Option<&Column> {
        self.column_index
            .get(&(dataset, table, column.to_string()))
            .and_then(|id| self.columns.get(id))
    }

    fn create_column(&mut self, new: NewColumn) -> StoreResult<Column> {
        self.require_dataset(new.dataset)?;
        let key = (new.dataset, new.table, new.column.clone());
        if self.column_index.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                kind: EntityKind::Column,
                key: format!("{}.{}", new.table, new.column),
            });
        }
        let column = Column {
            id: ColumnId(self.allocate_id()),
            dataset: new.dataset,
            table: new.table,
            column: new.column,
            tags: new.tags,
        };
        self.column_index.insert(key, column.id);
        self.columns.insert(column.id, column.clone());
        Ok(column)
    }

    fn delete_column(&mut self, id: ColumnId) -> StoreResult<()> {
        let column = self.columns.remove(&id).ok_or(StoreError::NotFound {
            kind: EntityKind::Column,
            id: id.0,
        })?;
        self.column_index
            .remove(&(column.dataset, column.table, column.column));
        Ok(())
    }

    fn datum(&self, id: DatumId) -> Option<&Datum> {
        self.data.get(&id)
    }

    fn find_datum(&self, key: &DatumKey) -> Option<&Datum> {
        self.datum_index.get(key).and_then(|id| self.data.get(id))
    }

    fn create_datum(&mut self, new: NewDatum) -> StoreResult<Datum> {
        self.require_dataset(new.dataset)?;
        if !self.locations.contains_key(&new.location) {
            return Err(StoreError::MissingReference {
                kind: EntityKind::Location,
                id: new.location.0,
            });
        }
        if !self.params.contains_key(&new.param) {
            return Err(StoreError::MissingReference {
                kind: EntityKind::Param,
                id: new.param.0,
            });
        }
        let key = new.key();
        if self.datum_index.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                kind: EntityKind::Datum,
                key: key.to_string(),
            });
        }
        let datum = Datum {
            id: DatumId(self.allocate_id()),
            dataset: new.dataset,
            location: new.location,
            param: new.param,
            x: new.x,
            value: new.value,
            tags: new.tags,
        };
        self.datum_index.insert(key, datum.id);
        self.data.insert(datum.id, datum.clone());
        Ok(datum)
    }

    fn delete_datum(&mut self, id: DatumId) -> StoreResult<()> {
        let datum = self.data.remove(&id).ok_or(StoreError::NotFound {
            kind: EntityKind::Datum,
            id: id.0,
        })?;
        self.datum_index.remove(&datum.key());
        Ok(())
    }

    fn datasets(&self) -> Vec<&Dataset> {
        self.datasets.values().collect()
    }

    fn locations(&self, dataset: DatasetId) -> Vec<&Location> {
        self.locations
            .values()
            .filter(|location| location.dataset == dataset)
            .collect()
    }

    fn params(&self, dataset: DatasetId) -> Vec<&Param> {
        self.params
            .values()
            .filter(|param| param.dataset == dataset)
            .collect()
    }

    fn columns(&self, dataset: DatasetId) -> Vec<&Column> {
        self.columns
            .values()
            .filter(|column| column.dataset == dataset)
            .collect()
    }

    fn data(&self) -> Box<dyn Iterator<Item = &Datum> + '_> {
        Box::new(self.data.values())
    }
}
