//! Rollback bookkeeping for one import
//!
//! Every entity an import creates is recorded here. On failure the recorded
//! entities are deleted newest first; on success the record is discarded.
//! Reused entities are never recorded, so a rollback cannot touch them.

use crate::error::StoreError;
use crate::models::{ColumnId, DatasetId, DatumId, LocationId, ParamId};
use crate::store::Store;
use tracing::{debug, warn};

/// Handle of an entity created during an import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedEntity {
    Dataset(DatasetId),
    Location(LocationId),
    Param(ParamId),
    Column(ColumnId),
    Datum(DatumId),
}

#[derive(Debug, Default)]
pub struct UnitOfWork {
    created: Vec<CreatedEntity>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entity: CreatedEntity) {
        self.created.push(entity);
    }

    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Keep every recorded entity; returns how many were created
    pub fn commit(self) -> usize {
        self.created.len()
    }

    /// Delete every recorded entity, newest first
    ///
    /// Entities already removed by an earlier cascading delete are skipped.
    /// Returns the number of entities this call deleted.
    pub fn rollback(self, store: &mut dyn Store) -> usize {
        let mut removed = 0;
        for entity in self.created.into_iter().rev() {
            let result = match entity {
                CreatedEntity::Dataset(id) => store.delete_dataset(id),
                CreatedEntity::Location(id) => store.delete_location(id),
                CreatedEntity::Param(id) => store.delete_param(id),
                CreatedEntity::Column(id) => store.delete_column(id),
                CreatedEntity::Datum(id) => store.delete_datum(id),
            };
            match result {
                Ok(()) => removed += 1,
                Err(StoreError::NotFound { .. }) => {
                    debug!("{:?} already removed by cascade", entity);
                }
                Err(e) => warn!("Failed to roll back {:?}: {}", entity, e),
            }
        }
        removed
    }
}
