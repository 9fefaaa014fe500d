//! Archive importer
//!
//! Imports a mudata archive into a [`Store`] as one all-or-nothing operation.
//! Tables are processed strictly in the order datasets, locations, params,
//! columns, data, because each stage resolves references to entities created
//! or confirmed by an earlier one.
//!
//! Datasets, locations, params and columns that already exist are reused
//! unchanged. Data rows are always new: a datum whose natural key already
//! exists aborts the whole import. Every entity created before a failure is
//! deleted again, so a failed import leaves the store as it found it.

pub mod archive;
pub mod resolve;
pub mod stats;
pub mod table;
pub mod unit_of_work;

#[cfg(test)]
mod tests;

pub use archive::{ExtractedArchive, find_table_file};
pub use stats::ImportSummary;
pub use unit_of_work::{CreatedEntity, UnitOfWork};

use crate::config::ImportConfig;
use crate::constants::{
    COLUMNS_FILE, DATA_FILE, DATASETS_FILE, LOCATIONS_FILE, PARAMS_FILE, required_columns,
};
use crate::error::{MudataError, Result, ValidationError};
use crate::models::{TableName, XValue};
use crate::store::Store;
use crate::validation::{ColumnDraft, DatasetDraft, DatumDraft, LocationDraft, ParamDraft};
use indicatif::ProgressBar;
use resolve::ReferenceIndex;
use std::fmt;
use std::fs;
use std::path::Path;
use table::{TableReader, TableRow};
use tracing::{debug, info, warn};

/// Position of an import in its lifecycle
///
/// `Committed` and `Aborted` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStage {
    Idle,
    Extracting,
    ParsingDatasets,
    ParsingLocations,
    ParsingParams,
    ParsingColumns,
    ParsingData,
    Committed,
    Aborted(String),
}

impl ImportStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStage::Committed | ImportStage::Aborted(_))
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStage::Idle => f.write_str("idle"),
            ImportStage::Extracting => f.write_str("extracting archive"),
            ImportStage::ParsingDatasets => write!(f, "parsing {}", DATASETS_FILE),
            ImportStage::ParsingLocations => write!(f, "parsing {}", LOCATIONS_FILE),
            ImportStage::ParsingParams => write!(f, "parsing {}", PARAMS_FILE),
            ImportStage::ParsingColumns => write!(f, "parsing {}", COLUMNS_FILE),
            ImportStage::ParsingData => write!(f, "parsing {}", DATA_FILE),
            ImportStage::Committed => f.write_str("committed"),
            ImportStage::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// Import a mudata archive held in memory using the default settings
pub fn import_archive(store: &mut dyn Store, bytes: &[u8]) -> Result<ImportSummary> {
    Importer::new(store).import_archive(bytes)
}

/// Runs one import against a store
pub struct Importer<'s> {
    store: &'s mut dyn Store,
    config: ImportConfig,
    progress: Option<ProgressBar>,
    stage: ImportStage,
}

impl<'s> Importer<'s> {
    pub fn new(store: &'s mut dyn Store) -> Self {
        Self {
            store,
            config: ImportConfig::default(),
            progress: None,
            stage: ImportStage::Idle,
        }
    }

    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    /// Advance `progress` once per imported data row
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn stage(&self) -> &ImportStage {
        &self.stage
    }

    /// Extract a zip archive and import it
    pub fn import_archive(&mut self, bytes: &[u8]) -> Result<ImportSummary> {
        self.begin()?;
        self.transition(ImportStage::Extracting);
        let archive = match ExtractedArchive::from_bytes(bytes) {
            Ok(archive) => archive,
            Err(e) => return Err(self.abort(UnitOfWork::new(), e)),
        };
        info!("Extracted {} files from archive", archive.file_count());

        // the extraction directory is removed when `archive` drops
        self.run(archive.path())
    }

    pub fn import_archive_file(&mut self, path: &Path) -> Result<ImportSummary> {
        let bytes = fs::read(path)?;
        info!("Importing archive {}", path.display());
        self.import_archive(&bytes)
    }

    /// Import an archive that has already been extracted to `root`
    pub fn import_directory(&mut self, root: &Path) -> Result<ImportSummary> {
        self.begin()?;
        info!("Importing directory {}", root.display());
        self.run(root)
    }

    fn begin(&self) -> Result<()> {
        if self.stage != ImportStage::Idle {
            return Err(MudataError::configuration(format!(
                "importer already used (stage: {}); create one importer per import",
                self.stage
            )));
        }
        Ok(())
    }

    fn transition(&mut self, stage: ImportStage) {
        debug!("Import stage: {} -> {}", self.stage, stage);
        if let Some(pb) = &self.progress {
            pb.set_message(stage.to_string());
        }
        self.stage = stage;
    }

    fn run(&mut self, root: &Path) -> Result<ImportSummary> {
        let mut work = UnitOfWork::new();
        let mut summary = ImportSummary::new();

        match self.run_stages(root, &mut work, &mut summary) {
            Ok(()) => {
                let created = work.commit();
                self.transition(ImportStage::Committed);
                if let Some(pb) = &self.progress {
                    pb.finish_with_message("import complete");
                }
                info!(
                    "Import committed: {} entities created, {} reused",
                    created,
                    summary.total_reused()
                );
                Ok(summary)
            }
            Err(e) => Err(self.abort(work, e)),
        }
    }

    fn abort(&mut self, work: UnitOfWork, error: MudataError) -> MudataError {
        warn!(
            "Import failed while {}: {}; rolling back {} created entities",
            self.stage,
            error,
            work.len()
        );
        let removed = work.rollback(&mut *self.store);
        debug!("Rollback removed {} entities", removed);
        if let Some(pb) = &self.progress {
            pb.abandon();
        }
        self.stage = ImportStage::Aborted(error.to_string());
        error
    }

    fn run_stages(
        &mut self,
        root: &Path,
        work: &mut UnitOfWork,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let mut index = ReferenceIndex::new();

        self.transition(ImportStage::ParsingDatasets);
        self.import_datasets(root, &mut index, work, summary)?;

        self.transition(ImportStage::ParsingLocations);
        self.import_locations(root, &mut index, work, summary)?;

        self.transition(ImportStage::ParsingParams);
        self.import_params(root, &mut index, work, summary)?;

        self.transition(ImportStage::ParsingColumns);
        self.import_columns(root, &mut index, work, summary)?;

        self.transition(ImportStage::ParsingData);
        self.import_data(root, &mut index, work, summary)?;

        Ok(())
    }

    fn import_datasets(
        &mut self,
        root: &Path,
        index: &mut ReferenceIndex,
        work: &mut UnitOfWork,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let mut table = open_table(root, DATASETS_FILE, required_columns::DATASETS)?;
        let file = table.file().to_string();

        for row in &mut table {
            let row = row?;
            let name = row.get("dataset");

            let id = match self.store.find_dataset(name).map(|d| d.id) {
                Some(id) => {
                    debug!("Reusing dataset '{}'", name);
                    summary.datasets_reused += 1;
                    id
                }
                None => {
                    let new = DatasetDraft::new(name)
                        .with_tags(row.get("tags"))
                        .validate(&*self.store)
                        .map_err(|e| invalid_row(&file, &row, e))?;
                    let dataset = self.store.create_dataset(new)?;
                    work.record(CreatedEntity::Dataset(dataset.id));
                    summary.datasets_created += 1;
                    dataset.id
                }
            };
            index.insert_dataset(name, id);
        }

        summary.rows_read += table.rows_read();
        info!(
            "{}: {} datasets created, {} reused",
            file, summary.datasets_created, summary.datasets_reused
        );
        Ok(())
    }

    fn import_locations(
        &mut self,
        root: &Path,
        index: &mut ReferenceIndex,
        work: &mut UnitOfWork,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let mut table = open_table(root, LOCATIONS_FILE, required_columns::LOCATIONS)?;
        let file = table.file().to_string();

        for row in &mut table {
            let row = row?;
            let dataset_name = row.get("dataset");
            let slug = row.get("location");
            let dataset = index.dataset(&*self.store, dataset_name)?;

            let id = match self.store.find_location(dataset, slug).map(|l| l.id) {
                Some(id) => {
                    debug!("Reusing location '{}' in '{}'", slug, dataset_name);
                    summary.locations_reused += 1;
                    id
                }
                None => {
                    let new = LocationDraft::new(Some(dataset), slug)
                        .with_tags(row.get("tags"))
                        .validate(&*self.store)
                        .map_err(|e| invalid_row(&file, &row, e))?;
                    let location = self.store.create_location(new)?;
                    work.record(CreatedEntity::Location(location.id));
                    summary.locations_created += 1;
                    location.id
                }
            };
            index.insert_location(dataset, slug, id);
        }

        summary.rows_read += table.rows_read();
        info!(
            "{}: {} locations created, {} reused",
            file, summary.locations_created, summary.locations_reused
        );
        Ok(())
    }

    fn import_params(
        &mut self,
        root: &Path,
        index: &mut ReferenceIndex,
        work: &mut UnitOfWork,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let mut table = open_table(root, PARAMS_FILE, required_columns::PARAMS)?;
        let file = table.file().to_string();

        for row in &mut table {
            let row = row?;
            let dataset_name = row.get("dataset");
            let slug = row.get("param");
            let dataset = index.dataset(&*self.store, dataset_name)?;

            let id = match self.store.find_param(dataset, slug).map(|p| p.id) {
                Some(id) => {
                    debug!("Reusing param '{}' in '{}'", slug, dataset_name);
                    summary.params_reused += 1;
                    id
                }
                None => {
                    let new = ParamDraft::new(Some(dataset), slug)
                        .with_tags(row.get("tags"))
                        .validate(&*self.store)
                        .map_err(|e| invalid_row(&file, &row, e))?;
                    let param = self.store.create_param(new)?;
                    work.record(CreatedEntity::Param(param.id));
                    summary.params_created += 1;
                    param.id
                }
            };
            index.insert_param(dataset, slug, id);
        }

        summary.rows_read += table.rows_read();
        info!(
            "{}: {} params created, {} reused",
            file, summary.params_created, summary.params_reused
        );
        Ok(())
    }

    fn import_columns(
        &mut self,
        root: &Path,
        index: &mut ReferenceIndex,
        work: &mut UnitOfWork,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let mut table = open_table(root, COLUMNS_FILE, required_columns::COLUMNS)?;
        let file = table.file().to_string();

        for row in &mut table {
            let row = row?;
            let dataset_name = row.get("dataset");
            let table_name = row.get("table");
            let column = row.get("column");
            let dataset = index.dataset(&*self.store, dataset_name)?;

            // an unknown table name falls through to validation, which reports it
            let existing = table_name
                .parse::<TableName>()
                .ok()
                .and_then(|t| self.store.find_column(dataset, t, column))
                .map(|c| c.id);

            if existing.is_some() {
                debug!(
                    "Reusing column '{}.{}' in '{}'",
                    table_name, column, dataset_name
                );
                summary.columns_reused += 1;
                continue;
            }

            let new = ColumnDraft::new(Some(dataset), table_name, column)
                .with_tags(row.get("tags"))
                .validate(&*self.store)
                .map_err(|e| invalid_row(&file, &row, e))?;
            let created = self.store.create_column(new)?;
            work.record(CreatedEntity::Column(created.id));
            summary.columns_created += 1;
        }

        summary.rows_read += table.rows_read();
        info!(
            "{}: {} columns created, {} reused",
            file, summary.columns_created, summary.columns_reused
        );
        Ok(())
    }

    fn import_data(
        &mut self,
        root: &Path,
        index: &mut ReferenceIndex,
        work: &mut UnitOfWork,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let mut table = open_table(root, DATA_FILE, required_columns::DATA)?;
        let file = table.file().to_string();

        for row in &mut table {
            let row = row?;
            let dataset_name = row.get("dataset");
            let dataset = index.dataset(&*self.store, dataset_name)?;
            let location =
                index.location(&*self.store, (dataset, dataset_name), row.get("location"))?;
            let param = index.param(&*self.store, (dataset, dataset_name), row.get("param"))?;

            // missing-value markers become an absent value
            let value = row.get("value");
            let value = (!self.config.is_missing_value(value)).then(|| value.to_string());
            // a failed temporal parse routes x to the raw representation
            let x = XValue::from_text(row.get("x"));

            let new = DatumDraft::new(Some(dataset), Some(location), Some(param), Some(x))
                .with_value(value)
                .with_tags(row.get("tags"))
                .validate(&*self.store)
                .map_err(|e| invalid_row(&file, &row, e))?;
            let datum = self.store.create_datum(new)?;
            work.record(CreatedEntity::Datum(datum.id));

            match datum.x {
                XValue::Typed(_) => summary.data_created += 1,
                XValue::Raw(_) => summary.raw_data_created += 1,
            }
            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        summary.rows_read += table.rows_read();
        info!(
            "{}: {} data created ({} typed, {} raw)",
            file,
            summary.total_data(),
            summary.data_created,
            summary.raw_data_created
        );
        Ok(())
    }
}

fn open_table(root: &Path, name: &str, required: &'static [&'static str]) -> Result<TableReader> {
    let path = find_table_file(root, name)?;
    debug!("Found {} at {}", name, path.display());
    TableReader::open(&path, required)
}

fn invalid_row(file: &str, row: &TableRow, source: ValidationError) -> MudataError {
    MudataError::Validation {
        file: file.to_string(),
        line: row.line(),
        source,
    }
}
