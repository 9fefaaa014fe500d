//! Entity construction and validation.
//!
//! Drafts hold unvalidated field values as they arrive from an archive row or
//! an interactive edit. `validate` checks every constraint against the store
//! and either returns the record ready for creation or a [`ValidationError`]
//! listing all violations, not only the first.

use crate::constants::{SLUG_MAX_LENGTH, SLUG_PATTERN, TEXT_MAX_LENGTH};
use crate::error::{EntityKind, ValidationError, ViolationKind};
use crate::models::{
    DatasetId, DatumKey, LocationId, NewColumn, NewDataset, NewDatum, NewLocation, NewParam,
    ParamId, TableName, XValue,
};
use crate::store::Store;
use crate::tags::Tags;
use regex::Regex;
use std::sync::LazyLock;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SLUG_PATTERN).expect("slug pattern is a valid regex"));

type Validated<T> = std::result::Result<T, ValidationError>;

/// True for strings made only of lowercase letters, digits, hyphens and underscores
pub fn is_valid_slug(value: &str) -> bool {
    SLUG_RE.is_match(value)
}

fn check_slug(errors: &mut ValidationError, field: &'static str, value: &str) -> bool {
    if value.is_empty() {
        errors.push(field, ViolationKind::Required, "this field is required");
        return false;
    }
    let mut ok = true;
    if value.chars().count() > SLUG_MAX_LENGTH {
        errors.push(
            field,
            ViolationKind::TooLong,
            format!(
                "'{}' has more than {} characters",
                value, SLUG_MAX_LENGTH
            ),
        );
        ok = false;
    }
    if !is_valid_slug(value) {
        errors.push(
            field,
            ViolationKind::InvalidSlug,
            format!(
                "'{}' may only contain lowercase letters, numbers, underscores or hyphens",
                value
            ),
        );
        ok = false;
    }
    ok
}

fn check_tags(errors: &mut ValidationError, text: &str) -> Option<Tags> {
    match Tags::decode(text) {
        Ok(tags) => Some(tags),
        Err(e) => {
            errors.push("tags", ViolationKind::InvalidTags, e.to_string());
            None
        }
    }
}

fn check_dataset(
    errors: &mut ValidationError,
    store: &dyn Store,
    dataset: Option<DatasetId>,
) -> Option<DatasetId> {
    match dataset {
        None => {
            errors.push("dataset", ViolationKind::Required, "this field is required");
            None
        }
        Some(id) if store.dataset(id).is_none() => {
            errors.push(
                "dataset",
                ViolationKind::MissingReference,
                format!("dataset {} does not exist", id),
            );
            None
        }
        Some(id) => Some(id),
    }
}

fn check_text_length(
    errors: &mut ValidationError,
    field: &'static str,
    value: &str,
) -> bool {
    if value.chars().count() > TEXT_MAX_LENGTH {
        errors.push(
            field,
            ViolationKind::TooLong,
            format!("value has more than {} characters", TEXT_MAX_LENGTH),
        );
        false
    } else {
        true
    }
}

fn duplicate(errors: &mut ValidationError, field: &'static str, what: String) {
    errors.push(
        field,
        ViolationKind::DuplicateKey,
        format!("{} already exists", what),
    );
}

// =============================================================================
// Drafts
// =============================================================================

/// Unvalidated dataset row
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDraft {
    /// Dataset name, must be a slug
    pub dataset: String,
    /// Encoded tag text as read from the table
    pub tags: String,
}

impl DatasetDraft {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            tags: "{}".to_string(),
        }
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Check every constraint, reporting all violations at once
    pub fn validate(&self, store: &dyn Store) -> Validated<NewDataset> {
        let mut errors = ValidationError::new(EntityKind::Dataset);

        let slug_ok = check_slug(&mut errors, "dataset", &self.dataset);
        let tags = check_tags(&mut errors, &self.tags);

        if slug_ok && store.find_dataset(&self.dataset).is_some() {
            duplicate(
                &mut errors,
                "dataset",
                format!("dataset '{}'", self.dataset),
            );
        }

        errors.into_result()?;
        Ok(NewDataset {
            dataset: self.dataset.clone(),
            tags: tags.unwrap_or_default(),
        })
    }
}

/// Unvalidated location row
#[derive(Debug, Clone, PartialEq)]
pub struct LocationDraft {
    /// Owning dataset; `None` is a required-field violation
    pub dataset: Option<DatasetId>,
    /// Location slug, unique within the dataset
    pub location: String,
    pub tags: String,
}

impl LocationDraft {
    pub fn new(dataset: Option<DatasetId>, location: impl Into<String>) -> Self {
        Self {
            dataset,
            location: location.into(),
            tags: "{}".to_string(),
        }
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn validate(&self, store: &dyn Store) -> Validated<NewLocation> {
        let mut errors = ValidationError::new(EntityKind::Location);

        let dataset = check_dataset(&mut errors, store, self.dataset);
        let slug_ok = check_slug(&mut errors, "location", &self.location);
        let tags = check_tags(&mut errors, &self.tags);

        if let Some(dataset) = dataset {
            if slug_ok && store.find_location(dataset, &self.location).is_some() {
                duplicate(
                    &mut errors,
                    "location",
                    format!("location '{}' in this dataset", self.location),
                );
            }
        }

        let (Some(dataset), true) = (dataset, errors.is_empty()) else {
            return Err(errors);
        };
        Ok(NewLocation {
            dataset,
            location: self.location.clone(),
            tags: tags.unwrap_or_default(),
        })
    }
}

/// Unvalidated param row
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDraft {
    /// Owning dataset; `None` is a required-field violation
    pub dataset: Option<DatasetId>,
    /// Param slug, unique within the dataset
    pub param: String,
    pub tags: String,
}

impl ParamDraft {
    pub fn new(dataset: Option<DatasetId>, param: impl Into<String>) -> Self {
        Self {
            dataset,
            param: param.into(),
            tags: "{}".to_string(),
        }
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn validate(&self, store: &dyn Store) -> Validated<NewParam> {
        let mut errors = ValidationError::new(EntityKind::Param);

        let dataset = check_dataset(&mut errors, store, self.dataset);
        let slug_ok = check_slug(&mut errors, "param", &self.param);
        let tags = check_tags(&mut errors, &self.tags);

        if let (Some(dataset), true) = (dataset, slug_ok) {
            if store.find_param(dataset, &self.param).is_some() {
                duplicate(
                    &mut errors,
                    "param",
                    format!("param '{}' in this dataset", self.param),
                );
            }
        }

        let (Some(dataset), true) = (dataset, errors.is_empty()) else {
            return Err(errors);
        };
        Ok(NewParam {
            dataset,
            param: self.param.clone(),
            tags: tags.unwrap_or_default(),
        })
    }
}

/// Unvalidated column metadata row
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDraft {
    pub dataset: Option<DatasetId>,
    /// Table name text; must name one of the five tables
    pub table: String,
    /// Column slug, unique within (dataset, table)
    pub column: String,
    pub tags: String,
}

impl ColumnDraft {
    pub fn new(
        dataset: Option<DatasetId>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            dataset,
            table: table.into(),
            column: column.into(),
            tags: "{}".to_string(),
        }
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn validate(&self, store: &dyn Store) -> Validated<NewColumn> {
        let mut errors = ValidationError::new(EntityKind::Column);

        let dataset = check_dataset(&mut errors, store, self.dataset);
        let table = match self.table.parse::<TableName>() {
            Ok(table) => Some(table),
            Err(e) => {
                errors.push("table", ViolationKind::InvalidChoice, e.to_string());
                None
            }
        };
        let slug_ok = check_slug(&mut errors, "column", &self.column);
        let tags = check_tags(&mut errors, &self.tags);

        if let (Some(dataset), Some(table), true) = (dataset, table, slug_ok) {
            if store.find_column(dataset, table, &self.column).is_some() {
                duplicate(
                    &mut errors,
                    "column",
                    format!("column '{}' of table '{}' in this dataset", self.column, table),
                );
            }
        }

        let (Some(dataset), Some(table), true) = (dataset, table, errors.is_empty()) else {
            return Err(errors);
        };
        Ok(NewColumn {
            dataset,
            table,
            column: self.column.clone(),
            tags: tags.unwrap_or_default(),
        })
    }
}

/// Unvalidated data row with its x already routed to a representation
#[derive(Debug, Clone, PartialEq)]
pub struct DatumDraft {
    pub dataset: Option<DatasetId>,
    /// Must belong to `dataset`
    pub location: Option<LocationId>,
    /// Must belong to `dataset`
    pub param: Option<ParamId>,
    pub x: Option<XValue>,
    /// Absent values are allowed; present ones are length limited
    pub value: Option<String>,
    pub tags: String,
}

impl DatumDraft {
    pub fn new(
        dataset: Option<DatasetId>,
        location: Option<LocationId>,
        param: Option<ParamId>,
        x: Option<XValue>,
    ) -> Self {
        Self {
            dataset,
            location,
            param,
            x,
            value: None,
            tags: "{}".to_string(),
        }
    }

    pub fn with_value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn validate(&self, store: &dyn Store) -> Validated<NewDatum> {
        let mut errors = ValidationError::new(EntityKind::Datum);

        let dataset = check_dataset(&mut errors, store, self.dataset);

        // references must exist and share the datum's dataset

        let location = match self.location {
            None => {
                errors.push("location", ViolationKind::Required, "this field is required");
                None
            }
            Some(id) => match store.location(id) {
                None => {
                    errors.push(
                        "location",
                        ViolationKind::MissingReference,
                        format!("location {} does not exist", id),
                    );
                    None
                }
                Some(location) if dataset.is_some_and(|d| d != location.dataset) => {
                    errors.push(
                        "location",
                        ViolationKind::InconsistentReference,
                        format!("location '{}' belongs to another dataset", location.location),
                    );
                    None
                }
                Some(location) => Some(location.id),
            },
        };

        let param = match self.param {
            None => {
                errors.push("param", ViolationKind::Required, "this field is required");
                None
            }
            Some(id) => match store.param(id) {
                None => {
                    errors.push(
                        "param",
                        ViolationKind::MissingReference,
                        format!("param {} does not exist", id),
                    );
                    None
                }
                Some(param) if dataset.is_some_and(|d| d != param.dataset) => {
                    errors.push(
                        "param",
                        ViolationKind::InconsistentReference,
                        format!("param '{}' belongs to another dataset", param.param),
                    );
                    None
                }
                Some(param) => Some(param.id),
            },
        };

        let x = match &self.x {
            None => {
                errors.push("x", ViolationKind::Required, "this field is required");
                None
            }
            Some(XValue::Raw(text)) if text.is_empty() => {
                errors.push("x", ViolationKind::Required, "this field is required");
                None
            }
            Some(x @ XValue::Raw(text)) => check_text_length(&mut errors, "x", text).then(|| x.clone()),
            Some(x) => Some(x.clone()),
        };

        if let Some(value) = &self.value {
            check_text_length(&mut errors, "value", value);
        }
        let tags = check_tags(&mut errors, &self.tags);

        let key = match (dataset, location, param, x) {
            (Some(dataset), Some(location), Some(param), Some(x)) => Some(DatumKey {
                dataset,
                location,
                param,
                x,
            }),
            _ => None,
        };
        if let Some(key) = &key {
            if store.find_datum(key).is_some() {
                duplicate(&mut errors, "x", self.describe_key(store, key));
            }
        }

        let (Some(key), true) = (key, errors.is_empty()) else {
            return Err(errors);
        };
        Ok(NewDatum {
            dataset: key.dataset,
            location: key.location,
            param: key.param,
            x: key.x,
            value: self.value.clone(),
            tags: tags.unwrap_or_default(),
        })
    }

    fn describe_key(&self, store: &dyn Store, key: &DatumKey) -> String {
        let dataset = store
            .dataset(key.dataset)
            .map(|d| d.dataset.as_str())
            .unwrap_or("?");
        let location = store
            .location(key.location)
            .map(|l| l.location.as_str())
            .unwrap_or("?");
        let param = store
            .param(key.param)
            .map(|p| p.param.as_str())
            .unwrap_or("?");
        format!(
            "datum with dataset, location, param and x ({} / {} / {} / {})",
            dataset, location, param, key.x
        )
    }
}
