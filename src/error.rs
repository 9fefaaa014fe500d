//! Error handling for mudata operations.
//!
//! Provides the error taxonomy of the archive importer together with the
//! aggregate validation error produced by the entity model and the error type
//! of the persistence collaborator.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MudataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error in file {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Directory traversal failed: {0}")]
    DirectoryTraversal(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("\"{name}\" not found in import file")]
    MissingRequiredFile { name: String },

    #[error("\"{file}\" is missing column(s): {}", .columns.join(", "))]
    MissingRequiredColumns { file: String, columns: Vec<String> },

    #[error("Wrong number of columns in \"{file}\" on line {line}: expected {expected}, found {actual}")]
    MalformedRow {
        file: String,
        line: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Unresolved {kind} reference: {key}")]
    UnresolvedReference { kind: EntityKind, key: String },

    #[error("Invalid row in \"{file}\" on line {line}: {source}")]
    Validation {
        file: String,
        line: u64,
        #[source]
        source: ValidationError,
    },

    #[error("Could not parse x value: {value}")]
    UnparsableTemporalValue { value: String },

    #[error("Invalid tag syntax: {reason}")]
    InvalidTagSyntax { reason: String },

    #[error("Unsupported tag value type: {found}")]
    UnsupportedTagValueType { found: String },

    #[error("'{value}' is not one of datasets, locations, params, data, columns")]
    UnknownTableName { value: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid query: {reason}")]
    Query { reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl MudataError {
    pub fn csv(file: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            file: file.into(),
            source,
        }
    }

    pub fn query(reason: impl Into<String>) -> Self {
        Self::Query {
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True when the failure was a natural-key collision, either caught by
    /// validation or by the store's own unique index.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            Self::Validation { source, .. } => source.is_duplicate_key(),
            Self::Store(StoreError::DuplicateKey { .. }) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MudataError>;

/// The record kinds of the data model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Dataset,
    Location,
    Param,
    Column,
    Datum,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Dataset => "dataset",
            EntityKind::Location => "location",
            EntityKind::Param => "param",
            EntityKind::Column => "column",
            EntityKind::Datum => "datum",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a single violated constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    InvalidSlug,
    TooLong,
    Required,
    MissingReference,
    InconsistentReference,
    InvalidChoice,
    InvalidTags,
    DuplicateKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub kind: ViolationKind,
    pub reason: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Every constraint an entity violated, collected in one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub entity: EntityKind,
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            violations: Vec::new(),
        }
    }

    pub fn push(&mut self, field: &'static str, kind: ViolationKind, reason: impl Into<String>) {
        self.violations.push(FieldViolation {
            field,
            kind,
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Ok(())` when nothing was recorded, the error otherwise
    pub fn into_result(self) -> std::result::Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn has(&self, field: &str, kind: ViolationKind) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.kind == kind)
    }

    pub fn is_duplicate_key(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.kind == ViolationKind::DuplicateKey)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed validation: ", self.entity)?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Failures reported by a [`crate::store::Store`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} with key {key} already exists")]
    DuplicateKey { kind: EntityKind, key: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("referenced {kind} {id} does not exist")]
    MissingReference { kind: EntityKind, id: u64 },
}
