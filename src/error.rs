//! Error types for every fallible pipeline stage.
//!
//! Batch-level failures ([`Error::Template`], [`Error::ColumnValidation`],
//! [`Error::Archive`]) abort the whole run. Per-row failures are recorded as
//! [`RowError`] values inside the batch result and never propagate.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The template bytes are not a usable zip-packaged document.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template is not a valid zip package: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to read template part: {0}")]
    Io(#[from] std::io::Error),
    #[error("template is missing part '{0}'")]
    MissingPart(String),
    #[error("malformed XML in part '{part}': {message}")]
    Xml { part: String, message: String },
}

/// Failure while producing one document from the template.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("value contains a character that cannot be stored in a document: U+{0:04X}")]
    InvalidCharacter(u32),
    #[error("failed to write document package: {0}")]
    Write(String),
}

/// Failure while bundling generated documents into one archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("duplicate archive entry name: {0}")]
    DuplicateName(String),
    #[error("failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to write archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for a batch run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("missing required columns: {}", .missing.join(", "))]
    ColumnValidation { missing: Vec<String> },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("invalid row source: {0}")]
    Rows(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A row that could not be turned into a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based position of the row in the source.
    pub index: usize,
    /// The row's NOMBRE value, or `N/A`.
    pub label: String,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} ({}): {}", self.index, self.label, self.message)
    }
}
