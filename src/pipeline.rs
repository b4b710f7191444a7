//! Pipeline – ties together template validation, batch generation and archive
//! packing into a single call. This is the boundary a form or other front end
//! talks to: template bytes and rows in, a batch result plus archive out.

use serde::{Deserialize, Serialize};

use crate::archive::{archive_name, pack};
use crate::assemble::{HeaderScope, UntouchedParagraphs};
use crate::batch::{run_with_progress, BatchResult, DuplicateNames, Progress};
use crate::error::Error;
use crate::style::StyleConfig;
use crate::substitute::HighlightMode;
use crate::variables::Table;

/// Configuration for contract generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Font and highlight settings for rebuilt runs.
    pub style: StyleConfig,
    /// Which substituted values get the highlight style.
    pub highlight: HighlightMode,
    /// Treatment of paragraphs without placeholders.
    pub untouched: UntouchedParagraphs,
    /// Header/footer variants to process.
    pub headers: HeaderScope,
    /// Handling of rows that resolve to the same output filename.
    pub duplicates: DuplicateNames,
}

impl PipelineConfig {
    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Everything a front end needs after a run.
#[derive(Debug)]
pub struct Generation {
    pub result: BatchResult,
    /// Deflated archive of the successful documents; `None` when no row
    /// succeeded.
    pub archive: Option<Vec<u8>>,
    /// Suggested download name, `contratos_generados_YYYYMMDD_HHMMSS.zip`.
    pub archive_name: String,
}

/// Full pipeline: template + rows → documents + archive.
pub fn generate_contracts(
    template: &[u8],
    table: &Table,
    config: &PipelineConfig,
) -> Result<Generation, Error> {
    generate_contracts_with_progress(template, table, config, |_| {})
}

/// Same as [`generate_contracts`], reporting progress after every row.
pub fn generate_contracts_with_progress<F>(
    template: &[u8],
    table: &Table,
    config: &PipelineConfig,
    on_progress: F,
) -> Result<Generation, Error>
where
    F: FnMut(&Progress<'_>),
{
    let result = run_with_progress(table, template, config, on_progress)?;

    let archive = if result.documents.is_empty() {
        None
    } else {
        let bytes = pack(&result.documents)?;
        log::info!(
            "Packed {} document(s) into a {} byte archive",
            result.documents.len(),
            bytes.len()
        );
        Some(bytes)
    };

    Ok(Generation {
        result,
        archive,
        archive_name: archive_name(chrono::Local::now()),
    })
}
