//! Batch orchestration – one document per row, in row order, with per-row
//! failure isolation.

use serde::{Deserialize, Serialize};

use crate::assemble::Template;
use crate::error::{Error, RowError};
use crate::pipeline::PipelineConfig;
use crate::variables::{bind, Field, Row, Table, VariableMap};

const NO_LABEL: &str = "N/A";

/// A finished document for one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDocument {
    pub filename: String,
    /// `"{NOMBRE} - {CÉDULA}"`, shown in the success list.
    pub summary: String,
    /// 1-based source row.
    pub row: usize,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// Outcome of a batch run. Every row lands in exactly one of the two lists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub documents: Vec<GeneratedDocument>,
    pub errors: Vec<RowError>,
}

impl BatchResult {
    /// Human-readable report: success count, then each failure.
    pub fn summary(&self) -> String {
        let mut out = format!("{} contract(s) generated", self.documents.len());
        for (i, doc) in self.documents.iter().enumerate() {
            out.push_str(&format!("\n  {}. {}", i + 1, doc.summary));
        }
        if !self.documents.is_empty() {
            out.push_str("\nArchive ready for download.");
        }
        if !self.errors.is_empty() {
            out.push_str(&format!("\n{} row(s) failed:", self.errors.len()));
            for err in &self.errors {
                out.push_str(&format!("\n  • {err}"));
            }
        }
        out
    }
}

/// Progress after each attempted row.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// Rows attempted so far, failed ones included.
    pub attempted: usize,
    pub total: usize,
    pub label: &'a str,
}

/// Handling of rows whose output filenames collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateNames {
    /// Append ` (2)`, ` (3)`, … before the extension.
    #[default]
    Suffix,
    /// Keep identical names; packing will then reject the batch.
    Keep,
}

/// Generate one document per row.
pub fn run(table: &Table, template: &[u8], config: &PipelineConfig) -> Result<BatchResult, Error> {
    run_with_progress(table, template, config, |_| {})
}

/// Like [`run`], calling `on_progress` after every row.
///
/// Column validation and template parsing happen once, before any row; a
/// failure there aborts the batch. Row failures are recorded and skipped.
pub fn run_with_progress<F>(
    table: &Table,
    template: &[u8],
    config: &PipelineConfig,
    mut on_progress: F,
) -> Result<BatchResult, Error>
where
    F: FnMut(&Progress<'_>),
{
    let missing = table.missing_columns();
    if !missing.is_empty() {
        return Err(Error::ColumnValidation { missing });
    }

    let template = Template::load(template)?;
    for field in template.missing_placeholders() {
        log::warn!("Template never mentions placeholder {}", field.token());
    }

    let total = table.len();
    log::info!(
        "Generating {total} contract(s) from a template with {} paragraph(s)",
        template.paragraph_count()
    );

    let mut result = BatchResult::default();
    for (i, row) in table.rows.iter().enumerate() {
        let index = i + 1;
        let label = row_label(row);

        match generate_row(&template, row, config) {
            Ok((vars, content)) => {
                let filename = unique_name(output_filename(&vars), &result.documents, config.duplicates);
                log::debug!("Row {index}: generated {filename} ({} bytes)", content.len());
                result.documents.push(GeneratedDocument {
                    filename,
                    summary: format!("{} - {}", vars.value(Field::Name), vars.value(Field::IdNumber)),
                    row: index,
                    content,
                });
            }
            Err(message) => {
                log::warn!("Row {index} ({label}) failed: {message}");
                result.errors.push(RowError {
                    index,
                    label: label.to_string(),
                    message,
                });
            }
        }

        on_progress(&Progress {
            attempted: index,
            total,
            label,
        });
    }

    log::info!(
        "Batch finished: {} generated, {} failed",
        result.documents.len(),
        result.errors.len()
    );
    Ok(result)
}

fn generate_row(template: &Template<'_>, row: &Row, config: &PipelineConfig) -> Result<(VariableMap, Vec<u8>), String> {
    let vars = bind(row);
    let content = template.assemble(&vars, config).map_err(|e| e.to_string())?;
    Ok((vars, content))
}

fn row_label(row: &Row) -> &str {
    match row.get(Field::Name.column()) {
        Some(name) if !name.is_empty() => name,
        _ => NO_LABEL,
    }
}

/// `Contrato_{NOMBRE}_{CÉDULA}_{CONTRATO NÚMERO}.docx`, path separators
/// replaced with `-`.
pub fn output_filename(vars: &VariableMap) -> String {
    format!(
        "Contrato_{}_{}_{}.docx",
        sanitize(vars.value(Field::Name)),
        sanitize(vars.value(Field::IdNumber)),
        sanitize(vars.value(Field::ContractNumber)),
    )
}

fn sanitize(component: &str) -> String {
    component.replace(['/', '\\'], "-")
}

fn unique_name(name: String, existing: &[GeneratedDocument], policy: DuplicateNames) -> String {
    let taken = |candidate: &str| existing.iter().any(|d| d.filename == candidate);
    if policy == DuplicateNames::Keep || !taken(&name) {
        return name;
    }

    let stem = name.strip_suffix(".docx").unwrap_or(&name);
    let renamed = (2..)
        .map(|n| format!("{stem} ({n}).docx"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.clone());
    log::warn!("Duplicate output name {name}, writing {renamed}");
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> GeneratedDocument {
        GeneratedDocument {
            filename: name.to_string(),
            summary: String::new(),
            row: 1,
            content: Vec::new(),
        }
    }

    #[test]
    fn filename_sanitizes_path_separators() {
        let vars = bind(
            &Row::new()
                .with("NOMBRE", Some("Ana Ruiz"))
                .with("CÉDULA", Some("12/345\\6"))
                .with("CONTRATO NÚMERO", Some("C-1")),
        );
        assert_eq!(output_filename(&vars), "Contrato_Ana Ruiz_12-345-6_C-1.docx");
    }

    #[test]
    fn filename_with_absent_values() {
        let vars = bind(&Row::new());
        assert_eq!(output_filename(&vars), "Contrato___.docx");
    }

    #[test]
    fn duplicate_names_get_suffixes() {
        let existing = vec![doc("Contrato_A_1_X.docx"), doc("Contrato_A_1_X (2).docx")];
        assert_eq!(
            unique_name("Contrato_A_1_X.docx".into(), &existing, DuplicateNames::Suffix),
            "Contrato_A_1_X (3).docx"
        );
        assert_eq!(
            unique_name("Contrato_A_1_X.docx".into(), &existing, DuplicateNames::Keep),
            "Contrato_A_1_X.docx"
        );
        assert_eq!(
            unique_name("Contrato_B_2_Y.docx".into(), &existing, DuplicateNames::Suffix),
            "Contrato_B_2_Y.docx"
        );
    }

    #[test]
    fn row_label_falls_back() {
        assert_eq!(row_label(&Row::new().with("NOMBRE", Some("Eva"))), "Eva");
        assert_eq!(row_label(&Row::new().with("NOMBRE", None)), "N/A");
        assert_eq!(row_label(&Row::new()), "N/A");
    }

    #[test]
    fn missing_columns_abort_before_any_row() {
        let table = Table::from_rows(vec![Row::new().with("NOMBRE", Some("Ana")); 3]);
        let err = run(&table, b"not even a template", &PipelineConfig::default()).unwrap_err();
        match err {
            Error::ColumnValidation { missing } => {
                assert_eq!(missing.len(), 7);
                assert!(!missing.contains(&"NOMBRE".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn summary_lists_successes_and_failures() {
        let result = BatchResult {
            documents: vec![GeneratedDocument {
                summary: "Ana - 1".into(),
                ..doc("a.docx")
            }],
            errors: vec![RowError {
                index: 2,
                label: "N/A".into(),
                message: "bad".into(),
            }],
        };
        let text = result.summary();
        assert!(text.starts_with("1 contract(s) generated"));
        assert!(text.contains("1. Ana - 1"));
        assert!(text.contains("row 2 (N/A): bad"));
    }
}
