//! Archive packing – bundles generated documents into one deflated zip.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use chrono::{DateTime, TimeZone};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::batch::GeneratedDocument;
use crate::error::ArchiveError;

/// One entry per document, named by its filename, in production order.
/// Duplicate names are rejected rather than written twice.
pub fn pack(documents: &[GeneratedDocument]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut seen: HashSet<&str> = HashSet::new();
    for doc in documents {
        if !seen.insert(doc.filename.as_str()) {
            return Err(ArchiveError::DuplicateName(doc.filename.clone()));
        }
        writer.start_file(doc.filename.as_str(), options)?;
        writer.write_all(&doc.content)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// `contratos_generados_YYYYMMDD_HHMMSS.zip` for the given instant.
pub fn archive_name<Tz: TimeZone>(at: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("contratos_generados_{}.zip", at.format("%Y%m%d_%H%M%S"))
}
