//! Zip-packaged document access: part lookup, relationships and rewriting the
//! package with replaced parts.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::dom::{parse_xml, XmlDocument};
use crate::error::{AssembleError, TemplateError};

const PACKAGE_RELS: &str = "_rels/.rels";
const DEFAULT_MAIN_PART: &str = "word/document.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

/// One `Relationship` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    /// Target resolved to a package part name (no leading slash).
    pub target: String,
    pub external: bool,
}

/// A read-only view over a template package.
pub struct Package<'a> {
    zip: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Package<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self, TemplateError> {
        let zip = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self { zip })
    }

    /// Raw bytes of a part, `None` if the package has no such entry.
    pub fn read_part(&mut self, name: &str) -> Result<Option<Vec<u8>>, TemplateError> {
        match self.zip.by_name(name) {
            Ok(mut entry) => {
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read and parse an XML part that must exist.
    pub fn parse_part(&mut self, name: &str) -> Result<XmlDocument, TemplateError> {
        let bytes = self
            .read_part(name)?
            .ok_or_else(|| TemplateError::MissingPart(name.to_string()))?;
        parse_xml(&bytes).map_err(|message| TemplateError::Xml {
            part: name.to_string(),
            message,
        })
    }

    /// Name of the main document part, from the package relationships.
    pub fn main_part(&mut self) -> Result<String, TemplateError> {
        let main = self
            .relationships(None)?
            .into_iter()
            .find(|r| r.rel_type.ends_with(OFFICE_DOCUMENT_REL) && !r.external)
            .map(|r| r.target)
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());
        if self.read_part(&main)?.is_none() {
            return Err(TemplateError::MissingPart(main));
        }
        Ok(main)
    }

    /// Relationships of `source` (or of the package itself for `None`).
    /// A missing `.rels` part means no relationships.
    pub fn relationships(&mut self, source: Option<&str>) -> Result<Vec<Relationship>, TemplateError> {
        let rels_name = match source {
            Some(part) => rels_part_name(part),
            None => PACKAGE_RELS.to_string(),
        };
        let Some(bytes) = self.read_part(&rels_name)? else {
            return Ok(Vec::new());
        };
        let doc = parse_xml(&bytes).map_err(|message| TemplateError::Xml {
            part: rels_name.clone(),
            message,
        })?;
        let base_dir = source.map(part_dir).unwrap_or("");

        let rels = doc
            .root()
            .into_iter()
            .flat_map(|root| root.children_named("Relationship"))
            .filter_map(|rel| {
                let id = rel.attr("Id")?;
                let target = rel.attr("Target")?;
                let external = rel.attr("TargetMode") == Some("External");
                Some(Relationship {
                    id: id.to_string(),
                    rel_type: rel.attr("Type").unwrap_or_default().to_string(),
                    target: if external {
                        target.to_string()
                    } else {
                        resolve_target(base_dir, target)
                    },
                    external,
                })
            })
            .collect();
        Ok(rels)
    }

    /// Write a copy of the package with some parts replaced. Untouched
    /// entries are copied raw; replaced parts are deflated.
    pub fn write_with(mut self, replaced: &HashMap<String, Vec<u8>>) -> Result<Vec<u8>, AssembleError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        for i in 0..self.zip.len() {
            let entry = self.zip.by_index(i).map_err(TemplateError::from)?;
            let name = entry.name().to_string();
            match replaced.get(&name) {
                Some(bytes) => {
                    writer.start_file(name.as_str(), options).map_err(write_error)?;
                    writer.write_all(bytes).map_err(write_error)?;
                }
                None => writer.raw_copy_file(entry).map_err(write_error)?,
            }
        }

        let cursor = writer.finish().map_err(write_error)?;
        Ok(cursor.into_inner())
    }
}

fn write_error(e: impl std::fmt::Display) -> AssembleError {
    AssembleError::Write(e.to_string())
}

/// `word/document.xml` → `word/_rels/document.xml.rels`.
pub fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target against the source part's directory.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
