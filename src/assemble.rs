//! Document assembly – applies placeholder substitution to every paragraph of
//! a template: body paragraphs, table cells, and the headers and footers of
//! every section.
//!
//! Each call re-parses the template bytes, so no state is shared between
//! generated documents.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dom::{write_xml, ElementNode, XmlDocument, XmlNode};
use crate::error::{AssembleError, TemplateError};
use crate::package::{Package, Relationship};
use crate::pipeline::PipelineConfig;
use crate::style::RunStyle;
use crate::substitute::{substitute, TextRun};
use crate::variables::{Field, VariableMap};

/// What happens to paragraphs in which no placeholder was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UntouchedParagraphs {
    /// Restyle their runs with the plain style, keeping fields, hyperlinks
    /// and other non-run content.
    #[default]
    Normalize,
    /// Leave them exactly as in the template.
    Preserve,
}

/// Which header/footer variants of a section are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderScope {
    /// The default (odd-page) header and footer only.
    #[default]
    Default,
    /// Default, first-page and even-page variants.
    All,
}

/// A validated template. Holds the raw bytes; every [`Template::assemble`]
/// call parses them afresh.
#[derive(Debug, Clone)]
pub struct Template<'a> {
    bytes: &'a [u8],
    main_part: String,
    paragraph_count: usize,
    missing: Vec<Field>,
}

impl<'a> Template<'a> {
    /// Check that `bytes` is a usable document package: the main part, its
    /// body, and every header/footer part it references must parse.
    pub fn load(bytes: &'a [u8]) -> Result<Self, TemplateError> {
        let mut package = Package::open(bytes)?;
        let main_part = package.main_part()?;
        let mut doc = package.parse_part(&main_part)?;
        let rels = package.relationships(Some(&main_part))?;
        let header_parts = section_parts(&doc, &rels, HeaderScope::All);

        let mut texts = Vec::new();
        let mut collect = |p: &mut ElementNode| -> Result<(), TemplateError> {
            texts.push(paragraph_text(p));
            Ok(())
        };
        let body = body_mut(&mut doc, &main_part)?;
        visit_body(body, &mut collect)?;
        for part in &header_parts {
            let mut part_doc = package.parse_part(part)?;
            if let Some(root) = part_doc.root_mut() {
                visit_paragraphs(root, &mut collect)?;
            }
        }

        let missing = Field::ALL
            .iter()
            .copied()
            .filter(|f| !texts.iter().any(|t| t.contains(f.token())))
            .collect();

        Ok(Self {
            bytes,
            main_part,
            paragraph_count: texts.len(),
            missing,
        })
    }

    pub fn main_part(&self) -> &str {
        &self.main_part
    }

    /// Paragraphs found in the body, tables, headers and footers.
    pub fn paragraph_count(&self) -> usize {
        self.paragraph_count
    }

    /// Fields whose token does not appear anywhere in the template text.
    pub fn missing_placeholders(&self) -> &[Field] {
        &self.missing
    }

    pub fn assemble(&self, vars: &VariableMap, config: &PipelineConfig) -> Result<Vec<u8>, AssembleError> {
        assemble(self.bytes, vars, config)
    }
}

/// Produce one document: substitute `vars` into a fresh copy of `template`
/// and serialise it back to package bytes.
pub fn assemble(template: &[u8], vars: &VariableMap, config: &PipelineConfig) -> Result<Vec<u8>, AssembleError> {
    let mut package = Package::open(template)?;
    let main_part = package.main_part()?;
    let mut doc = package.parse_part(&main_part)?;
    let rels = package.relationships(Some(&main_part))?;
    let header_parts = section_parts(&doc, &rels, config.headers);

    let mut changed = 0usize;
    let mut rewrite = |p: &mut ElementNode| -> Result<(), AssembleError> {
        if rewrite_paragraph(p, vars, config)? {
            changed += 1;
        }
        Ok(())
    };

    let body = body_mut(&mut doc, &main_part)?;
    visit_body(body, &mut rewrite)?;

    let mut replaced = HashMap::new();
    replaced.insert(main_part.clone(), write_xml(&doc).map_err(AssembleError::Write)?);

    for part in header_parts {
        let mut part_doc = package.parse_part(&part)?;
        if let Some(root) = part_doc.root_mut() {
            visit_paragraphs(root, &mut rewrite)?;
        }
        replaced.insert(part, write_xml(&part_doc).map_err(AssembleError::Write)?);
    }

    log::debug!(
        "Substituted placeholders in {changed} paragraph(s) across {} part(s)",
        replaced.len()
    );
    package.write_with(&replaced)
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

type Visitor<'v, E> = dyn FnMut(&mut ElementNode) -> Result<(), E> + 'v;

fn body_mut<'d>(doc: &'d mut XmlDocument, part: &str) -> Result<&'d mut ElementNode, TemplateError> {
    doc.root_mut()
        .and_then(|root| root.children_named_mut("body").next())
        .ok_or_else(|| TemplateError::Xml {
            part: part.to_string(),
            message: "document has no body element".to_string(),
        })
}

/// Body paragraphs first, then every cell paragraph of every table.
fn visit_body<E>(body: &mut ElementNode, visit: &mut Visitor<'_, E>) -> Result<(), E> {
    visit_paragraphs(body, visit)?;
    for table in body.children_named_mut("tbl") {
        for row in table.children_named_mut("tr") {
            for cell in row.children_named_mut("tc") {
                visit_paragraphs(cell, visit)?;
            }
        }
    }
    Ok(())
}

fn visit_paragraphs<E>(container: &mut ElementNode, visit: &mut Visitor<'_, E>) -> Result<(), E> {
    for p in container.children_named_mut("p") {
        visit(p)?;
    }
    Ok(())
}

/// Header and footer parts referenced by the document's sections, each once,
/// in section order.
fn section_parts(doc: &XmlDocument, rels: &[Relationship], scope: HeaderScope) -> Vec<String> {
    let Some(body) = doc.root().and_then(|root| root.child("body")) else {
        return Vec::new();
    };

    let mut sections: Vec<&ElementNode> = body
        .children_named("p")
        .filter_map(|p| p.child("pPr"))
        .filter_map(|ppr| ppr.child("sectPr"))
        .collect();
    sections.extend(body.child("sectPr"));

    let mut parts: Vec<String> = Vec::new();
    for sect in sections {
        let references = sect
            .elements()
            .filter(|e| matches!(e.local_name(), "headerReference" | "footerReference"));
        for reference in references {
            let kind = reference.attr("type").unwrap_or("default");
            if scope == HeaderScope::Default && kind != "default" {
                continue;
            }
            let Some(id) = reference.attr("id") else {
                continue;
            };
            let Some(rel) = rels.iter().find(|r| r.id == id && !r.external) else {
                log::warn!("Section references unknown relationship '{id}'");
                continue;
            };
            if !parts.contains(&rel.target) {
                parts.push(rel.target.clone());
            }
        }
    }
    parts
}

// ---------------------------------------------------------------------------
// Paragraph text and run rebuilding
// ---------------------------------------------------------------------------

/// Visible text of a paragraph, including runs inside hyperlinks.
pub fn paragraph_text(p: &ElementNode) -> String {
    let mut text = String::new();
    for child in p.elements() {
        match child.local_name() {
            "r" => push_run_text(child, &mut text),
            "hyperlink" => {
                for run in child.children_named("r") {
                    push_run_text(run, &mut text);
                }
            }
            _ => {}
        }
    }
    text
}

fn push_run_text(run: &ElementNode, out: &mut String) {
    for item in run.elements() {
        match item.local_name() {
            "t" => out.push_str(&item.text()),
            "tab" | "ptab" => out.push('\t'),
            "cr" => out.push('\n'),
            "br" => {
                if matches!(item.attr("type"), None | Some("textWrapping")) {
                    out.push('\n');
                }
            }
            "noBreakHyphen" => out.push('-'),
            _ => {}
        }
    }
}

/// Substitute one paragraph. Returns whether any placeholder was replaced.
///
/// A changed paragraph keeps its properties and has every other child
/// replaced by the new runs. An unchanged one keeps all of its children;
/// under [`UntouchedParagraphs::Normalize`] its runs are restyled in place.
fn rewrite_paragraph(p: &mut ElementNode, vars: &VariableMap, config: &PipelineConfig) -> Result<bool, AssembleError> {
    let text = paragraph_text(p);
    if text.is_empty() {
        return Ok(false);
    }

    let sub = substitute(&text, vars, &config.style, config.highlight);
    if !sub.changed {
        if config.untouched == UntouchedParagraphs::Normalize {
            let rpr = run_properties(p, &config.style.plain());
            restyle_runs(p, &rpr);
        }
        return Ok(false);
    }

    let para: &ElementNode = p;
    let runs = sub
        .runs
        .iter()
        .map(|run| build_run(para, run))
        .collect::<Result<Vec<_>, _>>()?;

    p.children
        .retain(|c| matches!(c, XmlNode::Element(e) if e.local_name() == "pPr"));
    p.children.extend(runs.into_iter().map(XmlNode::Element));
    Ok(sub.changed)
}

fn build_run(p: &ElementNode, run: &TextRun) -> Result<ElementNode, AssembleError> {
    if let Some(c) = run.text.chars().find(|&c| !is_xml_char(c)) {
        return Err(AssembleError::InvalidCharacter(c as u32));
    }

    let rpr = run_properties(p, &run.style);
    let mut r = ElementNode::new(p.qualify("r")).with_child(XmlNode::Element(rpr));
    let mut pending = String::new();
    for c in run.text.chars() {
        match c {
            '\t' => {
                flush_text(p, &mut r, &mut pending);
                r.children.push(XmlNode::Element(ElementNode::new(p.qualify("tab"))));
            }
            '\n' | '\r' => {
                flush_text(p, &mut r, &mut pending);
                r.children.push(XmlNode::Element(ElementNode::new(p.qualify("br"))));
            }
            c => pending.push(c),
        }
    }
    flush_text(p, &mut r, &mut pending);
    Ok(r)
}

/// `w:rPr` for `style`, in the paragraph's namespace prefix.
fn run_properties(p: &ElementNode, style: &RunStyle) -> ElementNode {
    let mut rpr = ElementNode::new(p.qualify("rPr"));
    for (name, attrs) in style.properties() {
        let mut prop = ElementNode::new(p.qualify(name));
        for (key, value) in attrs {
            prop = prop.with_attr(p.qualify(key), value);
        }
        rpr.children.push(XmlNode::Element(prop));
    }
    rpr
}

/// Replace the run properties of every run under `node`, including runs nested
/// in hyperlinks and fields. Run content and paragraph properties are not
/// entered.
fn restyle_runs(node: &mut ElementNode, rpr: &ElementNode) {
    for child in node.elements_mut() {
        if child.local_name() == "r" {
            child
                .children
                .retain(|c| !matches!(c, XmlNode::Element(e) if e.local_name() == "rPr"));
            child.children.insert(0, XmlNode::Element(rpr.clone()));
        } else if child.local_name() != "pPr" {
            restyle_runs(child, rpr);
        }
    }
}

fn flush_text(p: &ElementNode, r: &mut ElementNode, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let t = ElementNode::new(p.qualify("t"))
        .with_attr("xml:space", "preserve")
        .with_child(XmlNode::Text(std::mem::take(pending)));
    r.children.push(XmlNode::Element(t));
}

/// Characters allowed in XML 1.0 character data.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}
