//! Sample templates – builds small but complete `.docx` packages in memory.
//!
//! Used by the tests and by `contratos --sample` to give users a starting
//! point that exercises body paragraphs, tables, headers and footers.

use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

enum Block {
    Paragraph(Vec<String>),
    Table(Vec<Vec<String>>),
    SectionBreak,
}

/// Builder for a minimal WordprocessingML package.
#[derive(Default)]
pub struct TemplateBuilder {
    body: Vec<Block>,
    // Header and footer paragraphs, already serialised.
    header: Vec<String>,
    footer: Vec<String>,
    first_page_header: Vec<String>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A body paragraph with a single run.
    pub fn paragraph(self, text: &str) -> Self {
        self.split_paragraph(&[text])
    }

    /// A body paragraph whose text is spread over several runs.
    pub fn split_paragraph(mut self, runs: &[&str]) -> Self {
        self.body
            .push(Block::Paragraph(runs.iter().map(|r| r.to_string()).collect()));
        self
    }

    /// A table; each cell holds one single-run paragraph.
    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|cells| cells.iter().map(|c| c.to_string()).collect())
            .collect();
        self.body.push(Block::Table(rows));
        self
    }

    /// Ends a section; the new section shares the default header and footer.
    pub fn section_break(mut self) -> Self {
        self.body.push(Block::SectionBreak);
        self
    }

    pub fn header(mut self, text: &str) -> Self {
        self.header.push(paragraph_xml(&[text.to_string()]));
        self
    }

    pub fn footer(mut self, text: &str) -> Self {
        self.footer.push(paragraph_xml(&[text.to_string()]));
        self
    }

    /// A footer paragraph: `label` followed by a `PAGE` field.
    pub fn page_number_footer(mut self, label: &str) -> Self {
        self.footer.push(format!(
            r#"<w:p>{}<w:fldSimple w:instr=" PAGE "><w:r><w:t>1</w:t></w:r></w:fldSimple></w:p>"#,
            run_xml(label)
        ));
        self
    }

    pub fn first_page_header(mut self, text: &str) -> Self {
        self.first_page_header.push(paragraph_xml(&[text.to_string()]));
        self
    }

    /// Document XML alone, handy for inspecting expected markup.
    pub fn document_xml(&self) -> String {
        let mut body = String::new();
        for block in &self.body {
            match block {
                Block::Paragraph(runs) => body.push_str(&paragraph_xml(runs)),
                Block::Table(rows) => {
                    body.push_str(r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr>"#);
                    for row in rows {
                        body.push_str("<w:tr>");
                        for cell in row {
                            body.push_str("<w:tc>");
                            body.push_str(&paragraph_xml(std::slice::from_ref(cell)));
                            body.push_str("</w:tc>");
                        }
                        body.push_str("</w:tr>");
                    }
                    body.push_str("</w:tbl>");
                }
                Block::SectionBreak => {
                    body.push_str(&format!("<w:p><w:pPr>{}</w:pPr></w:p>", self.sect_pr()));
                }
            }
        }
        format!(
            r#"{XML_DECL}
<w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body>{body}{}</w:body></w:document>"#,
            self.sect_pr()
        )
    }

    fn sect_pr(&self) -> String {
        let mut refs = String::new();
        if !self.header.is_empty() {
            refs.push_str(r#"<w:headerReference w:type="default" r:id="rIdHeader"/>"#);
        }
        if !self.first_page_header.is_empty() {
            refs.push_str(r#"<w:headerReference w:type="first" r:id="rIdFirstHeader"/>"#);
        }
        if !self.footer.is_empty() {
            refs.push_str(r#"<w:footerReference w:type="default" r:id="rIdFooter"/>"#);
        }
        let title_pg = if self.first_page_header.is_empty() {
            ""
        } else {
            "<w:titlePg/>"
        };
        format!(r#"<w:sectPr>{refs}<w:pgSz w:w="11906" w:h="16838"/>{title_pg}</w:sectPr>"#)
    }

    /// Zip the package.
    pub fn build(&self) -> ZipResult<Vec<u8>> {
        let mut parts: Vec<(&str, String)> = vec![
            ("[Content_Types].xml", self.content_types()),
            ("_rels/.rels", package_rels()),
            ("word/document.xml", self.document_xml()),
            ("word/_rels/document.xml.rels", self.document_rels()),
        ];
        if !self.header.is_empty() {
            parts.push(("word/header1.xml", story_xml("hdr", &self.header)));
        }
        if !self.first_page_header.is_empty() {
            parts.push(("word/header2.xml", story_xml("hdr", &self.first_page_header)));
        }
        if !self.footer.is_empty() {
            parts.push(("word/footer1.xml", story_xml("ftr", &self.footer)));
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());
        for (name, xml) in parts {
            writer.start_file(name, options)?;
            writer.write_all(xml.as_bytes())?;
        }
        Ok(writer.finish()?.into_inner())
    }

    fn content_types(&self) -> String {
        let mut overrides = String::from(
            r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        );
        let header_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
        if !self.header.is_empty() {
            overrides.push_str(&format!(
                r#"<Override PartName="/word/header1.xml" ContentType="{header_type}"/>"#
            ));
        }
        if !self.first_page_header.is_empty() {
            overrides.push_str(&format!(
                r#"<Override PartName="/word/header2.xml" ContentType="{header_type}"/>"#
            ));
        }
        if !self.footer.is_empty() {
            overrides.push_str(r#"<Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/>"#);
        }
        format!(
            r#"{XML_DECL}
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{overrides}</Types>"#
        )
    }

    fn document_rels(&self) -> String {
        let mut rels = String::new();
        if !self.header.is_empty() {
            rels.push_str(&relationship("rIdHeader", "header", "header1.xml"));
        }
        if !self.first_page_header.is_empty() {
            rels.push_str(&relationship("rIdFirstHeader", "header", "header2.xml"));
        }
        if !self.footer.is_empty() {
            rels.push_str(&relationship("rIdFooter", "footer", "footer1.xml"));
        }
        format!(r#"{XML_DECL}
<Relationships xmlns="{REL_NS}">{rels}</Relationships>"#)
    }
}

fn package_rels() -> String {
    format!(
        r#"{XML_DECL}
<Relationships xmlns="{REL_NS}">{}</Relationships>"#,
        relationship("rId1", "officeDocument", "word/document.xml")
    )
}

fn relationship(id: &str, kind: &str, target: &str) -> String {
    format!(r#"<Relationship Id="{id}" Type="{R_NS}/{kind}" Target="{target}"/>"#)
}

fn paragraph_xml(runs: &[String]) -> String {
    let runs: String = runs.iter().map(|r| run_xml(r)).collect();
    format!("<w:p>{runs}</w:p>")
}

fn run_xml(text: &str) -> String {
    format!(
        r#"<w:r><w:rPr><w:rFonts w:ascii="Times New Roman" w:hAnsi="Times New Roman"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape(text)
    )
}

fn story_xml(root: &str, paragraphs: &[String]) -> String {
    let body = paragraphs.concat();
    format!(r#"{XML_DECL}
<w:{root} xmlns:w="{W_NS}" xmlns:r="{R_NS}">{body}</w:{root}>"#)
}

/// A contract template using all eight placeholders across every region.
pub fn contract_template() -> TemplateBuilder {
    TemplateBuilder::new()
        .header("Contrato N° [(CONTRATO NÚMERO)]")
        .paragraph("CONTRATO DE PRESTACIÓN DE SERVICIOS")
        .paragraph("Entre la entidad contratante y [(NOMBRE)], identificado con cédula [(CÉDULA)], se celebra el presente contrato.")
        .table(&[
            &["Correo electrónico", "[(CORREO ELECTRÓNICO)]"],
            &["Fecha de inicio", "[(FECHA DE INICIO)]"],
            &["Fecha de finalización", "[(FECHA FINALIZACIÓN)]"],
            &["Plazo", "[(PLAZO EN DÍAS)] días"],
            &["Valor total sin IVA", "[(VALOR TOTAL DEL CONTRATO SIN IVA)]"],
        ])
        .paragraph("Firma: ______________________")
        .footer("[(NOMBRE)] - [(CÉDULA)]")
}

/// Two example rows matching [`contract_template`], as the JSON row source
/// the CLI reads.
pub fn sample_rows_json() -> &'static str {
    r#"[
  {
    "CONTRATO NÚMERO": "CPS-001-2025",
    "CÉDULA": "1020304050",
    "CORREO ELECTRÓNICO": "ana.ruiz@example.com",
    "NOMBRE": "Ana Ruiz",
    "FECHA DE INICIO": "2025-02-01",
    "FECHA FINALIZACIÓN": "2025-07-31",
    "PLAZO EN DÍAS": 180,
    "VALOR TOTAL DEL CONTRATO SIN IVA": "$ 24.000.000"
  },
  {
    "CONTRATO NÚMERO": "CPS-002-2025",
    "CÉDULA": "79888777",
    "CORREO ELECTRÓNICO": "luis.gomez@example.com",
    "NOMBRE": "Luis Gómez",
    "FECHA DE INICIO": "2025-02-15",
    "FECHA FINALIZACIÓN": "2025-06-15",
    "PLAZO EN DÍAS": 120,
    "VALOR TOTAL DEL CONTRATO SIN IVA": null
  }
]"#
}
