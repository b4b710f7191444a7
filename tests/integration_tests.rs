//! Integration tests for the contract-forge pipeline.
//!
//! These tests validate:
//! - Placeholders are replaced everywhere (body, tables, headers, footers)
//! - Substituted values carry the highlight style
//! - Row failures are isolated and reported
//! - Archives contain one entry per generated document
//! - Output is deterministic for identical input

use std::io::{Cursor, Read};

use sha2::{Digest, Sha256};
use zip::ZipArchive;

use contract_forge::archive::pack;
use contract_forge::assemble::{assemble, paragraph_text, HeaderScope, UntouchedParagraphs};
use contract_forge::batch::{self, DuplicateNames};
use contract_forge::dom::{parse_xml, ElementNode};
use contract_forge::error::ArchiveError;
use contract_forge::pipeline::{generate_contracts, generate_contracts_with_progress, PipelineConfig};
use contract_forge::templates::{contract_template, sample_rows_json, TemplateBuilder};
use contract_forge::variables::{bind, Field};
use contract_forge::{Error, Row, Table};

// =====================================================================
// Helpers
// =====================================================================

fn default_config() -> PipelineConfig {
    PipelineConfig::default()
}

fn full_row(name: &str, id: &str, number: &str) -> Row {
    Row::new()
        .with("CONTRATO NÚMERO", Some(number))
        .with("CÉDULA", Some(id))
        .with("CORREO ELECTRÓNICO", Some("persona@example.com"))
        .with("NOMBRE", Some(name))
        .with("FECHA DE INICIO", Some("2025-01-01"))
        .with("FECHA FINALIZACIÓN", Some("2025-12-31"))
        .with("PLAZO EN DÍAS", Some("365"))
        .with("VALOR TOTAL DEL CONTRATO SIN IVA", Some("1000000"))
}

fn read_entry(docx: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut zip = ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut entry = zip.by_name(name).ok()?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    Some(bytes)
}

fn collect_paragraphs<'a>(node: &'a ElementNode, out: &mut Vec<&'a ElementNode>) {
    for child in node.elements() {
        if child.local_name() == "p" {
            out.push(child);
        } else {
            collect_paragraphs(child, out);
        }
    }
}

/// Visible text of every paragraph in one part, in document order.
fn part_texts(docx: &[u8], part: &str) -> Vec<String> {
    let xml = read_entry(docx, part).unwrap_or_else(|| panic!("missing part {part}"));
    let doc = parse_xml(&xml).unwrap();
    let mut paragraphs = Vec::new();
    collect_paragraphs(doc.root().unwrap(), &mut paragraphs);
    paragraphs.into_iter().map(paragraph_text).collect()
}

/// `(text, highlighted)` for each run of the first paragraph containing `needle`.
fn runs_of(docx: &[u8], part: &str, needle: &str) -> Vec<(String, bool)> {
    let xml = read_entry(docx, part).unwrap();
    let doc = parse_xml(&xml).unwrap();
    let mut paragraphs = Vec::new();
    collect_paragraphs(doc.root().unwrap(), &mut paragraphs);
    let p = paragraphs
        .into_iter()
        .find(|p| paragraph_text(p).contains(needle))
        .unwrap_or_else(|| panic!("no paragraph contains {needle:?}"));
    p.children_named("r")
        .map(|r| {
            let text: String = r.children_named("t").map(|t| t.text()).collect();
            let highlighted = r.child("rPr").and_then(|rpr| rpr.child("color")).is_some();
            (text, highlighted)
        })
        .collect()
}

fn all_texts(docx: &[u8]) -> String {
    let mut text = part_texts(docx, "word/document.xml").join("\n");
    for part in ["word/header1.xml", "word/header2.xml", "word/footer1.xml"] {
        if read_entry(docx, part).is_some() {
            text.push('\n');
            text.push_str(&part_texts(docx, part).join("\n"));
        }
    }
    text
}

fn sha256(bytes: &[u8]) -> Vec<u8> {
    Sha256::digest(bytes).to_vec()
}

// =====================================================================
// Substitution tests
// =====================================================================

#[test]
fn no_tokens_remain_for_a_complete_row() {
    let template = contract_template().build().unwrap();
    let vars = bind(&full_row("Ana Ruiz", "123", "C-1"));
    let docx = assemble(&template, &vars, &default_config()).unwrap();

    let text = all_texts(&docx);
    for field in Field::ALL {
        assert!(!text.contains(field.token()), "{} left in output", field.token());
    }
    assert!(text.contains("Ana Ruiz"));
    assert!(text.contains("persona@example.com"));
}

#[test]
fn contract_number_is_highlighted_and_name_is_plain() {
    let template = TemplateBuilder::new()
        .paragraph("Contrato [(CONTRATO NÚMERO)] para [(NOMBRE)]")
        .build()
        .unwrap();
    let vars = bind(&full_row("Ana Ruiz", "123", "C-1"));
    let docx = assemble(&template, &vars, &default_config()).unwrap();

    let runs = runs_of(&docx, "word/document.xml", "Contrato C-1");
    assert_eq!(
        runs,
        vec![
            ("Contrato ".to_string(), false),
            ("C-1".to_string(), true),
            (" para Ana Ruiz".to_string(), false),
        ]
    );
    assert_eq!(batch::output_filename(&vars), "Contrato_Ana Ruiz_123_C-1.docx");
}

#[test]
fn null_value_leaves_surrounding_text() {
    let template = TemplateBuilder::new()
        .paragraph("Plazo: [(PLAZO EN DÍAS)] días")
        .build()
        .unwrap();
    let vars = bind(&full_row("Ana", "1", "C-1").with("PLAZO EN DÍAS", None));
    let docx = assemble(&template, &vars, &default_config()).unwrap();

    assert_eq!(part_texts(&docx, "word/document.xml"), vec!["Plazo:  días"]);
}

#[test]
fn token_split_across_runs_is_replaced() {
    let template = TemplateBuilder::new()
        .split_paragraph(&["Señor(a) [(NOM", "BRE)], bienvenido"])
        .build()
        .unwrap();
    let vars = bind(&full_row("Luis", "2", "C-2"));
    let docx = assemble(&template, &vars, &default_config()).unwrap();

    assert_eq!(
        part_texts(&docx, "word/document.xml"),
        vec!["Señor(a) Luis, bienvenido"]
    );
}

#[test]
fn table_cells_are_substituted() {
    let template = TemplateBuilder::new()
        .table(&[&["Nombre", "[(NOMBRE)]"], &["Correo", "[(CORREO ELECTRÓNICO)]"]])
        .build()
        .unwrap();
    let vars = bind(&full_row("Eva", "3", "C-3"));
    let docx = assemble(&template, &vars, &default_config()).unwrap();

    assert_eq!(
        part_texts(&docx, "word/document.xml"),
        vec!["Nombre", "Eva", "Correo", "persona@example.com"]
    );
}

#[test]
fn headers_and_footers_are_substituted() {
    let template = contract_template().build().unwrap();
    let vars = bind(&full_row("Eva", "77", "C-9"));
    let docx = assemble(&template, &vars, &default_config()).unwrap();

    assert_eq!(part_texts(&docx, "word/header1.xml"), vec!["Contrato N° C-9"]);
    assert_eq!(part_texts(&docx, "word/footer1.xml"), vec!["Eva - 77"]);
}

#[test]
fn first_page_header_needs_all_scope() {
    let template = contract_template()
        .first_page_header("Primera página de [(NOMBRE)]")
        .build()
        .unwrap();
    let vars = bind(&full_row("Eva", "77", "C-9"));

    let docx = assemble(&template, &vars, &default_config()).unwrap();
    assert_eq!(
        part_texts(&docx, "word/header2.xml"),
        vec!["Primera página de [(NOMBRE)]"]
    );

    let config = PipelineConfig {
        headers: HeaderScope::All,
        ..default_config()
    };
    let docx = assemble(&template, &vars, &config).unwrap();
    assert_eq!(part_texts(&docx, "word/header2.xml"), vec!["Primera página de Eva"]);
}

#[test]
fn every_section_shares_processed_headers() {
    let template = TemplateBuilder::new()
        .paragraph("Primera sección [(NOMBRE)]")
        .section_break()
        .paragraph("Segunda sección [(NOMBRE)]")
        .header("Encabezado [(CÉDULA)]")
        .build()
        .unwrap();
    let vars = bind(&full_row("Eva", "77", "C-9"));
    let docx = assemble(&template, &vars, &default_config()).unwrap();

    assert_eq!(part_texts(&docx, "word/header1.xml"), vec!["Encabezado 77"]);
    let body = part_texts(&docx, "word/document.xml");
    assert!(body.contains(&"Primera sección Eva".to_string()));
    assert!(body.contains(&"Segunda sección Eva".to_string()));
}

#[test]
fn preserve_mode_keeps_template_formatting() {
    let template = TemplateBuilder::new()
        .paragraph("Cláusula fija")
        .paragraph("[(NOMBRE)]")
        .build()
        .unwrap();
    let vars = bind(&full_row("Eva", "1", "C-1"));
    let config = PipelineConfig {
        untouched: UntouchedParagraphs::Preserve,
        ..default_config()
    };
    let docx = assemble(&template, &vars, &config).unwrap();
    let xml = String::from_utf8(read_entry(&docx, "word/document.xml").unwrap()).unwrap();

    // The fixed clause keeps its Times New Roman run; the substituted one is Arial.
    assert!(xml.contains("Times New Roman"));
    assert!(xml.contains("Arial"));
}

#[test]
fn untouched_parts_are_copied_verbatim() {
    let template = contract_template().build().unwrap();
    let vars = bind(&full_row("Eva", "1", "C-1"));
    let docx = assemble(&template, &vars, &default_config()).unwrap();

    for part in ["[Content_Types].xml", "_rels/.rels", "word/_rels/document.xml.rels"] {
        assert_eq!(read_entry(&docx, part), read_entry(&template, part), "{part} changed");
    }
}

#[test]
fn assembly_is_deterministic() {
    let template = contract_template().build().unwrap();
    let vars = bind(&full_row("Ana Ruiz", "123", "C-1"));
    let first = assemble(&template, &vars, &default_config()).unwrap();
    let second = assemble(&template, &vars, &default_config()).unwrap();
    assert_eq!(sha256(&first), sha256(&second));
}

#[test]
fn footer_page_field_survives_without_placeholders() {
    let template = TemplateBuilder::new()
        .paragraph("[(NOMBRE)]")
        .page_number_footer("Página ")
        .build()
        .unwrap();
    let vars = bind(&full_row("Eva", "1", "C-1"));
    let docx = assemble(&template, &vars, &default_config()).unwrap();

    let xml = read_entry(&docx, "word/footer1.xml").unwrap();
    let doc = parse_xml(&xml).unwrap();
    let p = doc.root().unwrap().child("p").unwrap();
    let field = p.child("fldSimple").expect("PAGE field kept");
    assert_eq!(field.attr("instr"), Some(" PAGE "));
    assert_eq!(paragraph_text(p), "Página ");

    // The label run is restyled to the plain font.
    let rpr = p.child("r").and_then(|r| r.child("rPr")).unwrap();
    assert_eq!(rpr.child("rFonts").and_then(|f| f.attr("ascii")), Some("Arial"));
}

// =====================================================================
// Batch tests
// =====================================================================

#[test]
fn missing_columns_abort_the_batch() {
    let template = contract_template().build().unwrap();
    let table = Table::from_rows(vec![Row::new()
        .with("NOMBRE", Some("Ana"))
        .with("CÉDULA", Some("1"))]);

    match generate_contracts(&template, &table, &default_config()) {
        Err(Error::ColumnValidation { missing }) => {
            assert_eq!(missing.len(), 6);
            assert_eq!(missing[0], "CONTRATO NÚMERO");
        }
        other => panic!("expected column validation error, got {other:?}"),
    }
}

#[test]
fn empty_row_source_generates_nothing() {
    let template = contract_template().build().unwrap();
    let table = Table::from_json("[]").unwrap();
    let generation = generate_contracts(&template, &table, &default_config()).unwrap();
    assert!(generation.result.documents.is_empty());
    assert!(generation.result.errors.is_empty());
    assert!(generation.archive.is_none());
}

#[test]
fn failing_row_is_isolated() {
    let template = contract_template().build().unwrap();
    let table = Table::from_rows(vec![
        full_row("Ana", "1", "C-1"),
        full_row("Bad\u{1}Name", "2", "C-2"),
        full_row("Luis", "3", "C-3"),
    ]);

    let result = batch::run(&table, &template, &default_config()).unwrap();
    assert_eq!(result.documents.len(), 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 2);
    assert_eq!(result.errors[0].label, "Bad\u{1}Name");
    assert_eq!(
        result.documents.iter().map(|d| d.row).collect::<Vec<_>>(),
        vec![1, 3]
    );
    assert!(result.summary().contains("1 row(s) failed:"));
}

#[test]
fn invalid_template_is_a_template_error() {
    let table = Table::from_rows(vec![full_row("Ana", "1", "C-1")]);
    let result = generate_contracts(b"definitely not a zip", &table, &default_config());
    assert!(matches!(result, Err(Error::Template(_))));
}

#[test]
fn template_without_document_part_is_rejected() {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("readme.txt", zip::write::SimpleFileOptions::default())
        .unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let table = Table::from_rows(vec![full_row("Ana", "1", "C-1")]);
    let result = generate_contracts(&bytes, &table, &default_config());
    assert!(matches!(result, Err(Error::Template(_))));
}

#[test]
fn filenames_are_sanitized() {
    let template = contract_template().build().unwrap();
    let table = Table::from_rows(vec![full_row("Ana", "12/345\\6", "C/1")]);
    let result = batch::run(&table, &template, &default_config()).unwrap();
    assert_eq!(result.documents[0].filename, "Contrato_Ana_12-345-6_C-1.docx");
}

#[test]
fn duplicate_filenames_are_suffixed() {
    let template = contract_template().build().unwrap();
    let table = Table::from_rows(vec![full_row("Ana", "1", "C-1"); 3]);
    let generation = generate_contracts(&template, &table, &default_config()).unwrap();

    let names: Vec<&str> = generation
        .result
        .documents
        .iter()
        .map(|d| d.filename.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Contrato_Ana_1_C-1.docx",
            "Contrato_Ana_1_C-1 (2).docx",
            "Contrato_Ana_1_C-1 (3).docx",
        ]
    );
    let zip = ZipArchive::new(Cursor::new(generation.archive.unwrap())).unwrap();
    assert_eq!(zip.len(), 3);
}

#[test]
fn keep_mode_duplicates_fail_packing() {
    let template = contract_template().build().unwrap();
    let table = Table::from_rows(vec![full_row("Ana", "1", "C-1"); 2]);
    let config = PipelineConfig {
        duplicates: DuplicateNames::Keep,
        ..default_config()
    };
    let result = generate_contracts(&template, &table, &config);
    assert!(matches!(
        result,
        Err(Error::Archive(ArchiveError::DuplicateName(ref n))) if n == "Contrato_Ana_1_C-1.docx"
    ));
}

#[test]
fn progress_is_reported_for_every_row() {
    let template = contract_template().build().unwrap();
    let table = Table::from_rows(vec![
        full_row("Ana", "1", "C-1"),
        full_row("Bad\u{1}", "2", "C-2"),
        full_row("Eva", "3", "C-3").with("NOMBRE", None),
    ]);

    let mut seen = Vec::new();
    generate_contracts_with_progress(&template, &table, &default_config(), |p| {
        seen.push((p.attempted, p.total, p.label.to_string()));
    })
    .unwrap();

    assert_eq!(
        seen,
        vec![
            (1, 3, "Ana".to_string()),
            (2, 3, "Bad\u{1}".to_string()),
            (3, 3, "N/A".to_string()),
        ]
    );
}

// =====================================================================
// Archive tests
// =====================================================================

#[test]
fn archive_holds_every_generated_document() {
    let template = contract_template().build().unwrap();
    let table = Table::from_json(sample_rows_json()).unwrap();
    let generation = generate_contracts(&template, &table, &default_config()).unwrap();
    let documents = &generation.result.documents;
    assert_eq!(documents.len(), 2);
    assert!(generation.archive_name.starts_with("contratos_generados_"));
    assert!(generation.archive_name.ends_with(".zip"));

    let mut zip = ZipArchive::new(Cursor::new(generation.archive.unwrap())).unwrap();
    assert_eq!(zip.len(), documents.len());
    for (i, doc) in documents.iter().enumerate() {
        let mut entry = zip.by_index(i).unwrap();
        assert_eq!(entry.name(), doc.filename);
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(sha256(&content), sha256(&doc.content));
    }
}

#[test]
fn no_archive_when_every_row_fails() {
    let template = contract_template().build().unwrap();
    let table = Table::from_rows(vec![full_row("\u{0}", "1", "C-1")]);
    let generation = generate_contracts(&template, &table, &default_config()).unwrap();
    assert!(generation.archive.is_none());
    assert_eq!(generation.result.errors.len(), 1);
    assert!(generation.result.summary().starts_with("0 contract(s) generated"));
}

#[test]
fn packing_is_deterministic() {
    let template = contract_template().build().unwrap();
    let table = Table::from_json(sample_rows_json()).unwrap();
    let result = batch::run(&table, &template, &default_config()).unwrap();
    let first = pack(&result.documents).unwrap();
    let second = pack(&result.documents).unwrap();
    assert_eq!(sha256(&first), sha256(&second));
}

#[test]
fn sample_rows_null_value_renders_empty() {
    let template = contract_template().build().unwrap();
    let table = Table::from_json(sample_rows_json()).unwrap();
    let result = batch::run(&table, &template, &default_config()).unwrap();

    let second = &result.documents[1];
    assert_eq!(second.summary, "Luis Gómez - 79888777");
    let body = part_texts(&second.content, "word/document.xml");
    assert!(body.contains(&"120 días".to_string()));
    assert!(!body.iter().any(|t| t.contains("[(VALOR")));
}
