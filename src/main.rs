//! contratos – command-line bulk contract generator.
//!
//! Usage:
//!   contratos <template.docx> <rows.json> [output.zip] [--config cfg.json]
//!   contratos --sample <dir>
//!
//! If `output.zip` is omitted the archive is written to the current directory
//! as `contratos_generados_YYYYMMDD_HHMMSS.zip`.

use std::path::{Path, PathBuf};
use std::{env, fs, process};

use contract_forge::pipeline::{generate_contracts_with_progress, PipelineConfig};
use contract_forge::templates::{contract_template, sample_rows_json};
use contract_forge::Table;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut template_path: Option<PathBuf> = None;
    let mut rows_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1).peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => match iter.next() {
                Some(v) => config_path = Some(PathBuf::from(v)),
                None => {
                    eprintln!("Error: --config needs a path.");
                    process::exit(1);
                }
            },
            "--sample" => {
                let dir = iter.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
                write_sample(&dir);
                process::exit(0);
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                match positional {
                    0 => template_path = Some(PathBuf::from(path)),
                    1 => rows_path = Some(PathBuf::from(path)),
                    2 => output_path = Some(PathBuf::from(path)),
                    _ => {
                        eprintln!("Unexpected argument: {path}");
                        print_usage(&args[0]);
                        process::exit(1);
                    }
                }
                positional += 1;
            }
        }
    }

    let (template_path, rows_path) = match (template_path, rows_path) {
        (Some(t), Some(r)) => (t, r),
        _ => {
            eprintln!("Error: a template and a rows file are required.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    let config = match config_path {
        Some(path) => {
            let json = read_text(&path);
            match PipelineConfig::from_json(&json) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error in '{}': {e}", path.display());
                    process::exit(1);
                }
            }
        }
        None => PipelineConfig::default(),
    };

    let template = match fs::read(&template_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading '{}': {e}", template_path.display());
            process::exit(1);
        }
    };

    let table = match Table::from_json(&read_text(&rows_path)) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error in '{}': {e}", rows_path.display());
            process::exit(1);
        }
    };

    let generation = generate_contracts_with_progress(&template, &table, &config, |p| {
        eprintln!("[{}/{}] {}", p.attempted, p.total, p.label);
    });

    let generation = match generation {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    println!("{}", generation.result.summary());

    let Some(archive) = generation.archive else {
        eprintln!("No contracts were generated; no archive written.");
        return;
    };

    let output = output_path.unwrap_or_else(|| PathBuf::from(&generation.archive_name));
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error creating output directory: {e}");
                process::exit(1);
            }
        }
    }
    if let Err(e) = fs::write(&output, &archive) {
        eprintln!("Error writing '{}': {e}", output.display());
        process::exit(1);
    }
    eprintln!("Wrote '{}' ({} bytes)", output.display(), archive.len());
}

fn read_text(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {e}", path.display());
            process::exit(1);
        }
    }
}

fn write_sample(dir: &Path) {
    let template = match contract_template().build() {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error building sample template: {e}");
            process::exit(1);
        }
    };
    let files = [
        (dir.join("plantilla.docx"), template),
        (dir.join("datos.json"), sample_rows_json().as_bytes().to_vec()),
    ];
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("Error creating '{}': {e}", dir.display());
        process::exit(1);
    }
    for (path, bytes) in files {
        if let Err(e) = fs::write(&path, bytes) {
            eprintln!("Error writing '{}': {e}", path.display());
            process::exit(1);
        }
        eprintln!("Wrote '{}'", path.display());
    }
}

fn print_usage(prog: &str) {
    eprintln!("contratos – bulk contract generator (contract-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <template.docx> <rows.json> [output.zip] [--config cfg.json]");
    eprintln!("  {prog} --sample [dir]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <template.docx> Word template containing [(PLACEHOLDER)] tokens");
    eprintln!("  <rows.json>     JSON array of objects, one per contract");
    eprintln!("  [output.zip]    Archive path (default: contratos_generados_<timestamp>.zip)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --config, -c    JSON pipeline configuration (fonts, highlighting, headers)");
    eprintln!("  --sample        Write plantilla.docx and datos.json examples to [dir]");
    eprintln!("  --help          Print this message");
}
