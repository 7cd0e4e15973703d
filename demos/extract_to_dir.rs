//! Extract To Directory Example
//!
//! This example extracts the product images of a catalog workbook and
//! stores them in a local directory, one `<REF>.jpg` per row.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example extract_to_dir -- catalog.xlsx out/ [options]
//! ```

use std::process;
use xlsxpic::{deliver, DirectorySink, ExtractorBuilder, MatchMode, SheetSelector, XlsxPicError};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <input.xlsx> <output-dir> [options]", args[0]);
        eprintln!("\nOptions:");
        eprintln!("  --sheet-index <n>      Select sheet by index (0-based)");
        eprintln!("  --sheet-name <name>    Select sheet by name");
        eprintln!("  --columns <H,I>        Image columns (default: H)");
        eprintln!("  --ref-column <A>       Reference column (default: detected)");
        eprintln!("  --start-row <n>        First data row, 1-based (default: detected)");
        eprintln!("  --loose                Accept images next to the reference column");
        process::exit(1);
    }

    let input_path = &args[1];
    let output_dir = &args[2];

    let mut builder = ExtractorBuilder::new();
    let mut i = 3;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--sheet-index", Some(v)) => {
                let index = v.parse::<usize>().unwrap_or_else(|_| {
                    eprintln!("Error: Invalid sheet index: {}", v);
                    process::exit(1);
                });
                builder = builder.with_sheet(SheetSelector::Index(index));
                i += 2;
            }
            ("--sheet-name", Some(v)) => {
                builder = builder.with_sheet(SheetSelector::Name(v.clone()));
                i += 2;
            }
            ("--columns", Some(v)) => {
                builder = builder.with_target_columns(v.split(','));
                i += 2;
            }
            ("--ref-column", Some(v)) => {
                builder = builder.with_reference_column(v);
                i += 2;
            }
            ("--start-row", Some(v)) => {
                let row = v.parse::<u32>().unwrap_or_else(|_| {
                    eprintln!("Error: Invalid start row: {}", v);
                    process::exit(1);
                });
                builder = builder.with_start_row(row);
                i += 2;
            }
            ("--loose", _) => {
                builder = builder.with_match_mode(MatchMode::Loose);
                i += 1;
            }
            (option, _) => {
                eprintln!("Error: Unknown option or missing value: {}", option);
                process::exit(1);
            }
        }
    }

    if let Err(e) = run(builder, input_path, output_dir) {
        handle_error(e);
        process::exit(1);
    }
}

fn run(builder: ExtractorBuilder, input_path: &str, output_dir: &str) -> Result<(), XlsxPicError> {
    let extractor = builder.build()?;
    let report = extractor.extract_path(input_path)?;

    let mut sink = DirectorySink::new(output_dir);
    let stats = deliver(&report, &mut sink);

    println!("{}", report.to_json()?);
    println!(
        "Stored {} image(s) in {} ({} bytes), {} failed",
        stats.successful,
        sink.root().display(),
        stats.bytes_sent,
        stats.failed
    );
    for error in &stats.errors {
        eprintln!("  {}", error);
    }

    Ok(())
}

fn handle_error(error: XlsxPicError) {
    match error {
        XlsxPicError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        XlsxPicError::NotAPackage(msg) => {
            eprintln!("Not an Excel workbook: {}", msg);
            eprintln!("Only .xlsx files (OOXML packages) are supported.");
        }
        XlsxPicError::Parse(parse_err) => {
            eprintln!("Parse Error: {}", parse_err);
            eprintln!("The worksheet could not be read; the file may be corrupted.");
        }
        XlsxPicError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
            eprintln!("Please check your sheet selection and column letters.");
        }
        XlsxPicError::SecurityViolation(msg) => {
            eprintln!("Security Violation: {}", msg);
            eprintln!("The file violates security constraints (e.g., size limits).");
        }
        other => eprintln!("Error: {}", other),
    }
}
