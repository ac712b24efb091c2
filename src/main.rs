//! sheetbind CLI - inspect, convert and validate tabular files
//!
//! ```bash
//! sheetbind convert data.xlsx data.csv     # Convert between formats
//! sheetbind validate data.csv --spec fields.json
//! sheetbind sheets report.xlsx             # List workbook sheets
//! sheetbind head data.csv -n 5             # Preview the first rows
//! ```

use clap::{Parser, Subcommand};
use sheetbind::{
    format::{open_sink, SheetHeader},
    read_rows, resolve_fields, sheet_names,
    validate::validate_untyped,
    Config, FieldSpec, ReadOptions, SheetSelector, WriteOptions,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetbind")]
#[command(about = "Convert and validate spreadsheet and delimited files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a file to another format, detected by extension
    Convert {
        /// Input file (csv, tsv, txt, xlsx, xlsm, xls)
        input: PathBuf,

        /// Output file (csv, tsv, txt, xlsx)
        output: PathBuf,

        /// Input delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Sheet to read: name or 0-based index
        #[arg(short, long)]
        sheet: Option<String>,

        /// Sheet name for workbook output
        #[arg(long)]
        sheet_name: Option<String>,

        /// Freeze the header row in workbook output
        #[arg(long)]
        freeze_header: bool,

        /// Auto-size columns in workbook output
        #[arg(long)]
        auto_size: bool,
    },

    /// Validate a file against a field-spec JSON file
    Validate {
        /// Input file
        input: PathBuf,

        /// Field specs: a JSON array of column declarations
        #[arg(long)]
        spec: PathBuf,

        /// Input delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Sheet to read: name or 0-based index
        #[arg(short, long)]
        sheet: Option<String>,

        /// Write the full JSON report here (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Input file
        input: PathBuf,
    },

    /// Print the first rows of a file as JSON
    Head {
        /// Input file
        input: PathBuf,

        /// Number of rows to show
        #[arg(short = 'n', long, default_value = "10")]
        rows: usize,

        /// Input delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Sheet to read: name or 0-based index
        #[arg(short, long)]
        sheet: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            delimiter,
            sheet,
            sheet_name,
            freeze_header,
            auto_size,
        } => cmd_convert(
            &input,
            &output,
            delimiter,
            sheet.as_deref(),
            sheet_name,
            freeze_header,
            auto_size,
        ),

        Commands::Validate {
            input,
            spec,
            delimiter,
            sheet,
            output,
        } => cmd_validate(&input, &spec, delimiter, sheet.as_deref(), output.as_deref()),

        Commands::Sheets { input } => cmd_sheets(&input),

        Commands::Head {
            input,
            rows,
            delimiter,
            sheet,
        } => cmd_head(&input, rows, delimiter, sheet.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn read_options(
    delimiter: Option<char>,
    sheet: Option<&str>,
) -> Result<ReadOptions, Box<dyn std::error::Error>> {
    Ok(ReadOptions {
        delimiter: delimiter.map(delimiter_byte).transpose()?,
        sheet: sheet.map(parse_sheet),
        config: None,
    })
}

fn delimiter_byte(c: char) -> Result<u8, Box<dyn std::error::Error>> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(format!("delimiter must be an ASCII character, got '{}'", c).into())
    }
}

/// A numeric argument selects by 0-based index, anything else by name.
fn parse_sheet(s: &str) -> SheetSelector {
    match s.parse::<usize>() {
        Ok(index) => SheetSelector::Index(index),
        Err(_) => SheetSelector::Name(s.to_string()),
    }
}

fn cmd_convert(
    input: &Path,
    output: &Path,
    delimiter: Option<char>,
    sheet: Option<&str>,
    sheet_name: Option<String>,
    freeze_header: bool,
    auto_size: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Converting: {} → {}", input.display(), output.display());

    let options = read_options(delimiter, sheet)?;
    let (headers, rows) = read_rows(input, &options)?;
    eprintln!("   Columns: {}", headers.join(", "));
    eprintln!("   Rows: {}", rows.len());

    let write_options = WriteOptions {
        sheet_name: sheet_name.clone(),
        freeze_header,
        auto_size,
        ..WriteOptions::default()
    };
    let width = headers.len();
    let mut sink = open_sink(output, &write_options)?;
    sink.write_header(&SheetHeader {
        sheet_name: sheet_name.unwrap_or_else(|| "Sheet1".to_string()),
        names: headers,
        widths: vec![None; width],
        auto_size,
        freeze_header,
    })?;
    for row in &rows {
        sink.write_row(row)?;
    }
    sink.finish()?;

    eprintln!("✅ Wrote {} rows to {}", rows.len(), output.display());
    Ok(())
}

fn cmd_validate(
    input: &Path,
    spec: &Path,
    delimiter: Option<char>,
    sheet: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let fields: Vec<FieldSpec> = serde_json::from_str(&fs::read_to_string(spec)?)?;
    eprintln!("   Fields: {}", fields.len());
    let type_name = spec
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("spec")
        .to_string();
    let resolved = resolve_fields(type_name, fields)?;

    let options = read_options(delimiter, sheet)?;
    let config = Config::current();
    let mut source = sheetbind::format::open_source(input, &options)?;
    let report = validate_untyped(source.as_mut(), &resolved, &config)?;

    eprintln!("📊 {}", report.summary());
    for err in report.errors.iter().take(10) {
        eprintln!("   - {}", err);
    }
    if report.errors.len() > 10 {
        eprintln!("   ... and {} more", report.errors.len() - 10);
    }

    let json = serde_json::to_string_pretty(&serde_json::json!({
        "stats": report.stats(),
        "errors": report.errors,
    }))?;
    write_output(&json, output)?;

    if report.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_sheets(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let names = sheet_names(input)?;
    for (i, name) in names.iter().enumerate() {
        let options = ReadOptions {
            sheet: Some(SheetSelector::Index(i)),
            ..ReadOptions::default()
        };
        let (_, rows) = read_rows(input, &options)?;
        println!("{}: {} ({} rows)", i, name, rows.len());
    }
    Ok(())
}

fn cmd_head(
    input: &Path,
    rows: usize,
    delimiter: Option<char>,
    sheet: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = read_options(delimiter, sheet)?;
    let (headers, data) = read_rows(input, &options)?;

    let preview: Vec<_> = data.iter().take(rows).collect();
    let json = serde_json::to_string_pretty(&serde_json::json!({
        "headers": headers,
        "rows": preview,
    }))?;
    println!("{}", json);

    if data.len() > rows {
        eprintln!("   ... {} of {} rows shown", rows, data.len());
    }
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Report written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
