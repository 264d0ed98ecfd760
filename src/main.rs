//! boq – command-line cost schedule → PDF exporter.
//!
//! Usage:
//!   boq <schedule.json> [output] [--markup] [--options opts.json] [--cover]
//!       [--no-description] [--no-quantities] [--no-rates] [--no-summary]
//!       [--type priced|unpriced|rates] [--schedule index|name]
//!       [--layout-json path] [--demo]
//!
//! If `output` is omitted the document is written next to the input file with
//! the same stem (e.g. `estimate.json` → `estimate.pdf`, or `estimate.typ`
//! with `--markup`).

use std::{
    env, fs,
    path::{Path, PathBuf},
    process,
};

use boq_forge::pipeline::{export_to_path, DocumentDriver, ExportOptions, PdfDriver, RenderedDocument};
use boq_forge::{samples, CostDocument, CostSchedule, DocumentType, ExportError, ScheduleChoice, TypstDriver};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut options_path: Option<PathBuf> = None;
    let mut layout_json: Option<PathBuf> = None;
    let mut doc_type: Option<DocumentType> = None;
    let mut schedule_choice: Option<ScheduleChoice> = None;
    let mut markup = false;
    let mut demo = false;
    let mut cover = false;
    let mut no_description = false;
    let mut no_quantities = false;
    let mut no_rates = false;
    let mut no_summary = false;
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--markup" | "-m" => markup = true,
            "--demo" => demo = true,
            "--cover" => cover = true,
            "--no-description" => no_description = true,
            "--no-quantities" => no_quantities = true,
            "--no-rates" => no_rates = true,
            "--no-summary" => no_summary = true,
            "--options" | "-o" => options_path = Some(PathBuf::from(flag_value(&args[0], arg, iter.next()))),
            "--layout-json" => layout_json = Some(PathBuf::from(flag_value(&args[0], arg, iter.next()))),
            "--type" | "-t" => {
                let value = flag_value(&args[0], arg, iter.next());
                match value.parse() {
                    Ok(t) => doc_type = Some(t),
                    Err(e) => {
                        eprintln!("Error: {e}");
                        process::exit(1);
                    }
                }
            }
            "--schedule" | "-s" => {
                let value = flag_value(&args[0], arg, iter.next());
                match value.parse() {
                    Ok(choice) => schedule_choice = Some(choice),
                    Err(e) => {
                        eprintln!("Error: {e}");
                        process::exit(1);
                    }
                }
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
                if positional == 0 {
                    input_path = Some(PathBuf::from(path));
                } else if positional == 1 {
                    output_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    // With --demo the single positional argument, if any, is the output.
    if demo && output_path.is_none() {
        output_path = input_path.take();
    }

    let (document, stem_source) = if demo {
        (samples::project(), PathBuf::from("demo.json"))
    } else {
        let input = match input_path {
            Some(p) => p,
            None => {
                eprintln!("Error: no input file specified.");
                print_usage(&args[0]);
                process::exit(1);
            }
        };
        let json = match fs::read_to_string(&input) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading '{}': {e}", input.display());
                process::exit(1);
            }
        };
        match CostDocument::from_json(&json) {
            Ok(d) => (d, input),
            Err(e) => {
                eprintln!("Error parsing '{}': {e}", input.display());
                process::exit(1);
            }
        }
    };

    let mut options = match &options_path {
        Some(path) => match fs::read_to_string(path).map_err(ExportError::from).and_then(|s| ExportOptions::from_json(&s)) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("Error reading options '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => ExportOptions::default(),
    };
    // Flags override the options file.
    options.print_cover |= cover;
    options.print_description &= !no_description;
    options.print_each_quantity &= !no_quantities;
    options.print_rates &= !no_rates;
    options.print_summary &= !no_summary;
    if doc_type.is_some() {
        options.document_type = doc_type;
    }
    if schedule_choice.is_some() {
        options.schedule = schedule_choice;
    }

    let schedule = match options.select_schedule(&document) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Some(path) = &layout_json {
        match PdfDriver.draw(schedule, &options) {
            Ok(drawn) => {
                if let Err(e) = fs::write(path, drawn.layout.to_json()) {
                    eprintln!("Error writing '{}': {e}", path.display());
                    process::exit(1);
                }
                eprintln!("Wrote layout '{}'", path.display());
            }
            Err(e) => {
                eprintln!("Error laying out document: {e}");
                process::exit(1);
            }
        }
    }

    let result = if markup {
        export(&TypstDriver, schedule, &options, output_path, &stem_source)
    } else {
        export(&PdfDriver, schedule, &options, output_path, &stem_source)
    };

    match result {
        Ok((output, rendered)) => {
            let bytes = rendered.bytes.len();
            match rendered.pages {
                Some(pages) => eprintln!(
                    "Wrote '{}' ({} bytes, {} page{})",
                    output.display(),
                    bytes,
                    pages,
                    if pages == 1 { "" } else { "s" }
                ),
                None => eprintln!("Wrote '{}' ({} bytes)", output.display(), bytes),
            }
            if rendered.degraded_rows > 0 {
                eprintln!(
                    "Warning: {} row(s) printed with placeholders (RUST_LOG=warn for details)",
                    rendered.degraded_rows
                );
            }
        }
        Err(e) => {
            eprintln!("Error generating document: {e}");
            process::exit(1);
        }
    }
}

fn export<D: DocumentDriver>(
    driver: &D,
    schedule: &CostSchedule,
    options: &ExportOptions,
    output: Option<PathBuf>,
    stem_source: &Path,
) -> boq_forge::Result<(PathBuf, RenderedDocument)> {
    // Default output: same directory + same stem as input, driver extension.
    let output = output.unwrap_or_else(|| {
        let mut o = stem_source.to_path_buf();
        o.set_extension(driver.extension());
        o
    });
    let rendered = export_to_path(driver, schedule, options, &output)?;
    Ok((output, rendered))
}

fn flag_value(prog: &str, flag: &str, value: Option<&String>) -> String {
    match value {
        Some(v) => v.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("boq – cost schedule to PDF exporter (boq-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <schedule.json> [output] [flags]");
    eprintln!("  {prog} --demo [output] [flags]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <schedule.json>      Cost schedule to export");
    eprintln!("  [output]             Output path (default: same stem as input with .pdf or .typ)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --markup, -m         Write Typst markup instead of PDF");
    eprintln!("  --options, -o FILE   Export options as JSON");
    eprintln!("  --type, -t TYPE      Override document type: priced, unpriced or rates");
    eprintln!("  --cover              Print a cover page");
    eprintln!("  --no-description     Omit item descriptions");
    eprintln!("  --no-quantities      Omit individual quantity rows");
    eprintln!("  --no-rates           Print '-' instead of rates and amounts");
    eprintln!("  --no-summary         Omit the summary page");
    eprintln!("  --schedule, -s SEL   Schedule to export: 1-based position or name (default: first)");
    eprintln!("  --layout-json FILE   Also dump the drawn page layout as JSON");
    eprintln!("  --demo               Export the built-in sample project (bill first, rates second)");
    eprintln!("  --help               Print this message");
}
