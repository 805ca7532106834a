// Trip Map - CSV Cleanup Tool
// Validates dates and rewrites trip CSVs with quoted place names

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use tripmap::{clean_trip_csv, CleanOptions};

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Clean and validate trip CSV files.",
    long_about = "Clean and validate trip CSV files:\n  \
                  - Validates date format\n  \
                  - Ensures proper quoting for place names\n  \
                  - Sorts by date\n  \
                  - Removes invalid rows"
)]
struct Cli {
    /// CSV to clean
    input: PathBuf,

    /// Where to write the cleaned CSV (default: <input>_clean.csv)
    output: Option<PathBuf>,

    /// Name of the date column
    #[arg(long, default_value = "date")]
    date_column: String,

    /// Name of the place column
    #[arg(long, default_value = "place")]
    place_column: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("tripmap=info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let options = CleanOptions {
        date_column: cli.date_column,
        place_column: cli.place_column,
    };

    println!("📂 Reading: {}", cli.input.display());
    let report = clean_trip_csv(&cli.input, cli.output.as_deref(), &options)
        .with_context(|| format!("Failed to clean {}", cli.input.display()))?;
    println!("  Found {} rows", report.rows_read);

    println!("\nValidating dates in '{}' column...", options.date_column);
    if report.invalid_dates.is_empty() {
        println!("  ✓ All {} dates are valid", report.rows_read);
    } else {
        println!("  ⚠ Warning: {} invalid date(s) found:", report.invalid_dates.len());
        for row in &report.invalid_dates {
            println!("    Row {}: '{}'", row.line, row.value);
        }
    }
    println!("  ✓ Sorted by date");

    println!("\nValidating places in '{}' column...", options.place_column);
    if report.empty_places.is_empty() {
        println!("  ✓ All places are valid");
    } else {
        println!("  ⚠ Warning: {} empty place(s) found:", report.empty_places.len());
        for row in &report.empty_places {
            println!("    Row {}: date={}", row.line, row.date.format("%Y-%m-%d"));
        }
    }

    println!("\n✓ Cleaned CSV written to: {}", report.output.display());
    println!("✓ Done! Kept {} of {} rows", report.rows_kept, report.rows_read);

    println!("\nSummary:");
    match report.date_range {
        Some((first, last)) => println!(
            "  Date range: {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ),
        None => println!("  Date range: (no rows kept)"),
    }
    println!("  Locations: {}", report.rows_kept);

    Ok(())
}
