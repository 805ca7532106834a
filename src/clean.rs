// 🧹 Trip CSV Cleaner
// Drops rows with bad dates or empty places, normalizes and sorts the rest

use crate::error::{Result, TripMapError};
use crate::trip::{describe_headers, find_column, parse_date, DATE_COLUMN, PLACE_COLUMN};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub date_column: String,
    pub place_column: String,
}

impl Default for CleanOptions {
    fn default() -> Self {
        CleanOptions {
            date_column: DATE_COLUMN.to_string(),
            place_column: PLACE_COLUMN.to_string(),
        }
    }
}

/// A row dropped because its date could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDateRow {
    pub line: usize,
    pub value: String,
}

/// A row dropped because its place was blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyPlaceRow {
    pub line: usize,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct CleanReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub invalid_dates: Vec<InvalidDateRow>,
    pub empty_places: Vec<EmptyPlaceRow>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub output: PathBuf,
}

/// `trips.csv` → `trips_clean.csv`, next to the input (not in the working
/// directory).
pub fn default_clean_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("trips");
    let name = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_clean.{}", stem, ext),
        None => format!("{}_clean", stem),
    };
    input.with_file_name(name)
}

/// Validate and normalize a trip CSV.
///
/// Rows with unparseable dates or blank places are dropped and reported.
/// Surviving rows get `YYYY-MM-DD` dates and trimmed places, are sorted by
/// date (ties keep file order) and are written with every field quoted.
/// Columns other than date and place pass through untouched.
pub fn clean_trip_csv(input: &Path, output: Option<&Path>, options: &CleanOptions) -> Result<CleanReport> {
    let csv_err = |source: csv::Error| TripMapError::Csv {
        path: input.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(input)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    let (date_idx, place_idx) = match (
        find_column(&headers, &options.date_column),
        find_column(&headers, &options.place_column),
    ) {
        (Some(d), Some(p)) => (d, p),
        _ => {
            return Err(TripMapError::MissingColumns {
                date_column: options.date_column.clone(),
                place_column: options.place_column.clone(),
                found: describe_headers(&headers),
            })
        }
    };

    let mut rows_read = 0;
    let mut invalid_dates = Vec::new();
    let mut empty_places = Vec::new();
    let mut kept: Vec<(NaiveDate, Vec<String>)> = Vec::new();

    for (row_num, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;
        let line = row_num + 2;
        rows_read += 1;

        let raw_date = record.get(date_idx).unwrap_or("");
        let Some(date) = parse_date(raw_date) else {
            invalid_dates.push(InvalidDateRow {
                line,
                value: raw_date.to_string(),
            });
            continue;
        };

        let place = record.get(place_idx).unwrap_or("").trim();
        if place.is_empty() {
            empty_places.push(EmptyPlaceRow { line, date });
            continue;
        }

        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
        fields.resize(headers.len().max(fields.len()), String::new());
        fields[date_idx] = date.format("%Y-%m-%d").to_string();
        fields[place_idx] = place.to_string();
        kept.push((date, fields));
    }

    kept.sort_by_key(|(date, _)| *date);

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_clean_path(input));
    write_quoted(&output, &headers, &kept)?;

    let date_range = match (kept.first(), kept.last()) {
        (Some((first, _)), Some((last, _))) => Some((*first, *last)),
        _ => None,
    };

    Ok(CleanReport {
        rows_read,
        rows_kept: kept.len(),
        invalid_dates,
        empty_places,
        date_range,
        output,
    })
}

fn write_quoted(path: &Path, headers: &csv::StringRecord, rows: &[(NaiveDate, Vec<String>)]) -> Result<()> {
    let io_err = |err: csv::Error| TripMapError::Io {
        path: path.to_path_buf(),
        source: err.into(),
    };

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .flexible(true)
        .from_path(path)
        .map_err(io_err)?;

    writer.write_record(headers).map_err(io_err)?;
    for (_, fields) in rows {
        writer.write_record(fields).map_err(io_err)?;
    }
    writer.flush().map_err(|source| TripMapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
