// 🗓️ Trip Loader
// Reads dated place names from CSV and orders them chronologically

use crate::error::{Result, TripMapError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DATE_COLUMN: &str = "date";
pub const PLACE_COLUMN: &str = "place";
pub const TYPE_COLUMN: &str = "type";

/// Date-only layouts tried after ISO-8601, most common first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Date-time layouts; the time of day is dropped.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// ============================================================================
// CORE TYPES
// ============================================================================

/// How a leg of the trip was travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    #[default]
    Flight,
    Car,
}

impl RouteType {
    /// Map a `type` cell to a route type. Anything that is not a driving
    /// label is a flight.
    pub fn from_label(label: &str) -> RouteType {
        match label.trim().to_lowercase().as_str() {
            "car" | "drive" | "driving" => RouteType::Car,
            _ => RouteType::Flight,
        }
    }

    /// Whether `label` is one of the spellings the CSV format documents.
    pub fn is_known_label(label: &str) -> bool {
        matches!(
            label.trim().to_lowercase().as_str(),
            "" | "car" | "drive" | "driving" | "flight" | "airline"
        )
    }

    pub fn name(&self) -> &str {
        match self {
            RouteType::Flight => "flight",
            RouteType::Car => "car",
        }
    }
}

/// One visit read from the input CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRecord {
    pub date: NaiveDate,
    pub place: String,
    /// Route type of the leg that arrives at this place.
    pub route_type: RouteType,
    /// 1-based line in the source file (header = line 1).
    pub line: usize,
}

impl TripRecord {
    pub fn new(date: NaiveDate, place: impl Into<String>, route_type: RouteType) -> Self {
        TripRecord {
            date,
            place: place.into(),
            route_type,
            line: 0,
        }
    }

    pub fn date_label(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

// ============================================================================
// DATE PARSING
// ============================================================================

/// Parse a date cell, accepting ISO-8601 first and a handful of common
/// human layouts after that.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .skip(1)
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

// ============================================================================
// CSV LOADING
// ============================================================================

/// Position of a header, matching on trimmed names.
pub(crate) fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

pub(crate) fn describe_headers(headers: &csv::StringRecord) -> String {
    headers
        .iter()
        .map(|h| h.trim())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load trip records from a CSV file, sorted by date.
pub fn load_trips(csv_path: &Path) -> Result<Vec<TripRecord>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(csv_path)
        .map_err(|source| TripMapError::Csv {
            path: csv_path.to_path_buf(),
            source,
        })?;

    let records = read_trips(reader, csv_path)?;
    if records.is_empty() {
        return Err(TripMapError::NoRecords(csv_path.to_path_buf()));
    }
    Ok(records)
}

/// Parse trips from any reader. Used by [`load_trips`] and by tests that
/// work on in-memory CSV.
pub fn read_trips<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    source: &Path,
) -> Result<Vec<TripRecord>> {
    let csv_err = |source_err: csv::Error| TripMapError::Csv {
        path: source.to_path_buf(),
        source: source_err,
    };

    let headers = reader.headers().map_err(csv_err)?.clone();
    let (date_idx, place_idx) = match (
        find_column(&headers, DATE_COLUMN),
        find_column(&headers, PLACE_COLUMN),
    ) {
        (Some(d), Some(p)) => (d, p),
        _ => {
            return Err(TripMapError::MissingColumns {
                date_column: DATE_COLUMN.to_string(),
                place_column: PLACE_COLUMN.to_string(),
                found: describe_headers(&headers),
            })
        }
    };
    // Resolved once: a file without a type column is all flights.
    let type_idx = find_column(&headers, TYPE_COLUMN);

    let mut trips = Vec::new();
    for (row_num, result) in reader.records().enumerate() {
        let row = result.map_err(csv_err)?;
        let line = row_num + 2;

        let raw_date = row.get(date_idx).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| TripMapError::InvalidDate {
            line,
            value: raw_date.to_string(),
        })?;

        let place = row.get(place_idx).unwrap_or("").trim();
        if place.is_empty() {
            return Err(TripMapError::EmptyPlace { line });
        }

        let label = type_idx.and_then(|idx| row.get(idx)).unwrap_or("");
        if !RouteType::is_known_label(label) {
            log::warn!(
                "line {}: unknown route type '{}', treating as flight",
                line,
                label.trim()
            );
        }

        trips.push(TripRecord {
            date,
            place: place.to_string(),
            route_type: RouteType::from_label(label),
            line,
        });
    }

    // Stable: visits on the same day keep file order.
    trips.sort_by_key(|t| t.date);

    Ok(trips)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(csv_text: &str) -> Result<Vec<TripRecord>> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_text.as_bytes());
        read_trips(reader, Path::new("test.csv"))
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-03-05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date(" 2024-03-05 "), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T18:30:00"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05 18:30"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T18:30:00+02:00"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024/03/05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("03/05/2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("05.03.2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("March 5, 2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("Mar 5, 2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("5 March 2024"), Some(ymd(2024, 3, 5)));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("someday"), None);
        assert_eq!(parse_date("2024-13-45"), None);
    }

    #[test]
    fn test_route_type_labels() {
        assert_eq!(RouteType::from_label("car"), RouteType::Car);
        assert_eq!(RouteType::from_label(" Drive "), RouteType::Car);
        assert_eq!(RouteType::from_label("DRIVING"), RouteType::Car);
        assert_eq!(RouteType::from_label("flight"), RouteType::Flight);
        assert_eq!(RouteType::from_label("airline"), RouteType::Flight);
        assert_eq!(RouteType::from_label(""), RouteType::Flight);
        assert_eq!(RouteType::from_label("boat"), RouteType::Flight);

        assert!(RouteType::is_known_label("Airline"));
        assert!(!RouteType::is_known_label("boat"));
    }

    #[test]
    fn test_load_sorts_by_date() {
        let trips = read(
            "date,place\n\
             2024-01-03,Berlin\n\
             2024-01-01,Paris\n\
             2024-01-02,\"Lyon, France\"\n",
        )
        .unwrap();

        let places: Vec<_> = trips.iter().map(|t| t.place.as_str()).collect();
        assert_eq!(places, vec!["Paris", "Lyon, France", "Berlin"]);
        assert!(trips.iter().all(|t| t.route_type == RouteType::Flight));
        assert_eq!(trips[0].line, 3);
    }

    #[test]
    fn test_same_day_keeps_file_order() {
        let trips = read(
            "date,place\n\
             2024-05-02,C\n\
             2024-05-01,A\n\
             2024-05-02,D\n\
             2024-05-01,B\n",
        )
        .unwrap();

        let places: Vec<_> = trips.iter().map(|t| t.place.as_str()).collect();
        assert_eq!(places, vec!["A", "B", "C", "D"]);
        assert!(trips.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn test_optional_type_column() {
        let trips = read(
            " date , place , type \n\
             2024-01-01,Oslo,\n\
             2024-01-02,Bergen,driving\n\
             2024-01-03,Trondheim,flight\n",
        )
        .unwrap();

        assert_eq!(trips[0].route_type, RouteType::Flight);
        assert_eq!(trips[1].route_type, RouteType::Car);
        assert_eq!(trips[2].route_type, RouteType::Flight);
    }

    #[test]
    fn test_missing_columns() {
        let err = read("when,where\n2024-01-01,Oslo\n").unwrap_err();
        match err {
            TripMapError::MissingColumns { found, .. } => assert_eq!(found, "when, where"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_date_names_line() {
        let err = read("date,place\n2024-01-01,Oslo\nnot a date,Bergen\n").unwrap_err();
        match err {
            TripMapError::InvalidDate { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_place() {
        let err = read("date,place\n2024-01-01,  \n").unwrap_err();
        assert!(matches!(err, TripMapError::EmptyPlace { line: 2 }));
    }

    #[test]
    fn test_load_trips_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "date,place\n").unwrap();

        let err = load_trips(&path).unwrap_err();
        assert!(matches!(err, TripMapError::NoRecords(_)));
    }

    #[test]
    fn test_load_trips_missing_file() {
        let err = load_trips(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, TripMapError::Csv { .. }));
    }
}
