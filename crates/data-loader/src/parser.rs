//! Parser for delimited rating files.
//!
//! The training file is a header-first TSV:
//!
//! ```text
//! UserId	RestaurantName	TotalRating
//! U1077	Restaurant Las Mananitas	6
//! ```
//!
//! Columns are located by header name, so extra columns and a different
//! column order are accepted.

use crate::error::{DataLoadError, Result};
use crate::types::RatingRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Which columns hold the user, restaurant and rating fields
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    pub delimiter: char,
    pub user_column: String,
    pub item_column: String,
    pub rating_column: String,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            delimiter: '\t',
            user_column: "UserId".to_string(),
            item_column: "RestaurantName".to_string(),
            rating_column: "TotalRating".to_string(),
        }
    }
}

/// Options for loading a ratings file
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub layout: ColumnLayout,
    /// Skip malformed rows (logged as warnings) instead of failing the load
    pub skip_invalid: bool,
}

impl LoadOptions {
    pub fn with_layout(mut self, layout: ColumnLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }
}

/// Read a whole file as text.
///
/// UTF-8 is tried first; files that are not valid UTF-8 are decoded as
/// ISO-8859-1, where each byte maps directly to a code point.
fn read_text(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => Ok(err.into_bytes().iter().map(|&b| b as char).collect()),
    }
}

/// Parse a ratings file from disk
pub fn parse_ratings(path: &Path, options: &LoadOptions) -> Result<Vec<RatingRecord>> {
    let content = read_text(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_ratings_str(&content, &file_name, options)
}

/// Column positions resolved from the header row
struct ColumnIndices {
    user: usize,
    item: usize,
    rating: usize,
    width: usize,
}

fn resolve_columns(header: &str, file: &str, layout: &ColumnLayout) -> Result<ColumnIndices> {
    let names: Vec<String> = header
        .trim_start_matches('\u{feff}')
        .split(layout.delimiter)
        .map(|name| name.trim().to_lowercase())
        .collect();

    let find = |column: &str| {
        let wanted = column.trim().to_lowercase();
        names
            .iter()
            .position(|name| *name == wanted)
            .ok_or_else(|| DataLoadError::MissingColumn {
                file: file.to_string(),
                column: column.to_string(),
            })
    };

    Ok(ColumnIndices {
        user: find(&layout.user_column)?,
        item: find(&layout.item_column)?,
        rating: find(&layout.rating_column)?,
        width: names.len(),
    })
}

fn parse_row(line: &str, line_no: usize, file: &str, columns: &ColumnIndices, delimiter: char) -> Result<RatingRecord> {
    let fields: Vec<&str> = line.split(delimiter).collect();
    if fields.len() < columns.width {
        return Err(DataLoadError::FieldCountMismatch {
            file: file.to_string(),
            expected: columns.width,
            found: fields.len(),
            line: line_no,
        });
    }

    let user_id = fields[columns.user].trim();
    let item_id = fields[columns.item].trim();
    let rating_value = fields[columns.rating].trim();

    if user_id.is_empty() {
        return Err(DataLoadError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason: "Missing user id".to_string(),
        });
    }
    if item_id.is_empty() {
        return Err(DataLoadError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason: "Missing restaurant name".to_string(),
        });
    }

    let rating: f64 = rating_value.parse().map_err(|e| DataLoadError::ParseError {
        file: file.to_string(),
        line: line_no,
        reason: format!("Invalid rating '{}': {}", rating_value, e),
    })?;
    if !rating.is_finite() {
        return Err(DataLoadError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason: format!("Non-finite rating '{}'", rating_value),
        });
    }

    Ok(RatingRecord::new(user_id, item_id, rating))
}

/// Parse ratings from in-memory text.
///
/// `file` only labels error messages. Blank lines are ignored.
pub fn parse_ratings_str(content: &str, file: &str, options: &LoadOptions) -> Result<Vec<RatingRecord>> {
    let layout = &options.layout;
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or_else(|| DataLoadError::ParseError {
        file: file.to_string(),
        line: 1,
        reason: "Missing header row".to_string(),
    })?;
    let columns = resolve_columns(header, file, layout)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (idx, line) in lines {
        let line_no = idx + 1;
        match parse_row(line, line_no, file, &columns, layout.delimiter) {
            Ok(record) => records.push(record),
            Err(err) if options.skip_invalid => {
                warn!("Skipping row {} of {}: {}", line_no, file, err);
                skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    debug!("Parsed {} ratings from {} ({} skipped)", records.len(), file, skipped);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "UserId\tRestaurantName\tTotalRating\n\
                          U1077\tRestaurant Las Mananitas\t6\n\
                          U1077\tEl Rincon de San Francisco\t4.5\n\
                          U1068\tRestaurant Las Mananitas\t2\n";

    #[test]
    fn test_parse_sample() {
        let records = parse_ratings_str(SAMPLE, "sample.tsv", &LoadOptions::default()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].user_id, "U1077");
        assert_eq!(records[0].item_id, "Restaurant Las Mananitas");
        assert_eq!(records[1].rating, 4.5);
    }

    #[test]
    fn test_columns_found_by_name() {
        let content = "TotalRating\tExtra\tRestaurantName\tUserId\n3\tx\tCafe\tU1\n";
        let records = parse_ratings_str(content, "reordered.tsv", &LoadOptions::default()).unwrap();
        assert_eq!(records, vec![RatingRecord::new("U1", "Cafe", 3.0)]);
    }

    #[test]
    fn test_missing_column() {
        let content = "UserId\tRestaurantName\n";
        let err = parse_ratings_str(content, "bad.tsv", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn { ref column, .. } if column == "TotalRating"));
    }

    #[test]
    fn test_invalid_rating_reports_line() {
        let content = "UserId\tRestaurantName\tTotalRating\nU1\tCafe\tabc\n";
        let err = parse_ratings_str(content, "bad.tsv", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_non_finite_rating_rejected() {
        let content = "UserId\tRestaurantName\tTotalRating\nU1\tCafe\tNaN\n";
        assert!(parse_ratings_str(content, "nan.tsv", &LoadOptions::default()).is_err());
    }

    #[test]
    fn test_skip_invalid_rows() {
        let content = "UserId\tRestaurantName\tTotalRating\n\
                       U1\tCafe\t4\n\
                       U2\t\t3\n\
                       U3\tBistro\n\
                       U4\tBistro\t1\n";
        let options = LoadOptions::default().with_skip_invalid(true);
        let records = parse_ratings_str(content, "mixed.tsv", &options).unwrap();
        let users: Vec<&str> = records.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(users, vec!["U1", "U4"]);
    }

    #[test]
    fn test_csv_layout() {
        let layout = ColumnLayout {
            delimiter: ',',
            user_column: "userID".to_string(),
            item_column: "placeID".to_string(),
            rating_column: "rating".to_string(),
        };
        let content = "userID,placeID,rating\nU1,135085,2\n";
        let records = parse_ratings_str(content, "rating_final.csv", &LoadOptions::default().with_layout(layout)).unwrap();
        assert_eq!(records[0].item_id, "135085");
    }
}
