//! CSV loading for the verse dataset
//!
//! Reads `quran_dataset.csv`-style files: a header row followed by one verse per
//! row. Row order is the posting order. Any structural problem fails the whole
//! load; a partially loaded dataset would shift every later index.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use super::record::VerseRecord;
use crate::error::DatasetError;

pub const COL_SURAH_NO: &str = "surah_no";
pub const COL_AYAH_NO: &str = "ayah_no_surah";
pub const COL_ARABIC: &str = "ayah_ar";
pub const COL_ENGLISH: &str = "ayah_en";
pub const COL_SURAH_NAME: &str = "surah_name_en";
pub const COL_INDEX: &str = "index";

/// Columns every dataset must carry
pub const REQUIRED_COLUMNS: &[&str] = &[COL_SURAH_NO, COL_AYAH_NO, COL_ARABIC];

/// Column positions resolved from the header row
struct Columns {
    surah_no: usize,
    ayah_no: usize,
    arabic: usize,
    english: Option<usize>,
    surah_name: Option<usize>,
    index: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, origin: &str) -> Result<Self, DatasetError> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|&&name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns {
                origin: origin.to_string(),
                columns: missing,
            });
        }

        // Required columns were checked above
        let required = |name: &str| position(name).unwrap_or_default();

        Ok(Self {
            surah_no: required(COL_SURAH_NO),
            ayah_no: required(COL_AYAH_NO),
            arabic: required(COL_ARABIC),
            english: position(COL_ENGLISH),
            surah_name: position(COL_SURAH_NAME),
            index: position(COL_INDEX),
        })
    }
}

/// Load verse records from a CSV file on disk
pub fn load_csv(path: &Path) -> Result<Vec<VerseRecord>, DatasetError> {
    if !path.exists() {
        return Err(DatasetError::Missing {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(file, &path.display().to_string())
}

/// Parse verse records from any CSV reader.
///
/// `origin` names the source in error messages.
pub fn parse_csv<R: Read>(reader: R, origin: &str) -> Result<Vec<VerseRecord>, DatasetError> {
    let csv_err = |source| DatasetError::Csv {
        origin: origin.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_err)?.clone();
    let columns = Columns::resolve(&headers, origin)?;

    let mut records = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (position, row) in reader.records().enumerate() {
        let row = row.map_err(csv_err)?;
        // Row numbers in messages are 1-based data rows (header excluded)
        let row_no = position + 1;
        let invalid = |reason: String| DatasetError::InvalidRow {
            origin: origin.to_string(),
            row: row_no,
            reason,
        };

        if let Some(col) = columns.index {
            let raw = cell(&row, col);
            let declared: usize = raw
                .parse()
                .map_err(|_| invalid(format!("index '{raw}' is not a non-negative integer")))?;
            if declared != position {
                return Err(invalid(format!(
                    "index {declared} does not match row position {position}"
                )));
            }
        }

        let surah_no = parse_number(&row, columns.surah_no, COL_SURAH_NO).map_err(&invalid)?;
        let ayah_no = parse_number(&row, columns.ayah_no, COL_AYAH_NO).map_err(&invalid)?;

        let text = cell(&row, columns.arabic);
        if text.is_empty() {
            return Err(invalid(format!("'{COL_ARABIC}' is empty")));
        }

        let reference = format!("{surah_no}:{ayah_no}");
        if let Some(first_row) = seen.insert(reference.clone(), row_no) {
            return Err(DatasetError::DuplicateReference {
                origin: origin.to_string(),
                reference,
                first_row,
                row: row_no,
            });
        }

        let mut record = VerseRecord::new(position, reference, text);
        if let Some(translation) = columns.english.map(|c| cell(&row, c)) {
            if !translation.is_empty() {
                record = record.with_translation(translation);
            }
        }
        if let Some(name) = columns.surah_name.map(|c| cell(&row, c)) {
            if !name.is_empty() {
                record = record.with_surah_name(name);
            }
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(DatasetError::Empty {
            origin: origin.to_string(),
        });
    }

    Ok(records)
}

fn cell(row: &StringRecord, col: usize) -> &str {
    row.get(col).map(str::trim).unwrap_or_default()
}

/// Parse a positive chapter/verse number.
///
/// Accepts float-formatted integers (`2.0`) since spreadsheet exports commonly write them.
fn parse_number(row: &StringRecord, col: usize, name: &str) -> Result<u32, String> {
    let raw = cell(row, col);
    if raw.is_empty() {
        return Err(format!("'{name}' is empty"));
    }
    let value = match raw.parse::<u32>() {
        Ok(v) => v,
        Err(_) => match raw.parse::<f64>() {
            Ok(f) if f.fract() == 0.0 && f >= 1.0 && f <= u32::MAX as f64 => f as u32,
            _ => return Err(format!("'{name}' value '{raw}' is not a positive integer")),
        },
    };
    if value == 0 {
        return Err(format!("'{name}' must be at least 1"));
    }
    Ok(value)
}
