use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use engine_logging::engine_info;
use thiserror::Error;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Raw material for website extraction, before any pattern matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedInput {
    /// Every string cell (spreadsheets) or field (CSV), in reading order.
    Cells(Vec<String>),
    /// Free text to be split on separators.
    Text(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("cannot open spreadsheet {path}: {message}")]
    Spreadsheet { path: PathBuf, message: String },
    #[error("spreadsheet {0} has no sheets")]
    NoSheets(PathBuf),
    #[error("cannot parse CSV {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Read a user supplied file. Spreadsheets contribute the string cells of their
/// first sheet, CSV files every field, anything else its whole text.
pub fn read_url_source(path: &Path) -> Result<ImportedInput, ImportError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let input = if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        ImportedInput::Cells(read_first_sheet(path)?)
    } else if extension == "csv" {
        ImportedInput::Cells(read_csv_fields(path)?)
    } else {
        let text = fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ImportedInput::Text(text)
    };

    if let ImportedInput::Cells(cells) = &input {
        engine_info!("Read {} cell(s) from {:?}", cells.len(), path);
    }
    Ok(input)
}

fn read_first_sheet(path: &Path) -> Result<Vec<String>, ImportError> {
    let spreadsheet_error = |message: String| ImportError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::NoSheets(path.to_path_buf()))?
        .map_err(|e| spreadsheet_error(e.to_string()))?;

    Ok(range
        .rows()
        .flat_map(|row| row.iter())
        .filter_map(|cell| match cell {
            Data::String(text) => Some(text.clone()),
            _ => None,
        })
        .collect())
}

fn read_csv_fields(path: &Path) -> Result<Vec<String>, ImportError> {
    let csv_error = |source: csv::Error| ImportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let mut fields = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        fields.extend(record.iter().map(ToOwned::to_owned));
    }
    Ok(fields)
}
