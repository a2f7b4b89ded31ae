use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use engine_logging::engine_info;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::persist::{AtomicFileWriter, PersistError};

pub const EXPORT_HEADER: [&str; 4] = ["Website", "Status", "Emails", "Note"];
const SHEET_NAME: &str = "Leads";
const COLUMN_WIDTHS: [f64; 4] = [32.0, 12.0, 48.0, 40.0];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub website: String,
    pub status: String,
    pub emails: Vec<String>,
    pub note: Option<String>,
}

impl ExportRow {
    fn cells(&self) -> [String; 4] {
        [
            self.website.clone(),
            self.status.clone(),
            self.emails.join(", "),
            self.note.clone().unwrap_or_default(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Excel workbook with a single sheet.
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub file_prefix: String,
    /// Date stamped into the file name.
    pub date: NaiveDate,
    pub format: ExportFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            file_prefix: "leads_export".to_string(),
            date: Local::now().date_naive(),
            format: ExportFormat::default(),
        }
    }
}

impl ExportOptions {
    pub fn filename(&self) -> String {
        format!(
            "{}_{}.{}",
            self.file_prefix,
            self.date.format("%Y-%m-%d"),
            self.format.extension()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub row_count: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("xlsx error: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Write a header plus one row per record to `{output_dir}/{prefix}_{date}.{ext}`.
/// Emails are joined with ", " into a single cell.
pub fn export_rows(
    output_dir: &Path,
    rows: &[ExportRow],
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let bytes = match options.format {
        ExportFormat::Xlsx => xlsx_bytes(rows)?,
        ExportFormat::Csv => csv_bytes(rows)?,
    };

    let output_path = AtomicFileWriter::new(output_dir).write(&options.filename(), &bytes)?;
    engine_info!("Exported {} row(s) to {:?}", rows.len(), output_path);
    Ok(ExportSummary {
        row_count: rows.len(),
        output_path,
    })
}

fn xlsx_bytes(rows: &[ExportRow]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, (title, width)) in (0u16..).zip(EXPORT_HEADER.iter().zip(COLUMN_WIDTHS)) {
        sheet.write_string_with_format(0, col, *title, &header_format)?;
        sheet.set_column_width(col, width)?;
    }
    for (row_index, row) in (1u32..).zip(rows) {
        for (col, cell) in (0u16..).zip(row.cells()) {
            if !cell.is_empty() {
                sheet.write_string(row_index, col, cell)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn csv_bytes(rows: &[ExportRow]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}
