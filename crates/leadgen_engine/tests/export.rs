use std::fs;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use leadgen_engine::{export_rows, ExportFormat, ExportOptions, ExportRow};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn options(format: ExportFormat) -> ExportOptions {
    ExportOptions {
        date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        format,
        ..ExportOptions::default()
    }
}

fn sample_rows() -> Vec<ExportRow> {
    vec![
        ExportRow {
            website: "acme.com".to_string(),
            status: "COMPLETED".to_string(),
            emails: vec!["ceo@acme.com".to_string(), "info@acme.com".to_string()],
            note: None,
        },
        ExportRow {
            website: "beta.io".to_string(),
            status: "FAILED".to_string(),
            emails: Vec::new(),
            note: Some("network error, retry later".to_string()),
        },
    ]
}

#[test]
fn export_is_named_after_the_date_and_format() {
    assert_eq!(
        options(ExportFormat::Xlsx).filename(),
        "leads_export_2024-03-09.xlsx"
    );
    assert_eq!(options(ExportFormat::Csv).filename(), "leads_export_2024-03-09.csv");
    assert_eq!(ExportOptions::default().format, ExportFormat::Xlsx);
}

#[test]
fn workbook_reads_back_with_header_and_joined_emails() {
    let temp = TempDir::new().unwrap();
    let summary = export_rows(temp.path(), &sample_rows(), &options(ExportFormat::Xlsx)).unwrap();

    assert_eq!(summary.row_count, 2);
    assert_eq!(summary.output_path, temp.path().join("leads_export_2024-03-09.xlsx"));

    let mut workbook = open_workbook_auto(&summary.output_path).unwrap();
    let range = workbook.worksheet_range("Leads").unwrap();
    let cells: Vec<Vec<String>> = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::String(text) => text.clone(),
                    _ => String::new(),
                })
                .collect()
        })
        .collect();
    assert_eq!(
        cells,
        vec![
            vec!["Website", "Status", "Emails", "Note"],
            vec!["acme.com", "COMPLETED", "ceo@acme.com, info@acme.com", ""],
            vec!["beta.io", "FAILED", "", "network error, retry later"],
        ]
        .into_iter()
        .map(|row| row.into_iter().map(str::to_string).collect::<Vec<_>>())
        .collect::<Vec<_>>()
    );
}

#[test]
fn csv_export_writes_header_and_joined_emails() {
    let temp = TempDir::new().unwrap();
    let summary = export_rows(temp.path(), &sample_rows(), &options(ExportFormat::Csv)).unwrap();

    assert_eq!(summary.output_path, temp.path().join("leads_export_2024-03-09.csv"));
    let content = fs::read_to_string(&summary.output_path).unwrap();
    assert_eq!(
        content,
        "Website,Status,Emails,Note\n\
         acme.com,COMPLETED,\"ceo@acme.com, info@acme.com\",\n\
         beta.io,FAILED,,\"network error, retry later\"\n"
    );
}

#[test]
fn empty_export_still_has_header() {
    let temp = TempDir::new().unwrap();
    let summary = export_rows(temp.path(), &[], &options(ExportFormat::Csv)).unwrap();
    assert_eq!(
        fs::read_to_string(summary.output_path).unwrap(),
        "Website,Status,Emails,Note\n"
    );
}
