//! Tests for the header-checked table reader

use super::*;
use crate::constants::required_columns;
use crate::error::MudataError;
use crate::importer::table::TableReader;
use tempfile::TempDir;

fn open(content: &str, required: &'static [&'static str]) -> crate::error::Result<TableReader> {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "table.csv", content);
    // the reader keeps its file handle open, so the directory may go
    TableReader::open(&path, required)
}

#[test]
fn test_reads_rows_by_column_name() {
    let table = open(LOCATIONS_CSV, required_columns::LOCATIONS).unwrap();
    assert_eq!(table.file(), "table.csv");
    assert_eq!(table.width(), 3);

    let rows: Vec<_> = table.map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].line(), 2);
    assert_eq!(rows[0].get("dataset"), "ecclimate");
    assert_eq!(rows[0].get("location"), "kentville");
    assert_eq!(rows[0].get("tags"), r#"{"province": "NS"}"#);
    assert_eq!(rows[1].get("tags"), "");
}

#[test]
fn test_column_order_is_free_and_extras_ignored() {
    let content = "tags,notes,dataset\n{},first one,alpha\n,second,beta\n";
    let table = open(content, required_columns::DATASETS).unwrap();
    assert_eq!(table.width(), 3);

    let rows: Vec<_> = table.map(|r| r.unwrap()).collect();
    assert_eq!(rows[0].get("dataset"), "alpha");
    assert_eq!(rows[0].get("tags"), "{}");
    assert_eq!(rows[1].get("dataset"), "beta");
    assert_eq!(rows[1].get("notes"), "");
}

#[test]
fn test_missing_required_columns_listed_in_order() {
    let result = open("dataset,x,tags\n", required_columns::DATA);
    match result {
        Err(MudataError::MissingRequiredColumns { file, columns }) => {
            assert_eq!(file, "table.csv");
            assert_eq!(columns, vec!["location", "param", "value"]);
        }
        other => panic!("expected MissingRequiredColumns, got {:?}", other.err()),
    }
}

#[test]
fn test_empty_file_misses_every_column() {
    let result = open("", required_columns::DATASETS);
    assert!(matches!(
        result,
        Err(MudataError::MissingRequiredColumns { columns, .. }) if columns.len() == 2
    ));
}

#[test]
fn test_blank_lines_are_skipped() {
    let content = "dataset,tags\n\nalpha,{}\n\n\nbeta,{}\n";
    let mut table = open(content, required_columns::DATASETS).unwrap();

    let first = table.next().unwrap().unwrap();
    assert_eq!(first.get("dataset"), "alpha");
    assert_eq!(first.line(), 3);
    let second = table.next().unwrap().unwrap();
    assert_eq!(second.get("dataset"), "beta");
    assert_eq!(second.line(), 6);
    assert!(table.next().is_none());
    assert_eq!(table.rows_read(), 2);
}

#[test]
fn test_line_numbers_count_blank_lines_between_rows() {
    let content = "dataset,tags\nalpha,{}\n\n\nbeta,{}\n";
    let table = open(content, required_columns::DATASETS).unwrap();
    let lines: Vec<u64> = table.map(|row| row.unwrap().line()).collect();
    assert_eq!(lines, vec![2, 5]);
}

#[test]
fn test_line_numbers_with_crlf_terminators() {
    let content = "dataset,tags\r\n\r\nalpha,{}\r\nbeta,{}\r\n";
    let table = open(content, required_columns::DATASETS).unwrap();
    let lines: Vec<u64> = table.map(|row| row.unwrap().line()).collect();
    assert_eq!(lines, vec![3, 4]);
}

#[test]
fn test_malformed_row_after_blank_lines_reports_its_line() {
    let content = "dataset,location,tags\n\necclimate,kentville,{}\n\n\necclimate,greenwood\n";
    let mut table = open(content, required_columns::LOCATIONS).unwrap();

    assert_eq!(table.next().unwrap().unwrap().line(), 3);
    match table.next().unwrap() {
        Err(MudataError::MalformedRow {
            line,
            expected,
            actual,
            ..
        }) => {
            assert_eq!(line, 6);
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("expected MalformedRow, got {:?}", other),
    }
}

#[test]
fn test_field_count_mismatch_is_malformed() {
    let content = "dataset,location,tags\necclimate,kentville,{}\necclimate,greenwood\n";
    let mut table = open(content, required_columns::LOCATIONS).unwrap();

    assert!(table.next().unwrap().is_ok());
    match table.next().unwrap() {
        Err(MudataError::MalformedRow {
            file,
            line,
            expected,
            actual,
        }) => {
            assert_eq!(file, "table.csv");
            assert_eq!(line, 3);
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("expected MalformedRow, got {:?}", other),
    }
}

#[test]
fn test_too_many_fields_is_malformed() {
    let content = "dataset,tags\nalpha,{},extra\n";
    let mut table = open(content, required_columns::DATASETS).unwrap();
    assert!(matches!(
        table.next(),
        Some(Err(MudataError::MalformedRow {
            expected: 2,
            actual: 3,
            ..
        }))
    ));
}
