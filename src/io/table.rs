// src/io/table.rs

use crate::error::{PlanningError, Result};
use crate::model::{RawTable, RawValue};
use calamine::{open_workbook_auto, Data, Reader};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Loads a table, choosing the reader from the file extension.
///
/// `.xlsx`, `.xlsm`, `.xls` and `.ods` go through `read_spreadsheet`;
/// `.csv`, `.txt` and files without an extension through `read_csv`.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("xlsx" | "xlsm" | "xls" | "ods") => read_spreadsheet(path),
        Some("csv" | "txt") | None => read_csv(path),
        Some(other) => Err(PlanningError::invalid_parameter(
            "input",
            format!("unsupported file type '.{other}', expected CSV or a spreadsheet"),
        )),
    }
}

/// Loads a CSV file with a header row into a `RawTable`.
///
/// Cells are left untyped apart from two cases: blank cells become `Missing`
/// and cells that parse as a float become `Number`. Dates stay as text for the
/// normalizer to interpret.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let table = read_csv_from(file)?;
    debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "Loaded CSV table"
    );
    Ok(table)
}

/// Same as `read_csv`, from any reader.
pub fn read_csv_from<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut table = RawTable::new(headers.iter());
    for record in rdr.records() {
        let record = record?;
        table.push_row(record.iter().map(classify).collect())?;
    }
    Ok(table)
}

/// Loads the first worksheet of a spreadsheet; its first row is the header.
///
/// Numeric cells become `Number`, date cells `Timestamp`, text cells are
/// classified like CSV cells, and empty or error cells are `Missing`.
pub fn read_spreadsheet<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PlanningError::EmptyWorkbook {
            path: path.display().to_string(),
        })??;
    let table = table_from_rows(range.rows())?;
    debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "Loaded spreadsheet table"
    );
    Ok(table)
}

fn table_from_rows<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> Result<RawTable> {
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(header_name).collect())
        .unwrap_or_default();
    let mut table = RawTable::new(headers);
    for row in rows {
        table.push_row(row.iter().map(classify_cell).collect())?;
    }
    Ok(table)
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::String(text) => text.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn classify_cell(cell: &Data) -> RawValue {
    match cell {
        Data::Int(value) => RawValue::Number(*value as f64),
        Data::Float(value) => RawValue::Number(*value),
        Data::String(text) => classify(text.trim()),
        Data::Bool(flag) => RawValue::Text(flag.to_string()),
        Data::DateTime(datetime) => datetime
            .as_datetime()
            .map_or(RawValue::Missing, RawValue::Timestamp),
        Data::DateTimeIso(text) | Data::DurationIso(text) => RawValue::Text(text.clone()),
        Data::Error(_) | Data::Empty => RawValue::Missing,
    }
}

fn classify(cell: &str) -> RawValue {
    if cell.is_empty() {
        return RawValue::Missing;
    }
    match cell.parse::<f64>() {
        Ok(number) => RawValue::Number(number),
        Err(_) => RawValue::Text(cell.to_string()),
    }
}
