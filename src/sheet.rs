use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Reader};

use crate::error::SheetError;
use crate::models::Cell;

const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// First worksheet of a transcript, addressed from A1.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn header(&self, rows: usize) -> &[Vec<Cell>] {
        &self.rows[..rows.min(self.rows.len())]
    }

    pub fn body(&self, offset: usize) -> &[Vec<Cell>] {
        &self.rows[offset.min(self.rows.len())..]
    }
}

pub fn is_transcript_file(path: &Path) -> bool {
    match extension(path) {
        Some(ext) => ext == "csv" || WORKBOOK_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

pub fn load_sheet(path: &Path) -> Result<Sheet, SheetError> {
    match extension(path).as_deref() {
        Some("csv") => load_csv(path),
        Some(ext) if WORKBOOK_EXTENSIONS.contains(&ext) => load_workbook(path),
        other => Err(SheetError::UnsupportedExtension(
            other.unwrap_or_default().to_string(),
        )),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn load_workbook(path: &Path) -> Result<Sheet, SheetError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| SheetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SheetError::NoSheets(path.to_path_buf()))?;
    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| SheetError::Range {
            sheet: name.clone(),
            source,
        })?;

    // A used range may begin below or right of A1; pad so indices stay absolute.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for source_row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(source_row.iter().map(convert_cell));
        rows.push(cells);
    }

    Ok(Sheet::from_rows(name, rows))
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::String(value) => Cell::text(value.as_str()),
        Data::Bool(value) => Cell::text(value.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_date() {
            Some(date) => Cell::Date(date),
            None => Cell::text(data.to_string()),
        },
        Data::DurationIso(value) => Cell::text(value.as_str()),
    }
}

fn load_csv(path: &Path) -> Result<Sheet, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    // The reader skips blank lines; pad from the record's line number so rows stay absolute.
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(line) = record.position().map(|position| position.line()) {
            while (rows.len() as u64) + 1 < line {
                rows.push(Vec::new());
            }
        }
        let cells = record
            .iter()
            .map(|field| Cell::text(field.trim_start_matches('\u{feff}')))
            .collect();
        rows.push(cells);
    }

    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("csv")
        .to_string();
    Ok(Sheet::from_rows(name, rows))
}
