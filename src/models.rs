use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

pub const MISSING_GRADE: &str = "Н/А";

pub static EMPTY_CELL: Cell = Cell::Empty;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(value) => write!(f, "{}", format_number(*value)),
            Cell::Text(value) => write!(f, "{}", value.trim()),
            Cell::Date(date) => write!(f, "{}", date.format("%d.%m.%Y")),
        }
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Grade {
    Numeric(f64),
    Missing,
    Marker(String),
}

impl Grade {
    pub fn from_cell(cell: &Cell) -> Self {
        match cell {
            Cell::Empty => Grade::Missing,
            Cell::Number(value) => Grade::Numeric(*value),
            Cell::Text(value) => {
                let trimmed = value.trim();
                match trimmed.replace(',', ".").parse::<f64>() {
                    Ok(number) if number.is_finite() => Grade::Numeric(number),
                    _ => Grade::Marker(trimmed.to_string()),
                }
            }
            Cell::Date(date) => Grade::Marker(date.format("%d.%m.%Y").to_string()),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Numeric(value) => write!(f, "{}", format_number(*value)),
            Grade::Missing => write!(f, "{MISSING_GRADE}"),
            Grade::Marker(raw) => write!(f, "{raw}"),
        }
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Grade::Numeric(value) => serializer.serialize_f64(*value),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRow {
    pub subject: String,
    /// True for the row that opened this subject block.
    pub starts_block: bool,
    pub period_label: String,
    pub period_end_date: String,
    pub final_grade: Grade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    Failing,
    Borderline,
    OutstandingDebt,
}

impl ProblemKind {
    pub fn label(self) -> &'static str {
        match self {
            ProblemKind::Failing => "Задолженность",
            ProblemKind::Borderline => "Тройка",
            ProblemKind::OutstandingDebt => "Задолженность (не выставлена оценка)",
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemRecord {
    pub student_name: String,
    pub class_name: String,
    pub subject: String,
    pub period_label: String,
    pub period_end_date: String,
    pub final_grade: Grade,
    pub problem_kind: ProblemKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "date", rename_all = "snake_case")]
pub enum AsOfDate {
    Extracted(NaiveDate),
    /// Nothing in the header matched; the processing date was used instead.
    Fallback(NaiveDate),
}

impl AsOfDate {
    pub fn date(self) -> NaiveDate {
        match self {
            AsOfDate::Extracted(date) | AsOfDate::Fallback(date) => date,
        }
    }

    pub fn extracted(self) -> Option<NaiveDate> {
        match self {
            AsOfDate::Extracted(date) => Some(date),
            AsOfDate::Fallback(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileStatus {
    Processed,
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub student_name: Option<String>,
    pub class_name: Option<String>,
    pub as_of: Option<AsOfDate>,
    /// Problems recorded while reading this file.
    pub emitted: usize,
    /// Borderline records this file's later grades retracted.
    pub retracted: usize,
    pub status: FileStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisBatch {
    pub problem_records: Vec<ProblemRecord>,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub files: Vec<FileReport>,
}

impl AnalysisBatch {
    pub fn skipped_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.status, FileStatus::Skipped { .. }))
    }

    pub fn processed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|file| file.status == FileStatus::Processed)
            .count()
    }
}
