use std::path::Path;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::dates::find_embedded_date;
use crate::models::Cell;

pub const UNKNOWN_STUDENT: &str = "Неизвестный ученик";
pub const UNKNOWN_CLASS: &str = "Неизвестный класс";

const NAME_CELL: (usize, usize) = (0, 3);
const CLASS_SCAN_ROWS: usize = 2;
const DATE_ROW: usize = 1;

// "<report label>. <name> . <number><letter>", e.g. "Отчёт об успеваемости. Иванов Иван . 10А.xlsx"
static REPORT_FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^.]+\.\s*(.+?)\s*\.\s*\d+").expect("valid file name pattern"));
static CLASS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}[А-ЯЁ]$").expect("valid class token pattern"));
static CLASS_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}[А-ЯЁ])").expect("valid class pattern"));

pub struct HeaderInput<'a> {
    pub header: &'a [Vec<Cell>],
    pub file_name: &'a str,
}

impl<'a> HeaderInput<'a> {
    pub fn new(header: &'a [Vec<Cell>], file_name: &'a str) -> Self {
        Self { header, file_name }
    }

    fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.header.get(row).and_then(|cells| cells.get(col))
    }

    fn row(&self, row: usize) -> &[Cell] {
        self.header.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    fn file_stem(&self) -> &str {
        Path::new(self.file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(self.file_name)
    }
}

pub type Strategy<T> = fn(&HeaderInput<'_>) -> Option<T>;

/// Run strategies in order; the first one to produce a value wins.
pub fn first_match<T>(input: &HeaderInput<'_>, strategies: &[(&str, Strategy<T>)]) -> Option<T> {
    strategies.iter().find_map(|(name, strategy)| {
        let value = strategy(input)?;
        debug!(file = input.file_name, strategy = *name, "header field resolved");
        Some(value)
    })
}

pub const STUDENT_NAME_STRATEGIES: [(&str, Strategy<String>); 5] = [
    ("name_cell", name_from_fixed_cell),
    ("first_row_scan", name_from_first_row),
    ("report_file_name", name_from_report_file_name),
    ("file_name_segment", name_from_file_name_segment),
    ("file_stem", name_from_file_stem),
];

pub const CLASS_NAME_STRATEGIES: [(&str, Strategy<String>); 2] = [
    ("header_scan", class_from_header),
    ("file_name", class_from_file_name),
];

pub const AS_OF_DATE_STRATEGIES: [(&str, Strategy<NaiveDate>); 1] =
    [("date_row_scan", as_of_from_date_row)];

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderFields {
    pub student_name: String,
    pub class_name: Option<String>,
    pub as_of_date: Option<NaiveDate>,
}

impl HeaderFields {
    pub fn class_or_unknown(&self) -> &str {
        self.class_name.as_deref().unwrap_or(UNKNOWN_CLASS)
    }
}

/// Pull student, class and as-of date out of a transcript header.
///
/// A supplied `class_name` skips class detection. Never fails: unresolved
/// names fall back to sentinels and an unresolved date stays `None`.
pub fn extract_fields(
    header: &[Vec<Cell>],
    file_name: &str,
    class_name: Option<&str>,
) -> HeaderFields {
    let input = HeaderInput::new(header, file_name);

    let student_name = first_match(&input, &STUDENT_NAME_STRATEGIES)
        .unwrap_or_else(|| UNKNOWN_STUDENT.to_string());
    let class_name = match class_name {
        Some(name) => Some(name.to_string()),
        None => first_match(&input, &CLASS_NAME_STRATEGIES),
    };
    let as_of_date = first_match(&input, &AS_OF_DATE_STRATEGIES);

    HeaderFields {
        student_name,
        class_name,
        as_of_date,
    }
}

pub fn extract_as_of_date(header: &[Vec<Cell>], file_name: &str) -> Option<NaiveDate> {
    first_match(&HeaderInput::new(header, file_name), &AS_OF_DATE_STRATEGIES)
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn name_from_fixed_cell(input: &HeaderInput<'_>) -> Option<String> {
    let (row, col) = NAME_CELL;
    input.cell(row, col)?.as_text().and_then(non_blank)
}

pub fn name_from_first_row(input: &HeaderInput<'_>) -> Option<String> {
    input
        .row(0)
        .iter()
        .filter_map(Cell::as_text)
        .find(|text| text.split_whitespace().count() >= 2)
        .and_then(non_blank)
}

pub fn name_from_report_file_name(input: &HeaderInput<'_>) -> Option<String> {
    REPORT_FILE_NAME
        .captures(input.file_name)
        .and_then(|caps| non_blank(&caps[1]))
}

pub fn name_from_file_name_segment(input: &HeaderInput<'_>) -> Option<String> {
    let segments: Vec<&str> = input.file_stem().split('.').collect();
    if segments.len() < 3 {
        return None;
    }
    non_blank(segments[1])
}

pub fn name_from_file_stem(input: &HeaderInput<'_>) -> Option<String> {
    non_blank(input.file_stem())
}

pub fn class_from_header(input: &HeaderInput<'_>) -> Option<String> {
    input
        .header
        .iter()
        .take(CLASS_SCAN_ROWS)
        .flatten()
        .filter_map(Cell::as_text)
        .flat_map(str::split_whitespace)
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .find(|token| CLASS_TOKEN.is_match(token))
        .map(str::to_string)
}

pub fn class_from_file_name(input: &HeaderInput<'_>) -> Option<String> {
    CLASS_IN_TEXT
        .captures(input.file_name)
        .map(|caps| caps[1].to_string())
}

pub fn as_of_from_date_row(input: &HeaderInput<'_>) -> Option<NaiveDate> {
    input.row(DATE_ROW).iter().find_map(|cell| match cell {
        Cell::Date(date) => Some(*date),
        Cell::Text(text) => find_embedded_date(text),
        Cell::Number(_) | Cell::Empty => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|value| Cell::text(*value)).collect()
    }

    fn sample_header() -> Vec<Vec<Cell>> {
        vec![
            text_row(&["Отчёт об успеваемости", "", "", "Петрова Анна Сергеевна"]),
            text_row(&["Класс 10А", "Данные на 12.02.2024"]),
            text_row(&[""]),
            text_row(&["Предмет", "Период", "Дата", "Отметки", "Средний", "Итог"]),
        ]
    }

    #[test]
    fn reads_all_fields_from_a_regular_header() {
        let fields = extract_fields(&sample_header(), "report.xlsx", None);
        assert_eq!(fields.student_name, "Петрова Анна Сергеевна");
        assert_eq!(fields.class_name.as_deref(), Some("10А"));
        assert_eq!(fields.as_of_date, NaiveDate::from_ymd_opt(2024, 2, 12));
    }

    #[test]
    fn supplied_class_wins_over_header() {
        let fields = extract_fields(&sample_header(), "report.xlsx", Some("11Б"));
        assert_eq!(fields.class_name.as_deref(), Some("11Б"));
    }

    #[test]
    fn blank_name_cell_falls_back_to_first_multi_word_cell() {
        let header = vec![text_row(&["1", "Сидоров Пётр", "", ""])];
        let input = HeaderInput::new(&header, "x.xlsx");
        assert_eq!(name_from_fixed_cell(&input), None);
        assert_eq!(name_from_first_row(&input).as_deref(), Some("Сидоров Пётр"));
    }

    #[test]
    fn numeric_name_cell_is_unparseable() {
        let header = vec![vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Number(7.0)]];
        let input = HeaderInput::new(&header, "x.xlsx");
        assert_eq!(name_from_fixed_cell(&input), None);
    }

    #[test]
    fn file_name_convention_supplies_name_and_class() {
        let file_name = "Отчёт об успеваемости. Иванов Иван . 10А.xlsx";
        let fields = extract_fields(&[], file_name, None);
        assert_eq!(fields.student_name, "Иванов Иван");
        assert_eq!(fields.class_name.as_deref(), Some("10А"));
        assert_eq!(fields.as_of_date, None);
    }

    #[test]
    fn segment_and_stem_fallbacks() {
        let input = HeaderInput::new(&[], "a.Смирнова Ольга.b.xlsx");
        assert_eq!(name_from_report_file_name(&input), None);
        assert_eq!(
            name_from_file_name_segment(&input).as_deref(),
            Some("Смирнова Ольга")
        );

        let fields = extract_fields(&[], "Смирнова.xlsx", None);
        assert_eq!(fields.student_name, "Смирнова");
        assert_eq!(fields.class_or_unknown(), UNKNOWN_CLASS);
    }

    #[test]
    fn nothing_left_yields_sentinel() {
        let fields = extract_fields(&[], "", None);
        assert_eq!(fields.student_name, UNKNOWN_STUDENT);
    }

    #[test]
    fn as_of_date_only_comes_from_the_date_row() {
        let header = vec![
            text_row(&["01.01.2020"]),
            text_row(&["нет даты", "по состоянию на 05.01.2024", "10.01.2024"]),
        ];
        assert_eq!(
            extract_as_of_date(&header, "x.xlsx"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(extract_as_of_date(&header[..1], "x.xlsx"), None);
    }
}
